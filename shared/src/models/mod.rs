//! Domain models for the Business Marketplace

mod document;
mod listing;
mod payment;
mod user;

pub use document::*;
pub use listing::*;
pub use payment::*;
pub use user::*;
