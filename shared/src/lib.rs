//! Shared types and models for the Business Marketplace
//!
//! This crate contains types shared between the backend, the browser client
//! (via WASM), and other components of the system.

pub mod filter;
pub mod models;
pub mod types;
pub mod validation;
pub mod wizard;

pub use filter::*;
pub use models::*;
pub use types::*;
pub use validation::*;
pub use wizard::*;
