//! Business logic services for the Business Marketplace

pub mod auth;
pub mod document;
pub mod listing;
pub mod payment;
pub mod seed;
pub mod verification;

pub use auth::AuthService;
pub use document::DocumentService;
pub use listing::ListingService;
pub use payment::{PaymentService, PaymentSimulator};
pub use verification::VerificationService;
