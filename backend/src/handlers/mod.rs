//! HTTP request handlers for the Business Marketplace API

pub mod auth;
pub mod document;
pub mod health;
pub mod listing;
pub mod payment;
pub mod reference;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

pub use auth::*;
pub use document::*;
pub use health::*;
pub use listing::*;
pub use payment::*;
pub use reference::*;

/// `Json` extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor whose rejections use the API error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
