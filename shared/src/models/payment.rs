//! Simulated payment records

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ParseEnumError;

/// What a payment is for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    ListingFee,
    Subscription,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::ListingFee => "listing_fee",
            PaymentKind::Subscription => "subscription",
        }
    }
}

impl FromStr for PaymentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listing_fee" => Ok(PaymentKind::ListingFee),
            "subscription" => Ok(PaymentKind::Subscription),
            other => Err(ParseEnumError::new("payment kind", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PaymentStatus::Success)
    }
}

/// Optional client-supplied payment details; amount defaults to the configured fee
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Result of a simulated charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: Uuid,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<Uuid>,
    pub amount: Decimal,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
