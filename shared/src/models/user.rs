//! User account and subscription models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ParseEnumError;

/// Marketplace role chosen at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Seller,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "buyer",
            UserRole::Seller => "seller",
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(UserRole::Buyer),
            "seller" => Ok(UserRole::Seller),
            other => Err(ParseEnumError::new("user role", other)),
        }
    }
}

/// Buyer subscription state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Pending,
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SubscriptionStatus::None),
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(ParseEnumError::new("subscription status", other)),
        }
    }
}

/// Public view of a user account (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Effective subscription state at `now`; a stored `active` past its expiry reads as expired
    pub fn subscription_at(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        effective_subscription(self.subscription_status, self.subscription_expires_at, now)
    }

    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_at(now) == SubscriptionStatus::Active
    }
}

/// Resolve a stored subscription status against its expiry
pub fn effective_subscription(
    status: SubscriptionStatus,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SubscriptionStatus {
    match (status, expires_at) {
        (SubscriptionStatus::Active, Some(expiry)) if expiry <= now => SubscriptionStatus::Expired,
        (SubscriptionStatus::Active, None) => SubscriptionStatus::Expired,
        (status, _) => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn buyer(status: SubscriptionStatus, expires_at: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "buyer@example.com".into(),
            name: "Buyer".into(),
            role: UserRole::Buyer,
            email_verified: true,
            subscription_status: status,
            subscription_expires_at: expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_subscription_requires_future_expiry() {
        let now = Utc::now();
        assert!(buyer(SubscriptionStatus::Active, Some(now + Duration::days(3)))
            .has_active_subscription(now));
        assert!(!buyer(SubscriptionStatus::Active, Some(now - Duration::seconds(1)))
            .has_active_subscription(now));
        assert!(!buyer(SubscriptionStatus::Active, None).has_active_subscription(now));
    }

    #[test]
    fn test_non_active_statuses_pass_through() {
        let now = Utc::now();
        let later = Some(now + Duration::days(1));
        assert_eq!(
            effective_subscription(SubscriptionStatus::Pending, later, now),
            SubscriptionStatus::Pending
        );
        assert_eq!(
            effective_subscription(SubscriptionStatus::None, None, now),
            SubscriptionStatus::None
        );
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("seller".parse::<UserRole>().unwrap(), UserRole::Seller);
        assert!("admin".parse::<UserRole>().is_err());
    }
}
