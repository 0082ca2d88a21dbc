//! Simulated payments for listing fees and buyer subscriptions

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use shared::{
    effective_subscription, ListingStatus, PaymentKind, PaymentReceipt, PaymentRequest,
    PaymentStatus, SubscriptionStatus, UserRole,
};

/// Stand-in payment provider that succeeds with a fixed probability
#[derive(Debug, Clone, Copy)]
pub struct PaymentSimulator {
    success_rate: f64,
}

impl PaymentSimulator {
    /// `success_rate` is clamped to [0, 1]
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self { success_rate }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub fn charge(&self) -> PaymentStatus {
        self.charge_with(&mut rand::thread_rng())
    }

    pub fn charge_with<R: Rng + ?Sized>(&self, rng: &mut R) -> PaymentStatus {
        if rng.gen_bool(self.success_rate) {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        }
    }
}

/// New expiry after paying for `days` more; time left on an active subscription carries over
pub fn extend_subscription(
    status: SubscriptionStatus,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    days: i64,
) -> DateTime<Utc> {
    let base = match (effective_subscription(status, expires_at, now), expires_at) {
        (SubscriptionStatus::Active, Some(expiry)) => expiry.max(now),
        _ => now,
    };
    base + Duration::days(days)
}

/// Payment service
#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
    simulator: PaymentSimulator,
    listing_fee: Decimal,
    subscription_price: Decimal,
    subscription_days: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ListingPaymentTarget {
    seller_id: Uuid,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    role: String,
    subscription_status: String,
    subscription_expires_at: Option<DateTime<Utc>>,
}

impl PaymentService {
    pub fn new(db: PgPool, config: &Config, simulator: PaymentSimulator) -> Self {
        Self {
            db,
            simulator,
            listing_fee: config.payments.listing_fee,
            subscription_price: config.payments.subscription_price,
            subscription_days: config.payments.subscription_days,
        }
    }

    /// Charge the listing fee; success activates the listing
    pub async fn pay_listing_fee(
        &self,
        user: &AuthUser,
        business_id: Uuid,
        request: PaymentRequest,
    ) -> AppResult<PaymentReceipt> {
        let amount = resolve_amount(request.amount, self.listing_fee)?;

        let mut tx = self.db.begin().await?;

        let target = sqlx::query_as::<_, ListingPaymentTarget>(
            "SELECT seller_id, status FROM businesses WHERE id = $1 FOR UPDATE",
        )
        .bind(business_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Business".to_string()))?;

        if target.seller_id != user.user_id {
            return Err(AppError::NotOwner);
        }
        let status = target
            .status
            .parse::<ListingStatus>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if status != ListingStatus::PendingPayment {
            return Err(AppError::InvalidStateTransition(format!(
                "Listing fee can only be paid for a listing pending payment (current status: {})",
                status
            )));
        }

        let outcome = self.simulator.charge();
        let (payment_id, created_at) = record_payment(
            &mut tx,
            user.user_id,
            Some(business_id),
            PaymentKind::ListingFee,
            amount,
            outcome,
        )
        .await?;

        if outcome.is_success() {
            sqlx::query("UPDATE businesses SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(business_id)
                .bind(ListingStatus::Active.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            %business_id,
            %payment_id,
            status = outcome.as_str(),
            "Listing fee charged"
        );

        let message = if outcome.is_success() {
            "Payment successful. Your listing is now active."
        } else {
            "Payment failed. Your listing is still pending payment; please try again."
        };

        Ok(PaymentReceipt {
            payment_id,
            kind: PaymentKind::ListingFee,
            status: outcome,
            business_id: Some(business_id),
            amount,
            message: message.to_string(),
            subscription_expires_at: None,
            created_at,
        })
    }

    /// Charge a buyer for one subscription period
    pub async fn pay_subscription(
        &self,
        user: &AuthUser,
        request: PaymentRequest,
    ) -> AppResult<PaymentReceipt> {
        if !user.is_buyer() {
            return Err(AppError::InsufficientPermissions);
        }
        let amount = resolve_amount(request.amount, self.subscription_price)?;

        let mut tx = self.db.begin().await?;

        let subscriber = sqlx::query_as::<_, SubscriberRow>(
            "SELECT role, subscription_status, subscription_expires_at \
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if subscriber.role != UserRole::Buyer.as_str() {
            return Err(AppError::InsufficientPermissions);
        }
        let current = subscriber
            .subscription_status
            .parse::<SubscriptionStatus>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let outcome = self.simulator.charge();
        let (payment_id, created_at) = record_payment(
            &mut tx,
            user.user_id,
            None,
            PaymentKind::Subscription,
            amount,
            outcome,
        )
        .await?;

        let expires_at = if outcome.is_success() {
            let expiry = extend_subscription(
                current,
                subscriber.subscription_expires_at,
                created_at,
                self.subscription_days,
            );
            sqlx::query(
                "UPDATE users SET subscription_status = $2, subscription_expires_at = $3, \
                 updated_at = NOW() WHERE id = $1",
            )
            .bind(user.user_id)
            .bind(SubscriptionStatus::Active.as_str())
            .bind(expiry)
            .execute(&mut *tx)
            .await?;
            Some(expiry)
        } else {
            subscriber.subscription_expires_at
        };

        tx.commit().await?;

        tracing::info!(
            user_id = %user.user_id,
            %payment_id,
            status = outcome.as_str(),
            "Subscription charged"
        );

        let message = if outcome.is_success() {
            "Payment successful. Your subscription is active."
        } else {
            "Payment failed. Your subscription was not changed; please try again."
        };

        Ok(PaymentReceipt {
            payment_id,
            kind: PaymentKind::Subscription,
            status: outcome,
            business_id: None,
            amount,
            message: message.to_string(),
            subscription_expires_at: expires_at,
            created_at,
        })
    }
}

/// Client amount, or the configured price when omitted; must cover the price
fn resolve_amount(requested: Option<Decimal>, price: Decimal) -> AppResult<Decimal> {
    match requested {
        None => Ok(price),
        Some(amount) if amount < price => Err(AppError::validation(
            "amount",
            format!("Amount must be at least {}", price),
        )),
        Some(amount) => Ok(amount),
    }
}

async fn record_payment(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    business_id: Option<Uuid>,
    kind: PaymentKind,
    amount: Decimal,
    status: PaymentStatus,
) -> AppResult<(Uuid, DateTime<Utc>)> {
    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        r#"
        INSERT INTO payments (id, user_id, business_id, kind, amount, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(business_id)
    .bind(kind.as_str())
    .bind(amount)
    .bind(status.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_simulator_clamps_rate() {
        assert_eq!(PaymentSimulator::new(1.7).success_rate(), 1.0);
        assert_eq!(PaymentSimulator::new(-0.2).success_rate(), 0.0);
        assert_eq!(PaymentSimulator::new(f64::NAN).success_rate(), 0.0);
    }

    #[test]
    fn test_simulator_extremes_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(42);
        let always = PaymentSimulator::new(1.0);
        let never = PaymentSimulator::new(0.0);
        for _ in 0..100 {
            assert_eq!(always.charge_with(&mut rng), PaymentStatus::Success);
            assert_eq!(never.charge_with(&mut rng), PaymentStatus::Failed);
        }
    }

    #[test]
    fn test_simulator_rate_is_roughly_honoured() {
        let mut rng = StdRng::seed_from_u64(1);
        let sim = PaymentSimulator::new(0.9);
        let successes = (0..10_000)
            .filter(|_| sim.charge_with(&mut rng).is_success())
            .count();
        assert!((8_700..=9_300).contains(&successes), "got {successes}");
    }

    #[test]
    fn test_extend_from_now_when_inactive() {
        let now = Utc::now();
        let expiry = extend_subscription(SubscriptionStatus::None, None, now, 30);
        assert_eq!(expiry, now + Duration::days(30));

        let lapsed = now - Duration::days(5);
        let expiry = extend_subscription(SubscriptionStatus::Active, Some(lapsed), now, 30);
        assert_eq!(expiry, now + Duration::days(30));
    }

    #[test]
    fn test_extend_carries_remaining_time() {
        let now = Utc::now();
        let current = now + Duration::days(10);
        let expiry = extend_subscription(SubscriptionStatus::Active, Some(current), now, 30);
        assert_eq!(expiry, now + Duration::days(40));
    }

    #[test]
    fn test_resolve_amount() {
        let fee = Decimal::new(9900, 2);
        assert_eq!(resolve_amount(None, fee).unwrap(), fee);
        assert_eq!(resolve_amount(Some(Decimal::from(100)), fee).unwrap(), Decimal::from(100));
        assert!(resolve_amount(Some(Decimal::from(10)), fee).is_err());
    }
}
