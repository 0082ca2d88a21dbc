//! Email verification codes
//!
//! Codes are six digits, stored only as an HMAC-SHA256 digest keyed by the
//! JWT secret, and written to the log in place of an outgoing email.

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::ListingStatus;

type HmacSha256 = Hmac<Sha256>;

/// Email verification service
#[derive(Clone)]
pub struct VerificationService {
    db: PgPool,
    secret: String,
    code_ttl: Duration,
    max_attempts: i32,
}

/// Outcome of a successful verification
#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub email_verified: bool,
    /// Listings moved from `pending_email_verification` to `pending_payment`
    pub listings_advanced: u64,
}

/// Confirmation that a new code was issued
#[derive(Debug, Serialize)]
pub struct CodeIssued {
    pub sent_to: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PendingCode {
    id: Uuid,
    code_digest: Vec<u8>,
    attempts: i32,
}

impl VerificationService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            secret: config.jwt.secret.clone(),
            code_ttl: Duration::minutes(config.verification.code_ttl_minutes),
            max_attempts: config.verification.max_attempts,
        }
    }

    /// Issue a fresh code for `user_id`, invalidating any earlier one
    pub async fn issue_code(&self, user_id: Uuid) -> AppResult<CodeIssued> {
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let code = generate_code(&mut rand::thread_rng());
        let digest = code_digest(&self.secret, user_id, &code)?;
        let expires_at = Utc::now() + self.code_ttl;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE email_verifications SET consumed_at = NOW() \
             WHERE user_id = $1 AND consumed_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO email_verifications (id, user_id, code_digest, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&digest)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // No mail transport: the code is delivered through the log
        tracing::info!(%user_id, email = %email, code = %code, "Email verification code issued");

        Ok(CodeIssued {
            sent_to: email,
            expires_in_minutes: self.code_ttl.num_minutes(),
        })
    }

    /// Issue a new code unless the account is already verified
    pub async fn resend(&self, user_id: Uuid) -> AppResult<CodeIssued> {
        let verified =
            sqlx::query_scalar::<_, bool>("SELECT email_verified FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("User".to_string()))?;
        if verified {
            return Err(AppError::InvalidStateTransition(
                "Email address is already verified".to_string(),
            ));
        }
        self.issue_code(user_id).await
    }

    /// Check `code`, mark the account verified and release its listings to payment
    pub async fn verify(&self, user_id: Uuid, code: &str) -> AppResult<VerificationResult> {
        let code = code.trim();
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::validation("code", "Verification code must be 6 digits"));
        }

        let mut tx = self.db.begin().await?;

        let pending = sqlx::query_as::<_, PendingCode>(
            r#"
            SELECT id, code_digest, attempts
            FROM email_verifications
            WHERE user_id = $1 AND consumed_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::validation("code", "No active verification code; request a new one")
        })?;

        if !digest_matches(&self.secret, user_id, code, &pending.code_digest)? {
            let attempts = pending.attempts + 1;
            let burn = attempts >= self.max_attempts;
            sqlx::query(
                "UPDATE email_verifications SET attempts = $2, \
                 consumed_at = CASE WHEN $3 THEN NOW() ELSE NULL END WHERE id = $1",
            )
            .bind(pending.id)
            .bind(attempts)
            .bind(burn)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            tracing::warn!(%user_id, attempts, "Wrong email verification code");
            return Err(AppError::validation("code", "Invalid verification code"));
        }

        sqlx::query("UPDATE email_verifications SET consumed_at = NOW() WHERE id = $1")
            .bind(pending.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let advanced = sqlx::query(
            "UPDATE businesses SET status = $2, updated_at = NOW() \
             WHERE seller_id = $1 AND status = $3",
        )
        .bind(user_id)
        .bind(ListingStatus::PendingPayment.as_str())
        .bind(ListingStatus::PendingEmailVerification.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(%user_id, listings_advanced = advanced, "Email verified");

        Ok(VerificationResult {
            email_verified: true,
            listings_advanced: advanced,
        })
    }
}

/// Six decimal digits, zero padded
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

fn keyed_mac(secret: &str, user_id: Uuid, code: &str) -> AppResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(user_id.as_bytes());
    mac.update(code.as_bytes());
    Ok(mac)
}

/// Digest stored in place of the code
pub fn code_digest(secret: &str, user_id: Uuid, code: &str) -> AppResult<Vec<u8>> {
    Ok(keyed_mac(secret, user_id, code)?.finalize().into_bytes().to_vec())
}

/// Constant-time comparison against a stored digest
pub fn digest_matches(secret: &str, user_id: Uuid, code: &str, stored: &[u8]) -> AppResult<bool> {
    Ok(keyed_mac(secret, user_id, code)?.verify_slice(stored).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const SECRET: &str = "unit-test-secret-0123456789";

    #[test]
    fn test_generated_codes_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_digest_matches_only_same_code_and_user() {
        let user = Uuid::new_v4();
        let digest = code_digest(SECRET, user, "123456").unwrap();
        assert_eq!(digest.len(), 32);
        assert!(digest_matches(SECRET, user, "123456", &digest).unwrap());
        assert!(!digest_matches(SECRET, user, "123457", &digest).unwrap());
        assert!(!digest_matches(SECRET, Uuid::new_v4(), "123456", &digest).unwrap());
        assert!(!digest_matches("other-secret-0123456789", user, "123456", &digest).unwrap());
    }
}
