//! Seller workflow tests against a live database
//!
//! Run with `DATABASE_URL` pointing at a scratch Postgres database:
//! `cargo test -p business-marketplace-backend --test workflow_tests -- --ignored`
//!
//! Scenarios covered:
//! - Duplicate email registration is rejected
//! - Catalog filters return only matching listings
//! - draft -> pending_email_verification -> pending_payment -> active
//! - Seller contact redaction for anonymous and unsubscribed viewers
//! - The per-listing document limit under concurrent uploads
//! - Concurrent page views are all counted
//! - Only drafts can be deleted
//! - Verification codes are burned after too many wrong guesses

use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use marketplace_backend::error::AppError;
use marketplace_backend::middleware::AuthUser;
use marketplace_backend::services::auth::RegisterInput;
use marketplace_backend::services::document::UploadedFile;
use marketplace_backend::services::verification::code_digest;
use marketplace_backend::services::{
    AuthService, DocumentService, ListingService, PaymentService, PaymentSimulator,
    VerificationService,
};
use marketplace_backend::Config;
use shared::{
    CreateListingInput, FinancialYear, Industry, ListingFilter, ListingStatus, PaymentRequest,
    PaymentStatus, Region, RiskGrade, UserRole, MAX_DOCUMENTS_PER_LISTING, MAX_PER_PAGE,
};

// ============================================================================
// Fixtures
// ============================================================================

fn test_config(database_url: &str) -> Config {
    Config::defaults("test")
        .and_then(|b| b.set_override("database.url", database_url))
        .and_then(|b| b.set_override("jwt.secret", "workflow-test-secret-0123456789"))
        .and_then(|b| b.set_override("payments.success_rate", 1.0))
        .and_then(|b| b.build())
        .and_then(|c| c.try_deserialize())
        .expect("test config")
}

async fn setup() -> (PgPool, Config) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let config = test_config(&url);
    let db = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("database connection");
    sqlx::migrate!("./migrations").run(&db).await.expect("migrations");
    (db, config)
}

async fn register(db: &PgPool, config: &Config, role: UserRole) -> AuthUser {
    let response = AuthService::new(db.clone(), config)
        .register(RegisterInput {
            email: format!("{}-{}@example.md", role.as_str(), Uuid::new_v4()),
            password: "correct-horse-battery".into(),
            name: "Test Account".into(),
            role,
        })
        .await
        .expect("registration");
    AuthUser {
        user_id: response.user.id,
        email: response.user.email,
        role,
    }
}

async fn mark_verified(db: &PgPool, user: &AuthUser) {
    sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
        .bind(user.user_id)
        .execute(db)
        .await
        .expect("verify user");
}

async fn plant_code(db: &PgPool, config: &Config, user: &AuthUser, code: &str) {
    let digest = code_digest(&config.jwt.secret, user.user_id, code).expect("digest");
    sqlx::query(
        "INSERT INTO email_verifications (id, user_id, code_digest, expires_at) \
         VALUES ($1, $2, $3, NOW() + INTERVAL '15 minutes')",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(digest)
    .execute(db)
    .await
    .expect("insert code");
}

fn complete_listing(publish: bool) -> CreateListingInput {
    let last_year = Utc::now().year() - 1;
    let financial_data = (0..3)
        .map(|offset| FinancialYear {
            year: last_year - offset,
            revenue: Decimal::from(900_000 - offset as i64 * 50_000),
            profit_loss: Decimal::from(110_000),
            ebitda: Decimal::from(140_000),
            assets: Decimal::from(1_500_000),
            liabilities: Decimal::from(700_000),
            cash_flow: Decimal::from(120_000),
        })
        .collect();
    let key_metrics = match json!({ "employees": 14, "years_in_business": 9 }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };

    CreateListingInput {
        title: "Bakery in Orhei".into(),
        description: "Family bakery with two ovens and a loyal local clientele.".into(),
        industry: Some(Industry::FoodService),
        region: Some(Region::Orhei),
        annual_revenue: Some(Decimal::from(900_000)),
        ebitda: Some(Decimal::from(140_000)),
        asking_price: Some(Decimal::from(1_100_000)),
        risk_grade: Some(RiskGrade::B),
        seller_name: String::new(),
        seller_email: String::new(),
        reason_for_sale: "Owner retiring".into(),
        growth_opportunities: "Wholesale to supermarkets".into(),
        financial_data,
        key_metrics,
        publish,
    }
}

async fn active_listing(db: &PgPool, config: &Config) -> (AuthUser, Uuid) {
    let seller = register(db, config, UserRole::Seller).await;
    mark_verified(db, &seller).await;
    let listings = ListingService::new(db.clone());
    let (detail, _) = listings
        .create(&seller, complete_listing(true))
        .await
        .expect("create listing");
    let payments = PaymentService::new(db.clone(), config, PaymentSimulator::new(1.0));
    payments
        .pay_listing_fee(&seller, detail.id, PaymentRequest::default())
        .await
        .expect("listing fee");
    (seller, detail.id)
}

fn pdf(name: &str) -> UploadedFile {
    UploadedFile {
        filename: name.into(),
        content_type: Some("application/pdf".into()),
        data: b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec(),
    }
}

// ============================================================================
// Accounts and Catalog
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_duplicate_email_is_rejected() {
    let (db, config) = setup().await;
    let auth = AuthService::new(db.clone(), &config);
    let email = format!("dup-{}@example.md", Uuid::new_v4());
    let input = |email: &str| RegisterInput {
        email: email.to_string(),
        password: "correct-horse-battery".into(),
        name: "Duplicate".into(),
        role: UserRole::Buyer,
    };

    auth.register(input(&email)).await.expect("first registration");
    let second = auth.register(input(&email.to_uppercase())).await;
    assert!(matches!(second, Err(AppError::DuplicateEntry(_))));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_risk_grade_filter_returns_only_matches() {
    let (db, config) = setup().await;
    let (_, id) = active_listing(&db, &config).await;
    let listings = ListingService::new(db.clone());

    let filter = ListingFilter {
        risk_grade: Some(RiskGrade::B),
        per_page: Some(MAX_PER_PAGE),
        ..Default::default()
    };
    let page = listings.search(&filter).await.expect("search");
    assert!(!page.data.is_empty());
    assert!(page.data.iter().all(|card| card.risk_grade == RiskGrade::B));
    assert!(page.data.iter().all(|card| card.status == ListingStatus::Active));

    let other = ListingFilter {
        risk_grade: Some(RiskGrade::E),
        per_page: Some(MAX_PER_PAGE),
        ..Default::default()
    };
    let page = listings.search(&other).await.expect("search");
    assert!(page.data.iter().all(|card| card.id != id));
}

// ============================================================================
// Seller Workflow
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_listing_reaches_active_after_verification_and_payment() {
    let (db, config) = setup().await;
    let seller = register(&db, &config, UserRole::Seller).await;
    let listings = ListingService::new(db.clone());

    let (draft, submission) = listings
        .create(&seller, complete_listing(false))
        .await
        .expect("create draft");
    assert!(submission.is_none());
    assert_eq!(draft.status, ListingStatus::Draft);
    assert_eq!(draft.seller_email.as_deref(), Some(seller.email.as_str()));

    let submission = listings.submit(&seller, draft.id).await.expect("submit");
    assert_eq!(submission.status, ListingStatus::PendingEmailVerification);
    assert!(submission.verification_required);

    // Paying before verification is a workflow error
    let payments = PaymentService::new(db.clone(), &config, PaymentSimulator::new(1.0));
    let early = payments
        .pay_listing_fee(&seller, draft.id, PaymentRequest::default())
        .await;
    assert!(matches!(early, Err(AppError::InvalidStateTransition(_))));

    plant_code(&db, &config, &seller, "482913").await;
    let verification = VerificationService::new(db.clone(), &config);
    let result = verification
        .verify(seller.user_id, "482913")
        .await
        .expect("verify");
    assert!(result.email_verified);
    assert_eq!(result.listings_advanced, 1);

    let pending = listings.get_owned(&seller, draft.id).await.expect("fetch");
    assert_eq!(pending.status, ListingStatus::PendingPayment);

    let receipt = payments
        .pay_listing_fee(&seller, draft.id, PaymentRequest::default())
        .await
        .expect("pay");
    assert_eq!(receipt.status, PaymentStatus::Success);
    assert_eq!(receipt.amount, config.payments.listing_fee);

    let active = listings.get_owned(&seller, draft.id).await.expect("fetch");
    assert_eq!(active.status, ListingStatus::Active);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_incomplete_draft_cannot_be_submitted() {
    let (db, config) = setup().await;
    let seller = register(&db, &config, UserRole::Seller).await;
    let listings = ListingService::new(db.clone());

    let input = CreateListingInput {
        title: "Half-finished listing".into(),
        ..Default::default()
    };
    let (draft, _) = listings.create(&seller, input).await.expect("create draft");

    let result = listings.submit(&seller, draft.id).await;
    match result {
        Err(AppError::InvalidFields(errors)) => {
            assert!(errors.iter().any(|e| e.field == "industry"));
            assert!(errors.iter().any(|e| e.field == "financial_data"));
        }
        other => panic!("expected field errors, got {other:?}"),
    }
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_only_drafts_can_be_deleted() {
    let (db, config) = setup().await;
    let (seller, active_id) = active_listing(&db, &config).await;
    let listings = ListingService::new(db.clone());

    let result = listings.delete(&seller, active_id).await;
    assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));

    let (draft, _) = listings
        .create(&seller, complete_listing(false))
        .await
        .expect("create draft");
    listings.delete(&seller, draft.id).await.expect("delete draft");
    assert!(matches!(
        listings.get_owned(&seller, draft.id).await,
        Err(AppError::NotFound(_))
    ));
}

// ============================================================================
// Contact Redaction
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_seller_contact_requires_subscription() {
    let (db, config) = setup().await;
    let (seller, id) = active_listing(&db, &config).await;
    let listings = ListingService::new(db.clone());

    let anonymous = listings.view(id, None).await.expect("anonymous view");
    assert!(anonymous.seller_email.is_none());

    let buyer = register(&db, &config, UserRole::Buyer).await;
    let unsubscribed = listings.view(id, Some(&buyer)).await.expect("buyer view");
    assert!(unsubscribed.seller_email.is_none());

    let payments = PaymentService::new(db.clone(), &config, PaymentSimulator::new(1.0));
    let receipt = payments
        .pay_subscription(&buyer, PaymentRequest::default())
        .await
        .expect("subscribe");
    assert!(receipt.subscription_expires_at.is_some());

    let subscribed = listings.view(id, Some(&buyer)).await.expect("buyer view");
    assert_eq!(subscribed.seller_email.as_deref(), Some(seller.email.as_str()));

    let other_seller = register(&db, &config, UserRole::Seller).await;
    let stranger = listings.view(id, Some(&other_seller)).await.expect("seller view");
    assert!(stranger.seller_email.is_none());
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_document_download_requires_subscription() {
    let (db, config) = setup().await;
    let seller = register(&db, &config, UserRole::Seller).await;
    let listings = ListingService::new(db.clone());
    let documents = DocumentService::new(db.clone());

    let (draft, _) = listings
        .create(&seller, complete_listing(false))
        .await
        .expect("create draft");
    let doc = documents
        .upload(&seller, draft.id, pdf("balance-sheet.pdf"))
        .await
        .expect("upload");

    // Drafts are invisible to everyone but the owner
    let buyer = register(&db, &config, UserRole::Buyer).await;
    assert!(matches!(
        documents.list(Some(&buyer), draft.id).await,
        Err(AppError::NotFound(_))
    ));

    let own = documents.get(Some(&seller), draft.id, doc.id).await.expect("owner download");
    assert!(!own.data_base64.is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_document_limit_holds_under_concurrent_uploads() {
    let (db, config) = setup().await;
    let seller = Arc::new(register(&db, &config, UserRole::Seller).await);
    let listings = ListingService::new(db.clone());
    let (draft, _) = listings
        .create(&seller, complete_listing(false))
        .await
        .expect("create draft");

    let attempts = MAX_DOCUMENTS_PER_LISTING + 5;
    let handles: Vec<_> = (0..attempts)
        .map(|i| {
            let documents = DocumentService::new(db.clone());
            let seller = Arc::clone(&seller);
            tokio::spawn(async move {
                documents
                    .upload(&seller, draft.id, pdf(&format!("report-{i}.pdf")))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        if handle.await.expect("task").is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, MAX_DOCUMENTS_PER_LISTING);

    let stored = DocumentService::new(db.clone())
        .list(Some(&*seller), draft.id)
        .await
        .expect("list");
    assert_eq!(stored.len(), MAX_DOCUMENTS_PER_LISTING);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_concurrent_views_are_all_counted() {
    let (db, config) = setup().await;
    let (_, id) = active_listing(&db, &config).await;
    let listings = ListingService::new(db.clone());
    let before = listings.view(id, None).await.expect("view").views;

    let viewers = 25;
    let handles: Vec<_> = (0..viewers)
        .map(|_| {
            let listings = listings.clone();
            tokio::spawn(async move { listings.view(id, None).await.map(|d| d.views) })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task").expect("view");
    }

    let after = listings.view(id, None).await.expect("view").views;
    assert_eq!(after, before + viewers + 1);
}

// ============================================================================
// Verification Codes
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_code_is_burned_after_max_attempts() {
    let (db, config) = setup().await;
    let seller = register(&db, &config, UserRole::Seller).await;
    plant_code(&db, &config, &seller, "111111").await;
    let verification = VerificationService::new(db.clone(), &config);

    for _ in 0..config.verification.max_attempts {
        let result = verification.verify(seller.user_id, "999999").await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    // The right code no longer works once the active one is burned
    let result = verification.verify(seller.user_id, "111111").await;
    assert!(matches!(result, Err(AppError::Validation { .. })));

    let verified = sqlx::query_scalar::<_, bool>("SELECT email_verified FROM users WHERE id = $1")
        .bind(seller.user_id)
        .fetch_one(&db)
        .await
        .expect("user");
    assert!(!verified);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_resend_after_verification_is_rejected() {
    let (db, config) = setup().await;
    let seller = register(&db, &config, UserRole::Seller).await;
    mark_verified(&db, &seller).await;

    let result = VerificationService::new(db.clone(), &config)
        .resend(seller.user_id)
        .await;
    assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));
}
