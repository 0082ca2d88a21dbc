//! Validation utilities for the Business Marketplace
//!
//! Single-value checks return `Result<(), &'static str>`; the per-step listing
//! checks collect every failing field so the wizard can highlight them at once.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    CreateListingInput, FinancialYear, KeyMetrics, FINANCIAL_YEARS_REQUIRED,
    MAX_DOCUMENTS_PER_LISTING, MAX_DOCUMENT_SIZE_BYTES, PDF_CONTENT_TYPE,
};

/// Oldest fiscal year accepted in the financial table
pub const MIN_FINANCIAL_YEAR: i32 = 1900;

/// Upper bound on the number of key metric entries
pub const MAX_KEY_METRICS: usize = 50;

/// Longest listing title, counted after trimming
pub const MAX_TITLE_CHARS: usize = 200;

/// A validation failure tied to a form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic structural check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > 72 {
        // bcrypt ignores everything past 72 bytes
        return Err("Password must be at most 72 characters");
    }
    Ok(())
}

pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("This field is required");
    }
    Ok(())
}

/// Listing titles are stored trimmed, so the length limit applies to the trimmed text
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    validate_required(title)?;
    if title.trim().chars().count() > MAX_TITLE_CHARS {
        return Err("Title must be at most 200 characters");
    }
    Ok(())
}

/// Monetary amounts on a listing can never be negative
pub fn validate_non_negative(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Listing Validations
// ============================================================================

/// Validate the three-year financial table
pub fn validate_financial_table(
    years: &[FinancialYear],
    current_year: i32,
) -> Result<(), &'static str> {
    if years.len() != FINANCIAL_YEARS_REQUIRED {
        return Err("Financial data must cover exactly 3 years");
    }

    let mut seen = HashSet::new();
    for record in years {
        if record.year < MIN_FINANCIAL_YEAR || record.year > current_year {
            return Err("Financial year is out of range");
        }
        if !seen.insert(record.year) {
            return Err("Financial years must be distinct");
        }
        if record.revenue < Decimal::ZERO
            || record.assets < Decimal::ZERO
            || record.liabilities < Decimal::ZERO
        {
            return Err("Revenue, assets and liabilities cannot be negative");
        }
    }
    Ok(())
}

/// Validate the free-form key metrics map
pub fn validate_key_metrics(metrics: &KeyMetrics) -> Result<(), &'static str> {
    if metrics.len() > MAX_KEY_METRICS {
        return Err("Too many key metrics");
    }
    if metrics.keys().any(|k| k.trim().is_empty()) {
        return Err("Key metric names cannot be empty");
    }
    Ok(())
}

fn check(errors: &mut Vec<FieldError>, field: &str, result: Result<(), &'static str>) {
    if let Err(message) = result {
        errors.push(FieldError::new(field, message));
    }
}

fn check_present<T>(errors: &mut Vec<FieldError>, field: &str, value: &Option<T>) -> bool {
    if value.is_none() {
        errors.push(FieldError::new(field, "This field is required"));
        return false;
    }
    true
}

/// Step 1: business info
pub fn validate_business_info(input: &CreateListingInput) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(&mut errors, "title", validate_title(&input.title));
    check(&mut errors, "description", validate_required(&input.description));
    check_present(&mut errors, "industry", &input.industry);
    check_present(&mut errors, "region", &input.region);
    check_present(&mut errors, "risk_grade", &input.risk_grade);
    errors
}

/// Step 2: headline financials
pub fn validate_financials(input: &CreateListingInput) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let amounts = [
        ("annual_revenue", &input.annual_revenue),
        ("ebitda", &input.ebitda),
        ("asking_price", &input.asking_price),
    ];
    for (field, value) in amounts {
        if check_present(&mut errors, field, value) {
            if let Some(amount) = value {
                check(&mut errors, field, validate_non_negative(*amount));
            }
        }
    }
    errors
}

/// Step 3: seller info
pub fn validate_seller_info(input: &CreateListingInput) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(&mut errors, "seller_name", validate_required(&input.seller_name));
    check(&mut errors, "seller_email", validate_email(&input.seller_email));
    check(&mut errors, "reason_for_sale", validate_required(&input.reason_for_sale));
    check(
        &mut errors,
        "growth_opportunities",
        validate_required(&input.growth_opportunities),
    );
    errors
}

/// Step 4: three-year financial table
pub fn validate_financial_history(input: &CreateListingInput, current_year: i32) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(
        &mut errors,
        "financial_data",
        validate_financial_table(&input.financial_data, current_year),
    );
    errors
}

/// Step 5: key metrics
pub fn validate_key_metrics_step(input: &CreateListingInput) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(&mut errors, "key_metrics", validate_key_metrics(&input.key_metrics));
    errors
}

/// Everything a listing needs before it can leave the draft state
pub fn validate_listing_for_publish(input: &CreateListingInput, current_year: i32) -> Vec<FieldError> {
    let mut errors = validate_business_info(input);
    errors.extend(validate_financials(input));
    errors.extend(validate_seller_info(input));
    errors.extend(validate_financial_history(input, current_year));
    errors.extend(validate_key_metrics_step(input));
    errors
}

/// Drafts only need a title; whatever else is filled in must still be well-formed
pub fn validate_listing_draft(input: &CreateListingInput, current_year: i32) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(&mut errors, "title", validate_title(&input.title));

    let amounts = [
        ("annual_revenue", input.annual_revenue),
        ("ebitda", input.ebitda),
        ("asking_price", input.asking_price),
    ];
    for (field, value) in amounts {
        if let Some(amount) = value {
            check(&mut errors, field, validate_non_negative(amount));
        }
    }
    if !input.seller_email.trim().is_empty() {
        check(&mut errors, "seller_email", validate_email(&input.seller_email));
    }
    if input.financial_data.len() > FINANCIAL_YEARS_REQUIRED {
        errors.push(FieldError::new(
            "financial_data",
            "Financial data must cover exactly 3 years",
        ));
    }
    if input
        .financial_data
        .iter()
        .any(|y| y.year < MIN_FINANCIAL_YEAR || y.year > current_year)
    {
        errors.push(FieldError::new("financial_data", "Financial year is out of range"));
    }
    check(&mut errors, "key_metrics", validate_key_metrics(&input.key_metrics));
    errors
}

// ============================================================================
// Document Validations
// ============================================================================

/// Validate an uploaded file is a PDF within the size limit
pub fn validate_pdf_upload(
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<(), &'static str> {
    if filename.trim().is_empty() {
        return Err("Filename is required");
    }
    if data.is_empty() {
        return Err("File is empty");
    }
    if data.len() > MAX_DOCUMENT_SIZE_BYTES {
        return Err("File exceeds the 10MB limit");
    }

    let has_pdf_extension = filename.to_ascii_lowercase().ends_with(".pdf");
    let type_ok = match content_type {
        Some(ct) if ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE) => true,
        Some(ct) if ct.eq_ignore_ascii_case("application/octet-stream") => has_pdf_extension,
        None => has_pdf_extension,
        Some(_) => false,
    };
    if !type_ok {
        return Err("Only PDF documents are accepted");
    }
    if !data.starts_with(b"%PDF") {
        return Err("File content is not a PDF");
    }
    Ok(())
}

/// Validate a listing can take one more document
pub fn validate_document_capacity(existing: usize) -> Result<(), &'static str> {
    if existing >= MAX_DOCUMENTS_PER_LISTING {
        return Err("A listing can have at most 10 documents");
    }
    Ok(())
}
