//! WebAssembly module for the Business Marketplace
//!
//! Provides client-side logic for:
//! - The five-step listing wizard (state + per-step validation)
//! - Catalog filter to query-string composition
//! - Pre-upload document checks
//!
//! Structured values cross the boundary as JSON strings.

use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::filter::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;
pub use shared::wizard::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    web_sys::console::debug_1(&JsValue::from_str("business marketplace wasm loaded"));
}

/// Calendar year according to the browser clock
#[wasm_bindgen]
pub fn current_year() -> i32 {
    js_sys::Date::new_0().get_full_year() as i32
}

/// Outcome of a wizard action, serialized for the UI
#[derive(Serialize)]
struct WizardOutcome<'a> {
    ok: bool,
    step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a CreateListingInput>,
    errors: Vec<FieldError>,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn invalid_json(field: &str, err: serde_json::Error) -> String {
    to_json(&WizardOutcome {
        ok: false,
        step: 0,
        payload: None,
        errors: vec![FieldError::new(field, format!("Invalid JSON: {}", err))],
    })
}

/// Browser-side handle on the listing wizard
#[wasm_bindgen]
pub struct ListingWizardHandle {
    inner: ListingWizard,
}

#[wasm_bindgen]
impl ListingWizardHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(current_year: i32) -> ListingWizardHandle {
        Self {
            inner: ListingWizard::new(current_year),
        }
    }

    /// Start a wizard dated by the browser clock
    pub fn for_current_year() -> ListingWizardHandle {
        Self::new(current_year())
    }

    /// Resume a saved draft (JSON of `CreateListingInput`)
    pub fn from_draft(draft_json: &str, current_year: i32) -> Result<ListingWizardHandle, JsValue> {
        let data: CreateListingInput = serde_json::from_str(draft_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid draft JSON: {}", e)))?;
        Ok(Self {
            inner: ListingWizard::from_draft(data, current_year),
        })
    }

    /// 1-based step number
    pub fn step(&self) -> usize {
        self.inner.step().number()
    }

    pub fn step_title(&self) -> String {
        self.inner.step().title().to_string()
    }

    pub fn progress(&self) -> u8 {
        self.inner.progress_percent()
    }

    pub fn is_last_step(&self) -> bool {
        self.inner.is_last_step()
    }

    pub fn data_json(&self) -> String {
        to_json(self.inner.data())
    }

    /// Replace the form data; returns an outcome JSON with any parse error
    pub fn set_data(&mut self, data_json: &str) -> String {
        match serde_json::from_str::<CreateListingInput>(data_json) {
            Ok(data) => {
                *self.inner.data_mut() = data;
                self.outcome(Vec::new(), None)
            }
            Err(e) => invalid_json("data", e),
        }
    }

    pub fn validate_current(&self) -> String {
        self.outcome(self.inner.validate_current(), None)
    }

    pub fn advance(&mut self) -> String {
        let errors = self.inner.advance().err().unwrap_or_default();
        self.outcome(errors, None)
    }

    pub fn back(&mut self) -> usize {
        self.inner.back().number()
    }

    /// Produce the request body; `publish = false` saves a draft
    pub fn submit(&self, publish: bool) -> String {
        let mode = if publish {
            SubmitMode::Publish
        } else {
            SubmitMode::SaveDraft
        };
        match self.inner.submit(mode) {
            Ok(payload) => self.outcome(Vec::new(), Some(&payload)),
            Err(errors) => self.outcome(errors, None),
        }
    }
}

impl ListingWizardHandle {
    fn outcome(&self, errors: Vec<FieldError>, payload: Option<&CreateListingInput>) -> String {
        to_json(&WizardOutcome {
            ok: errors.is_empty(),
            step: self.inner.step().number(),
            payload,
            errors,
        })
    }
}

/// Render a filter (JSON of `ListingFilter`) as a query string for `GET /api/businesses`
#[wasm_bindgen]
pub fn build_filter_query(filter_json: &str) -> Result<String, JsValue> {
    let filter: ListingFilter = serde_json::from_str(filter_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid filter JSON: {}", e)))?;
    Ok(filter.to_query_string())
}

/// Parse the page URL's query string back into filter JSON
#[wasm_bindgen]
pub fn parse_filter_query(query: &str) -> Result<String, JsValue> {
    let filter =
        ListingFilter::from_query_string(query).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(to_json(&filter))
}

/// Check a file before uploading; returns an error message or an empty string
#[wasm_bindgen]
pub fn check_pdf_upload(filename: &str, content_type: &str, data: &[u8]) -> String {
    let content_type = (!content_type.is_empty()).then_some(content_type);
    match validate_pdf_upload(filename, content_type, data) {
        Ok(()) => String::new(),
        Err(msg) => msg.to_string(),
    }
}

/// Whether another document can be attached to a listing that already has `existing`
#[wasm_bindgen]
pub fn can_attach_document(existing: usize) -> bool {
    validate_document_capacity(existing).is_ok()
}

#[wasm_bindgen]
pub fn industry_options() -> String {
    to_json(&Industry::options())
}

#[wasm_bindgen]
pub fn region_options() -> String {
    to_json(&Region::options())
}

#[wasm_bindgen]
pub fn risk_grade_options() -> String {
    to_json(&RiskGrade::options())
}

/// EBITDA multiple implied by the asking price, shown on listing cards
#[wasm_bindgen]
pub fn ebitda_multiple(asking_price: f64, ebitda: f64) -> f64 {
    if ebitda <= 0.0 {
        return 0.0;
    }
    asking_price / ebitda
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> serde_json::Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_wizard_blocks_invalid_step() {
        let mut wizard = ListingWizardHandle::new(2024);
        let outcome = parse(&wizard.advance());
        assert_eq!(outcome["ok"], false);
        assert_eq!(outcome["step"], 1);
        assert!(outcome["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["field"] == "title"));
    }

    #[test]
    fn test_wizard_set_data_then_advance() {
        let mut wizard = ListingWizardHandle::new(2024);
        let data = r#"{
            "title": "Hotel in Soroca",
            "description": "12 rooms",
            "industry": "food_service",
            "region": "soroca",
            "risk_grade": "D"
        }"#;
        assert_eq!(parse(&wizard.set_data(data))["ok"], true);
        let outcome = parse(&wizard.advance());
        assert_eq!(outcome["ok"], true);
        assert_eq!(outcome["step"], 2);
        assert_eq!(wizard.back(), 1);
    }

    #[test]
    fn test_wizard_rejects_bad_json() {
        let mut wizard = ListingWizardHandle::new(2024);
        let outcome = parse(&wizard.set_data("{not json"));
        assert_eq!(outcome["ok"], false);
        assert_eq!(outcome["errors"][0]["field"], "data");
    }

    #[test]
    fn test_wizard_draft_submit() {
        let mut wizard = ListingWizardHandle::new(2024);
        wizard.set_data(r#"{"title": "Draft only"}"#);
        let outcome = parse(&wizard.submit(false));
        assert_eq!(outcome["ok"], true);
        assert_eq!(outcome["payload"]["publish"], false);
        assert_eq!(parse(&wizard.submit(true))["ok"], false);
    }

    #[test]
    fn test_check_pdf_upload() {
        assert_eq!(check_pdf_upload("a.pdf", "application/pdf", b"%PDF-1.7"), "");
        assert!(!check_pdf_upload("a.png", "image/png", b"\x89PNG").is_empty());
    }

    #[test]
    fn test_can_attach_document() {
        assert!(can_attach_document(9));
        assert!(!can_attach_document(10));
    }

    #[test]
    fn test_option_lists() {
        let grades = parse(&risk_grade_options());
        assert_eq!(grades.as_array().unwrap().len(), 5);
        assert_eq!(parse(&region_options())[0]["value"], "chisinau");
        assert_eq!(parse(&industry_options()).as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_ebitda_multiple() {
        assert!((ebitda_multiple(1_000_000.0, 250_000.0) - 4.0).abs() < 1e-9);
        assert_eq!(ebitda_multiple(1_000.0, 0.0), 0.0);
    }
}
