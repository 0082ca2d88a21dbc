//! Five-step listing creation wizard
//!
//! Holds the form state on the client. Moving forward is gated by the
//! validation of the step being left; moving back never validates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CreateListingInput, FinancialYear, FINANCIAL_YEARS_REQUIRED};
use crate::validation::{
    validate_business_info, validate_financial_history, validate_financials,
    validate_key_metrics_step, validate_listing_draft, validate_listing_for_publish,
    validate_seller_info, FieldError,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BusinessInfo,
    Financials,
    SellerInfo,
    FinancialHistory,
    KeyMetrics,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::BusinessInfo,
        WizardStep::Financials,
        WizardStep::SellerInfo,
        WizardStep::FinancialHistory,
        WizardStep::KeyMetrics,
    ];

    /// 1-based position shown in the progress bar
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::BusinessInfo => "Business Information",
            WizardStep::Financials => "Financial Overview",
            WizardStep::SellerInfo => "Seller Information",
            WizardStep::FinancialHistory => "Financial History",
            WizardStep::KeyMetrics => "Key Metrics",
        }
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.number()).copied()
    }

    pub fn prev(&self) -> Option<WizardStep> {
        self.number().checked_sub(2).map(|i| Self::ALL[i])
    }
}

/// How the finished form is sent to the server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    SaveDraft,
    Publish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingWizard {
    step: WizardStep,
    data: CreateListingInput,
    current_year: i32,
}

impl ListingWizard {
    /// Start an empty wizard with the financial table pre-filled for the last three years
    pub fn new(current_year: i32) -> Self {
        let data = CreateListingInput {
            financial_data: blank_financial_years(current_year),
            ..Default::default()
        };
        Self {
            step: WizardStep::BusinessInfo,
            data,
            current_year,
        }
    }

    /// Resume editing a saved draft
    pub fn from_draft(data: CreateListingInput, current_year: i32) -> Self {
        Self {
            step: WizardStep::BusinessInfo,
            data,
            current_year,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn data(&self) -> &CreateListingInput {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut CreateListingInput {
        &mut self.data
    }

    pub fn is_last_step(&self) -> bool {
        self.step.next().is_none()
    }

    pub fn progress_percent(&self) -> u8 {
        (self.step.number() * 100 / WizardStep::ALL.len()) as u8
    }

    pub fn validate_step(&self, step: WizardStep) -> Vec<FieldError> {
        match step {
            WizardStep::BusinessInfo => validate_business_info(&self.data),
            WizardStep::Financials => validate_financials(&self.data),
            WizardStep::SellerInfo => validate_seller_info(&self.data),
            WizardStep::FinancialHistory => validate_financial_history(&self.data, self.current_year),
            WizardStep::KeyMetrics => validate_key_metrics_step(&self.data),
        }
    }

    pub fn validate_current(&self) -> Vec<FieldError> {
        self.validate_step(self.step)
    }

    /// Move to the next step if the current one is valid
    pub fn advance(&mut self) -> Result<WizardStep, Vec<FieldError>> {
        let errors = self.validate_current();
        if !errors.is_empty() {
            return Err(errors);
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.step
    }

    /// Jump to `target`; jumping forward requires every skipped step to be valid
    pub fn go_to(&mut self, target: WizardStep) -> Result<WizardStep, Vec<FieldError>> {
        if target > self.step {
            for step in WizardStep::ALL
                .into_iter()
                .filter(|s| *s >= self.step && *s < target)
            {
                let errors = self.validate_step(step);
                if !errors.is_empty() {
                    self.step = step;
                    return Err(errors);
                }
            }
        }
        self.step = target;
        Ok(self.step)
    }

    /// Produce the payload for `POST /api/businesses`
    pub fn submit(&self, mode: SubmitMode) -> Result<CreateListingInput, Vec<FieldError>> {
        let errors = match mode {
            SubmitMode::SaveDraft => validate_listing_draft(&self.data, self.current_year),
            SubmitMode::Publish => validate_listing_for_publish(&self.data, self.current_year),
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut payload = self.data.clone();
        payload.publish = mode == SubmitMode::Publish;
        Ok(payload)
    }
}

/// Three zeroed rows for the years preceding `current_year`, newest first
pub fn blank_financial_years(current_year: i32) -> Vec<FinancialYear> {
    (1..=FINANCIAL_YEARS_REQUIRED as i32)
        .map(|offset| FinancialYear {
            year: current_year - offset,
            revenue: Decimal::ZERO,
            profit_loss: Decimal::ZERO,
            ebitda: Decimal::ZERO,
            assets: Decimal::ZERO,
            liabilities: Decimal::ZERO,
            cash_flow: Decimal::ZERO,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Industry, Region, RiskGrade};

    fn fill_business_info(w: &mut ListingWizard) {
        let d = w.data_mut();
        d.title = "Bakery in Orhei".into();
        d.description = "Two ovens, loyal customers".into();
        d.industry = Some(Industry::FoodService);
        d.region = Some(Region::Orhei);
        d.risk_grade = Some(RiskGrade::C);
    }

    fn fill_financials(w: &mut ListingWizard) {
        let d = w.data_mut();
        d.annual_revenue = Some(Decimal::from(120_000));
        d.ebitda = Some(Decimal::from(18_000));
        d.asking_price = Some(Decimal::from(150_000));
    }

    fn fill_seller(w: &mut ListingWizard) {
        let d = w.data_mut();
        d.seller_name = "Elena".into();
        d.seller_email = "elena@example.md".into();
        d.reason_for_sale = "Moving abroad".into();
        d.growth_opportunities = "Delivery".into();
    }

    #[test]
    fn test_step_navigation_helpers() {
        assert_eq!(WizardStep::BusinessInfo.number(), 1);
        assert_eq!(WizardStep::KeyMetrics.number(), 5);
        assert_eq!(WizardStep::BusinessInfo.prev(), None);
        assert_eq!(WizardStep::KeyMetrics.next(), None);
        assert_eq!(WizardStep::Financials.next(), Some(WizardStep::SellerInfo));
        assert_eq!(WizardStep::Financials.prev(), Some(WizardStep::BusinessInfo));
    }

    #[test]
    fn test_new_wizard_prefills_three_years() {
        let wizard = ListingWizard::new(2024);
        let years: Vec<i32> = wizard.data().financial_data.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2023, 2022, 2021]);
        assert_eq!(wizard.progress_percent(), 20);
    }

    #[test]
    fn test_cannot_advance_with_invalid_step() {
        let mut wizard = ListingWizard::new(2024);
        let errors = wizard.advance().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "title"));
        assert_eq!(wizard.step(), WizardStep::BusinessInfo);
    }

    #[test]
    fn test_full_walkthrough_and_publish() {
        let mut wizard = ListingWizard::new(2024);
        fill_business_info(&mut wizard);
        assert_eq!(wizard.advance().unwrap(), WizardStep::Financials);
        fill_financials(&mut wizard);
        assert_eq!(wizard.advance().unwrap(), WizardStep::SellerInfo);
        fill_seller(&mut wizard);
        assert_eq!(wizard.advance().unwrap(), WizardStep::FinancialHistory);
        assert_eq!(wizard.advance().unwrap(), WizardStep::KeyMetrics);
        assert!(wizard.is_last_step());
        assert_eq!(wizard.advance().unwrap(), WizardStep::KeyMetrics);

        let payload = wizard.submit(SubmitMode::Publish).unwrap();
        assert!(payload.publish);
        assert_eq!(payload.title, "Bakery in Orhei");
    }

    #[test]
    fn test_back_never_validates() {
        let mut wizard = ListingWizard::new(2024);
        fill_business_info(&mut wizard);
        wizard.advance().unwrap();
        wizard.data_mut().title.clear();
        assert_eq!(wizard.back(), WizardStep::BusinessInfo);
        assert_eq!(wizard.back(), WizardStep::BusinessInfo);
    }

    #[test]
    fn test_go_to_stops_at_first_invalid_step() {
        let mut wizard = ListingWizard::new(2024);
        fill_business_info(&mut wizard);
        let errors = wizard.go_to(WizardStep::KeyMetrics).unwrap_err();
        assert_eq!(wizard.step(), WizardStep::Financials);
        assert!(errors.iter().any(|e| e.field == "annual_revenue"));

        assert_eq!(wizard.go_to(WizardStep::BusinessInfo).unwrap(), WizardStep::BusinessInfo);
    }

    #[test]
    fn test_save_draft_with_partial_data() {
        let mut wizard = ListingWizard::new(2024);
        wizard.data_mut().title = "Work in progress".into();
        let payload = wizard.submit(SubmitMode::SaveDraft).unwrap();
        assert!(!payload.publish);
        assert!(wizard.submit(SubmitMode::Publish).is_err());
    }
}
