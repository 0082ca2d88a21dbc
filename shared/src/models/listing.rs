//! Business listing models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{OptionItem, ParseEnumError};

/// Free-form key metrics attached to a listing (employees, locations, ...)
pub type KeyMetrics = serde_json::Map<String, serde_json::Value>;

/// Industry sector of a business
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Manufacturing,
    Retail,
    FoodService,
    Technology,
    Agriculture,
    Construction,
    Healthcare,
    Education,
    Finance,
    Transportation,
}

impl Industry {
    pub const ALL: [Industry; 10] = [
        Industry::Manufacturing,
        Industry::Retail,
        Industry::FoodService,
        Industry::Technology,
        Industry::Agriculture,
        Industry::Construction,
        Industry::Healthcare,
        Industry::Education,
        Industry::Finance,
        Industry::Transportation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Manufacturing => "manufacturing",
            Industry::Retail => "retail",
            Industry::FoodService => "food_service",
            Industry::Technology => "technology",
            Industry::Agriculture => "agriculture",
            Industry::Construction => "construction",
            Industry::Healthcare => "healthcare",
            Industry::Education => "education",
            Industry::Finance => "finance",
            Industry::Transportation => "transportation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Industry::Manufacturing => "Manufacturing",
            Industry::Retail => "Retail",
            Industry::FoodService => "Food Service",
            Industry::Technology => "Technology",
            Industry::Agriculture => "Agriculture",
            Industry::Construction => "Construction",
            Industry::Healthcare => "Healthcare",
            Industry::Education => "Education",
            Industry::Finance => "Finance",
            Industry::Transportation => "Transportation",
        }
    }

    pub fn options() -> Vec<OptionItem> {
        Self::ALL
            .iter()
            .map(|i| OptionItem::new(i.as_str(), i.label()))
            .collect()
    }
}

impl FromStr for Industry {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("industry", s))
    }
}

/// Moldovan region where the business operates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Chisinau,
    Balti,
    Tiraspol,
    Cahul,
    Ungheni,
    Soroca,
    Orhei,
    Comrat,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::Chisinau,
        Region::Balti,
        Region::Tiraspol,
        Region::Cahul,
        Region::Ungheni,
        Region::Soroca,
        Region::Orhei,
        Region::Comrat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Chisinau => "chisinau",
            Region::Balti => "balti",
            Region::Tiraspol => "tiraspol",
            Region::Cahul => "cahul",
            Region::Ungheni => "ungheni",
            Region::Soroca => "soroca",
            Region::Orhei => "orhei",
            Region::Comrat => "comrat",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::Chisinau => "Chisinau",
            Region::Balti => "Balti",
            Region::Tiraspol => "Tiraspol",
            Region::Cahul => "Cahul",
            Region::Ungheni => "Ungheni",
            Region::Soroca => "Soroca",
            Region::Orhei => "Orhei",
            Region::Comrat => "Comrat",
        }
    }

    pub fn options() -> Vec<OptionItem> {
        Self::ALL
            .iter()
            .map(|r| OptionItem::new(r.as_str(), r.label()))
            .collect()
    }
}

impl FromStr for Region {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("region", s))
    }
}

/// Categorical creditworthiness label, A (lowest risk) to E (highest)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskGrade {
    A,
    B,
    C,
    D,
    E,
}

impl RiskGrade {
    pub const ALL: [RiskGrade; 5] = [
        RiskGrade::A,
        RiskGrade::B,
        RiskGrade::C,
        RiskGrade::D,
        RiskGrade::E,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskGrade::A => "A",
            RiskGrade::B => "B",
            RiskGrade::C => "C",
            RiskGrade::D => "D",
            RiskGrade::E => "E",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskGrade::A => "A - Low Risk",
            RiskGrade::B => "B - Medium-Low Risk",
            RiskGrade::C => "C - Medium Risk",
            RiskGrade::D => "D - Medium-High Risk",
            RiskGrade::E => "E - High Risk",
        }
    }

    pub fn options() -> Vec<OptionItem> {
        Self::ALL
            .iter()
            .map(|g| OptionItem::new(g.as_str(), g.label()))
            .collect()
    }
}

impl FromStr for RiskGrade {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError::new("risk grade", s))
    }
}

impl std::fmt::Display for RiskGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lifecycle status of a listing
///
/// Submission walks `Draft -> PendingEmailVerification -> PendingPayment -> Active`.
/// `Pending`, `Sold` and `Withdrawn` are owner-set states reachable from `Active`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    PendingEmailVerification,
    PendingPayment,
    Active,
    Pending,
    Sold,
    Withdrawn,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 7] = [
        ListingStatus::Draft,
        ListingStatus::PendingEmailVerification,
        ListingStatus::PendingPayment,
        ListingStatus::Active,
        ListingStatus::Pending,
        ListingStatus::Sold,
        ListingStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::PendingEmailVerification => "pending_email_verification",
            ListingStatus::PendingPayment => "pending_payment",
            ListingStatus::Active => "active",
            ListingStatus::Pending => "pending",
            ListingStatus::Sold => "sold",
            ListingStatus::Withdrawn => "withdrawn",
        }
    }

    /// Whether the workflow allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        use ListingStatus::*;
        matches!(
            (self, next),
            (Draft, PendingEmailVerification)
                | (Draft, PendingPayment)
                | (PendingEmailVerification, PendingPayment)
                | (PendingPayment, Active)
                | (Active, Pending)
                | (Active, Sold)
                | (Active, Withdrawn)
                | (Pending, Active)
                | (Pending, Sold)
                | (Pending, Withdrawn)
        )
    }

    /// Listing content may only be edited before it goes live or while live
    pub fn is_editable(&self) -> bool {
        !matches!(self, ListingStatus::Sold | ListingStatus::Withdrawn)
    }

    /// Visible to the public catalog
    pub fn is_public(&self) -> bool {
        matches!(self, ListingStatus::Active)
    }
}

impl FromStr for ListingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("listing status", s))
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One year of reported financials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialYear {
    pub year: i32,
    pub revenue: Decimal,
    pub profit_loss: Decimal,
    pub ebitda: Decimal,
    pub assets: Decimal,
    pub liabilities: Decimal,
    pub cash_flow: Decimal,
}

/// Number of yearly records a published listing must carry
pub const FINANCIAL_YEARS_REQUIRED: usize = 3;

/// Summary shown in catalog results; never carries seller contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCard {
    pub id: Uuid,
    pub title: String,
    pub industry: Industry,
    pub region: Region,
    pub annual_revenue: Decimal,
    pub ebitda: Decimal,
    pub asking_price: Decimal,
    pub risk_grade: RiskGrade,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub inquiries: i64,
    pub featured: bool,
}

/// Attached document reference (metadata only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Full listing as returned by the detail endpoint
///
/// Drafts only require a title, so classification and headline amounts may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub industry: Option<Industry>,
    pub region: Option<Region>,
    pub annual_revenue: Option<Decimal>,
    pub ebitda: Option<Decimal>,
    pub asking_price: Option<Decimal>,
    pub risk_grade: Option<RiskGrade>,
    pub status: ListingStatus,
    pub seller_id: Uuid,
    pub seller_name: String,
    /// Only present for the owner and for buyers with an active subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_email: Option<String>,
    pub reason_for_sale: String,
    pub growth_opportunities: String,
    pub financial_data: Vec<FinancialYear>,
    pub key_metrics: KeyMetrics,
    pub documents: Vec<DocumentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub views: i64,
    pub inquiries: i64,
    pub featured: bool,
}

/// Payload produced by the listing wizard and accepted by `POST /api/businesses`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CreateListingInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub industry: Option<Industry>,
    pub region: Option<Region>,
    pub annual_revenue: Option<Decimal>,
    pub ebitda: Option<Decimal>,
    pub asking_price: Option<Decimal>,
    pub risk_grade: Option<RiskGrade>,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub seller_email: String,
    #[serde(default)]
    pub reason_for_sale: String,
    #[serde(default)]
    pub growth_opportunities: String,
    #[serde(default)]
    pub financial_data: Vec<FinancialYear>,
    #[serde(default)]
    pub key_metrics: KeyMetrics,
    /// Submit immediately after saving instead of keeping a draft
    #[serde(default)]
    pub publish: bool,
}

impl From<&ListingDetail> for CreateListingInput {
    fn from(detail: &ListingDetail) -> Self {
        Self {
            title: detail.title.clone(),
            description: detail.description.clone(),
            industry: detail.industry,
            region: detail.region,
            annual_revenue: detail.annual_revenue,
            ebitda: detail.ebitda,
            asking_price: detail.asking_price,
            risk_grade: detail.risk_grade,
            seller_name: detail.seller_name.clone(),
            seller_email: detail.seller_email.clone().unwrap_or_default(),
            reason_for_sale: detail.reason_for_sale.clone(),
            growth_opportunities: detail.growth_opportunities.clone(),
            financial_data: detail.financial_data.clone(),
            key_metrics: detail.key_metrics.clone(),
            publish: false,
        }
    }
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub industry: Option<Industry>,
    pub region: Option<Region>,
    pub annual_revenue: Option<Decimal>,
    pub ebitda: Option<Decimal>,
    pub asking_price: Option<Decimal>,
    pub risk_grade: Option<RiskGrade>,
    pub seller_name: Option<String>,
    pub seller_email: Option<String>,
    pub reason_for_sale: Option<String>,
    pub growth_opportunities: Option<String>,
    pub financial_data: Option<Vec<FinancialYear>>,
    pub key_metrics: Option<KeyMetrics>,
    pub status: Option<ListingStatus>,
}

/// Outcome of submitting a listing for publication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub business_id: Uuid,
    pub status: ListingStatus,
    pub verification_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_str() {
        for industry in Industry::ALL {
            assert_eq!(industry.as_str().parse::<Industry>().unwrap(), industry);
        }
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().unwrap(), region);
        }
        for status in ListingStatus::ALL {
            assert_eq!(status.as_str().parse::<ListingStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_risk_grade_parse_is_case_insensitive() {
        assert_eq!("c".parse::<RiskGrade>().unwrap(), RiskGrade::C);
        assert!("F".parse::<RiskGrade>().is_err());
    }

    #[test]
    fn test_serde_names_match_as_str() {
        let json = serde_json::to_string(&Industry::FoodService).unwrap();
        assert_eq!(json, "\"food_service\"");
        let json = serde_json::to_string(&ListingStatus::PendingEmailVerification).unwrap();
        assert_eq!(json, "\"pending_email_verification\"");
        let json = serde_json::to_string(&RiskGrade::B).unwrap();
        assert_eq!(json, "\"B\"");
    }

    #[test]
    fn test_workflow_transitions() {
        use ListingStatus::*;
        assert!(Draft.can_transition_to(PendingEmailVerification));
        assert!(Draft.can_transition_to(PendingPayment));
        assert!(PendingEmailVerification.can_transition_to(PendingPayment));
        assert!(PendingPayment.can_transition_to(Active));
        assert!(!Draft.can_transition_to(Active));
        assert!(!PendingEmailVerification.can_transition_to(Active));
        assert!(!Sold.can_transition_to(Active));
    }

    #[test]
    fn test_option_labels() {
        let grades = RiskGrade::options();
        assert_eq!(grades.len(), 5);
        assert_eq!(grades[0].value, "A");
        assert_eq!(grades[0].label, "A - Low Risk");
        assert_eq!(Industry::options()[2].label, "Food Service");
    }

    #[test]
    fn test_seller_email_omitted_when_absent() {
        let detail = ListingDetail {
            id: Uuid::nil(),
            title: "Bakery".into(),
            description: String::new(),
            industry: Some(Industry::FoodService),
            region: Some(Region::Orhei),
            annual_revenue: Some(Decimal::from(100)),
            ebitda: Some(Decimal::from(10)),
            asking_price: Some(Decimal::from(200)),
            risk_grade: Some(RiskGrade::B),
            status: ListingStatus::Active,
            seller_id: Uuid::nil(),
            seller_name: "Ion".into(),
            seller_email: None,
            reason_for_sale: String::new(),
            growth_opportunities: String::new(),
            financial_data: vec![],
            key_metrics: KeyMetrics::new(),
            documents: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            views: 0,
            inquiries: 0,
            featured: false,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert!(value.get("seller_email").is_none());
    }
}
