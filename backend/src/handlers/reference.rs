//! Option lists for client dropdowns

use axum::Json;

use shared::{Industry, OptionItem, Region, RiskGrade};

pub async fn list_industries() -> Json<Vec<OptionItem>> {
    Json(Industry::options())
}

pub async fn list_regions() -> Json<Vec<OptionItem>> {
    Json(Region::options())
}

pub async fn list_risk_grades() -> Json<Vec<OptionItem>> {
    Json(RiskGrade::options())
}
