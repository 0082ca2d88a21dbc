//! Catalog filter shared by the browser (query-string composition) and the
//! server (query deserialization and validation).

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Industry, Region, RiskGrade};
use crate::types::{Pagination, ParseEnumError};

/// Column a catalog query can be ordered by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    AnnualRevenue,
    AskingPrice,
    Ebitda,
    Views,
    Title,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::CreatedAt,
        SortKey::AnnualRevenue,
        SortKey::AskingPrice,
        SortKey::Ebitda,
        SortKey::Views,
        SortKey::Title,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::AnnualRevenue => "annual_revenue",
            SortKey::AskingPrice => "asking_price",
            SortKey::Ebitda => "ebitda",
            SortKey::Views => "views",
            SortKey::Title => "title",
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("sort key", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ParseEnumError::new("sort order", other)),
        }
    }
}

/// Rejected filter input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },

    #[error("{min_field} cannot exceed {max_field}")]
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
    },

    #[error("invalid catalog query: {0}")]
    Malformed(String),
}

impl FilterError {
    pub fn field(&self) -> &str {
        match self {
            FilterError::Negative { field } => field,
            FilterError::InvertedRange { min_field, .. } => min_field,
            FilterError::Malformed(_) => "query",
        }
    }
}

/// Catalog filter; every field is optional
///
/// Deserializes from a URL query (`serde_urlencoded`, axum's `Query`) as well
/// as from JSON. Blank values such as `industry=` read as unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListingFilter {
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(default, deserialize_with = "amount", skip_serializing_if = "Option::is_none")]
    pub min_revenue: Option<Decimal>,
    #[serde(default, deserialize_with = "amount", skip_serializing_if = "Option::is_none")]
    pub max_revenue: Option<Decimal>,
    #[serde(default, deserialize_with = "amount", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "amount", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub risk_grade: Option<RiskGrade>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortKey>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub featured_first: Option<bool>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "param", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

// ============================================================================
// Query parameter decoding
// ============================================================================

/// Accepts a parameter as text (query strings) or as a native JSON scalar,
/// and parses it with `parse`; blank text and `null` are `None`
struct ParamVisitor<T> {
    parse: fn(&str) -> Result<T, String>,
}

impl<'de, T> Visitor<'de> for ParamVisitor<T> {
    type Value = Option<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a filter value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let v = v.trim();
        if v.is_empty() {
            return Ok(None);
        }
        (self.parse)(v).map(Some).map_err(E::custom)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, de: D) -> Result<Self::Value, D::Error> {
        de.deserialize_any(self)
    }
}

fn parse_with_from_str<T>(v: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    v.parse::<T>().map_err(|e| e.to_string())
}

/// Plain or scientific notation (`2500000`, `2.5e6`)
fn parse_amount(v: &str) -> Result<Decimal, String> {
    Decimal::from_str(v)
        .or_else(|_| Decimal::from_scientific(v))
        .map_err(|_| format!("invalid amount '{}'", v))
}

fn param<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    de.deserialize_any(ParamVisitor {
        parse: parse_with_from_str::<T>,
    })
}

fn amount<'de, D>(de: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    de.deserialize_any(ParamVisitor { parse: parse_amount })
}

impl ListingFilter {
    pub fn sort_key(&self) -> SortKey {
        self.sort_by.unwrap_or_default()
    }

    pub fn sort_direction(&self) -> SortOrder {
        self.sort_order.unwrap_or_default()
    }

    /// Featured listings float to the top unless explicitly disabled
    pub fn featured_first(&self) -> bool {
        self.featured_first.unwrap_or(true)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }

    /// Number of narrowing predicates set (sorting and paging excluded)
    pub fn active_filter_count(&self) -> usize {
        [
            self.industry.is_some(),
            self.region.is_some(),
            self.min_revenue.is_some(),
            self.max_revenue.is_some(),
            self.min_price.is_some(),
            self.max_price.is_some(),
            self.risk_grade.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        let bounds = [
            ("min_revenue", self.min_revenue),
            ("max_revenue", self.max_revenue),
            ("min_price", self.min_price),
            ("max_price", self.max_price),
        ];
        for (field, value) in bounds {
            if matches!(value, Some(v) if v.is_sign_negative() && !v.is_zero()) {
                return Err(FilterError::Negative { field });
            }
        }

        if let (Some(min), Some(max)) = (self.min_revenue, self.max_revenue) {
            if min > max {
                return Err(FilterError::InvertedRange {
                    min_field: "min_revenue",
                    max_field: "max_revenue",
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(FilterError::InvertedRange {
                    min_field: "min_price",
                    max_field: "max_price",
                });
            }
        }
        Ok(())
    }

    /// Render as a URL query string (without the leading `?`).
    ///
    /// Unset fields are omitted so an empty filter renders as an empty string.
    pub fn to_query_string(&self) -> String {
        let normalized = ListingFilter {
            min_revenue: self.min_revenue.map(|v| v.normalize()),
            max_revenue: self.max_revenue.map(|v| v.normalize()),
            min_price: self.min_price.map(|v| v.normalize()),
            max_price: self.max_price.map(|v| v.normalize()),
            ..self.clone()
        };
        // Every field is a scalar, which the encoder always accepts
        serde_urlencoded::to_string(&normalized).unwrap_or_default()
    }

    /// Parse a URL query string; a leading `?` is accepted.
    ///
    /// Values are percent-decoded (`+` reads as a space), unknown keys are
    /// ignored and blank values read as unset.
    pub fn from_query_string(query: &str) -> Result<Self, FilterError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        serde_urlencoded::from_str(query).map_err(|e| FilterError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_renders_empty_query() {
        assert_eq!(ListingFilter::default().to_query_string(), "");
        assert!(ListingFilter::default().featured_first());
        assert_eq!(ListingFilter::default().sort_key(), SortKey::CreatedAt);
        assert_eq!(ListingFilter::default().sort_direction(), SortOrder::Desc);
    }

    #[test]
    fn test_query_string_contents() {
        let filter = ListingFilter {
            industry: Some(Industry::Retail),
            risk_grade: Some(RiskGrade::B),
            min_revenue: Some(Decimal::new(150_000_00, 2)),
            sort_by: Some(SortKey::AskingPrice),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        assert_eq!(
            filter.to_query_string(),
            "industry=retail&min_revenue=150000&risk_grade=B&sort_by=asking_price&sort_order=asc"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let filter = ListingFilter {
            region: Some(Region::Chisinau),
            max_price: Some(Decimal::from(2_000_000)),
            featured_first: Some(false),
            page: Some(2),
            per_page: Some(10),
            ..Default::default()
        };
        let parsed = ListingFilter::from_query_string(&filter.to_query_string()).unwrap();
        assert_eq!(parsed, filter);
    }

    #[test]
    fn test_parse_ignores_unknown_and_empty() {
        let parsed = ListingFilter::from_query_string("?foo=bar&industry=&region=balti").unwrap();
        assert_eq!(parsed.region, Some(Region::Balti));
        assert_eq!(parsed.industry, None);
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let err = ListingFilter::from_query_string("risk_grade=Z").unwrap_err();
        assert_eq!(err.field(), "query");
        assert!(err.to_string().contains("'Z'"));
    }

    #[test]
    fn test_parse_decodes_percent_encoding() {
        let parsed =
            ListingFilter::from_query_string("industry=food%5Fservice&max_revenue=2%2E5e6")
                .unwrap();
        assert_eq!(parsed.industry, Some(Industry::FoodService));
        assert_eq!(parsed.max_revenue, Some(Decimal::from(2_500_000)));

        let parsed = ListingFilter::from_query_string("region=+balti+&page=%32").unwrap();
        assert_eq!(parsed.region, Some(Region::Balti));
        assert_eq!(parsed.page, Some(2));
    }

    #[test]
    fn test_deserializes_from_json() {
        let filter: ListingFilter = serde_json::from_str(
            r#"{"industry":"retail","min_price":1000,"featured_first":false,"page":3,"region":null,"risk_grade":""}"#,
        )
        .unwrap();
        assert_eq!(filter.industry, Some(Industry::Retail));
        assert_eq!(filter.min_price, Some(Decimal::from(1000)));
        assert_eq!(filter.featured_first, Some(false));
        assert_eq!(filter.page, Some(3));
        assert_eq!(filter.region, None);
        assert_eq!(filter.risk_grade, None);
    }

    #[test]
    fn test_validate_ranges() {
        let inverted = ListingFilter {
            min_revenue: Some(Decimal::from(10)),
            max_revenue: Some(Decimal::from(5)),
            ..Default::default()
        };
        assert_eq!(
            inverted.validate(),
            Err(FilterError::InvertedRange {
                min_field: "min_revenue",
                max_field: "max_revenue"
            })
        );

        let negative = ListingFilter {
            min_price: Some(Decimal::from(-1)),
            ..Default::default()
        };
        assert_eq!(
            negative.validate(),
            Err(FilterError::Negative { field: "min_price" })
        );

        let equal = ListingFilter {
            min_price: Some(Decimal::from(5)),
            max_price: Some(Decimal::from(5)),
            ..Default::default()
        };
        assert!(equal.validate().is_ok());
    }

    #[test]
    fn test_active_filter_count() {
        let filter = ListingFilter {
            industry: Some(Industry::Finance),
            max_revenue: Some(Decimal::from(1)),
            sort_by: Some(SortKey::Views),
            ..Default::default()
        };
        assert_eq!(filter.active_filter_count(), 2);
    }
}
