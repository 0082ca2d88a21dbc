//! Sample catalog for development databases

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{FinancialYear, Industry, KeyMetrics, ListingStatus, Region, RiskGrade, UserRole};

/// (year, revenue, profit_loss, ebitda, assets, liabilities, cash_flow)
type YearFigures = (i32, i64, i64, i64, i64, i64, i64);

struct SampleListing {
    title: &'static str,
    description: &'static str,
    industry: Industry,
    region: Region,
    annual_revenue: i64,
    ebitda: i64,
    asking_price: i64,
    risk_grade: RiskGrade,
    seller_name: &'static str,
    seller_email: &'static str,
    reason_for_sale: &'static str,
    growth_opportunities: &'static str,
    years: [YearFigures; 3],
    views: i64,
    inquiries: i64,
    featured: bool,
}

impl SampleListing {
    fn financial_data(&self) -> Vec<FinancialYear> {
        self.years
            .iter()
            .map(|&(year, revenue, profit_loss, ebitda, assets, liabilities, cash_flow)| {
                FinancialYear {
                    year,
                    revenue: Decimal::from(revenue),
                    profit_loss: Decimal::from(profit_loss),
                    ebitda: Decimal::from(ebitda),
                    assets: Decimal::from(assets),
                    liabilities: Decimal::from(liabilities),
                    cash_flow: Decimal::from(cash_flow),
                }
            })
            .collect()
    }
}

const SAMPLES: [SampleListing; 5] = [
    SampleListing {
        title: "Moldovan Wine Production Company",
        description: "Established wine production facility with 50 hectares of vineyards and \
                      modern processing equipment. Export relationships with EU markets.",
        industry: Industry::Manufacturing,
        region: Region::Chisinau,
        annual_revenue: 2_500_000,
        ebitda: 450_000,
        asking_price: 3_500_000,
        risk_grade: RiskGrade::B,
        seller_name: "Alexandru Popescu",
        seller_email: "a.popescu@example.com",
        reason_for_sale: "Owner retiring after 25 years",
        growth_opportunities: "Expand EU distribution, add organic wine line, develop wine tourism",
        years: [
            (2023, 2_500_000, 380_000, 450_000, 4_200_000, 1_800_000, 420_000),
            (2022, 2_300_000, 350_000, 420_000, 4_000_000, 1_900_000, 400_000),
            (2021, 2_100_000, 320_000, 380_000, 3_800_000, 2_000_000, 360_000),
        ],
        views: 145,
        inquiries: 8,
        featured: true,
    },
    SampleListing {
        title: "Retail Chain - 5 Locations",
        description: "Profitable retail chain with 5 locations across Moldova. Specializes in \
                      electronics and household goods with strong customer base.",
        industry: Industry::Retail,
        region: Region::Balti,
        annual_revenue: 1_800_000,
        ebitda: 270_000,
        asking_price: 2_200_000,
        risk_grade: RiskGrade::C,
        seller_name: "Maria Ionescu",
        seller_email: "m.ionescu@example.com",
        reason_for_sale: "Relocating to another country",
        growth_opportunities: "E-commerce expansion, add 2-3 new locations, develop private label products",
        years: [
            (2023, 1_800_000, 220_000, 270_000, 2_500_000, 1_200_000, 250_000),
            (2022, 1_650_000, 200_000, 240_000, 2_300_000, 1_300_000, 220_000),
            (2021, 1_500_000, 180_000, 210_000, 2_100_000, 1_400_000, 190_000),
        ],
        views: 89,
        inquiries: 5,
        featured: false,
    },
    SampleListing {
        title: "Restaurant Chain - Traditional Moldovan Cuisine",
        description: "Well-established restaurant chain with 3 locations serving traditional \
                      Moldovan cuisine. Strong brand recognition and loyal customer base.",
        industry: Industry::FoodService,
        region: Region::Chisinau,
        annual_revenue: 950_000,
        ebitda: 142_500,
        asking_price: 1_400_000,
        risk_grade: RiskGrade::B,
        seller_name: "Vasile Moldovan",
        seller_email: "v.moldovan@example.com",
        reason_for_sale: "Focus on other business ventures",
        growth_opportunities: "Franchise model, catering services, food delivery expansion",
        years: [
            (2023, 950_000, 115_000, 142_500, 1_600_000, 800_000, 130_000),
            (2022, 880_000, 105_000, 130_000, 1_500_000, 850_000, 120_000),
            (2021, 820_000, 95_000, 115_000, 1_400_000, 900_000, 105_000),
        ],
        views: 67,
        inquiries: 3,
        featured: true,
    },
    SampleListing {
        title: "IT Services & Software Development",
        description: "Growing technology company providing software development and IT services \
                      to local and international clients. Strong portfolio of recurring contracts.",
        industry: Industry::Technology,
        region: Region::Chisinau,
        annual_revenue: 750_000,
        ebitda: 225_000,
        asking_price: 1_200_000,
        risk_grade: RiskGrade::A,
        seller_name: "Dmitri Volkov",
        seller_email: "d.volkov@example.com",
        reason_for_sale: "Founder wants to start new venture",
        growth_opportunities: "Scale international client base, develop SaaS products, expand team",
        years: [
            (2023, 750_000, 190_000, 225_000, 850_000, 350_000, 210_000),
            (2022, 650_000, 165_000, 195_000, 750_000, 400_000, 180_000),
            (2021, 520_000, 130_000, 155_000, 650_000, 450_000, 140_000),
        ],
        views: 123,
        inquiries: 12,
        featured: false,
    },
    SampleListing {
        title: "Agricultural Processing Facility",
        description: "Modern grain processing facility with storage capacity and distribution \
                      network. Serves local farmers and food manufacturers.",
        industry: Industry::Agriculture,
        region: Region::Cahul,
        annual_revenue: 3_200_000,
        ebitda: 480_000,
        asking_price: 4_500_000,
        risk_grade: RiskGrade::C,
        seller_name: "Gheorghe Mihai",
        seller_email: "g.mihai@example.com",
        reason_for_sale: "Consolidating business operations",
        growth_opportunities: "Organic certification, direct farmer contracts, export expansion",
        years: [
            (2023, 3_200_000, 384_000, 480_000, 5_500_000, 2_800_000, 450_000),
            (2022, 2_950_000, 354_000, 440_000, 5_200_000, 2_900_000, 420_000),
            (2021, 2_700_000, 320_000, 400_000, 4_900_000, 3_000_000, 380_000),
        ],
        views: 78,
        inquiries: 4,
        featured: false,
    },
];

fn key_metrics(index: usize) -> KeyMetrics {
    let value = match index {
        0 => json!({
            "employees": 45,
            "years_in_business": 25,
            "export_percentage": 60,
            "production_capacity": "500,000 bottles/year"
        }),
        1 => json!({
            "employees": 28,
            "years_in_business": 12,
            "locations": 5,
            "avg_daily_customers": 450
        }),
        2 => json!({
            "employees": 45,
            "years_in_business": 15,
            "locations": 3,
            "avg_daily_covers": 200
        }),
        3 => json!({
            "employees": 18,
            "years_in_business": 8,
            "recurring_revenue_percentage": 75,
            "international_clients": 12
        }),
        _ => json!({
            "employees": 32,
            "years_in_business": 20,
            "storage_capacity": "5,000 tons",
            "processing_capacity": "200 tons/day"
        }),
    };
    match value {
        serde_json::Value::Object(map) => map,
        _ => KeyMetrics::new(),
    }
}

/// Insert the sample sellers and their active listings into an empty catalog
///
/// Returns the number of listings inserted (zero when any listing exists).
pub async fn seed_sample_listings(db: &PgPool) -> AppResult<u64> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses")
        .fetch_one(db)
        .await?;
    if existing > 0 {
        tracing::debug!(existing, "Catalog not empty, skipping sample data");
        return Ok(0);
    }

    let mut tx = db.begin().await?;
    let mut inserted = 0;

    for (index, sample) in SAMPLES.iter().enumerate() {
        // Sample sellers cannot sign in: the hashed password is discarded
        let password_hash = bcrypt::hash(Uuid::new_v4().to_string(), 4)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let seller_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, email_verified)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sample.seller_email)
        .bind(&password_hash)
        .bind(sample.seller_name)
        .bind(UserRole::Seller.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, seller_id, title, description, industry, region, annual_revenue, ebitda,
                asking_price, risk_grade, seller_name, seller_email, reason_for_sale,
                growth_opportunities, financial_data, key_metrics, status, views, inquiries,
                featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(sample.title)
        .bind(sample.description)
        .bind(sample.industry.as_str())
        .bind(sample.region.as_str())
        .bind(Decimal::from(sample.annual_revenue))
        .bind(Decimal::from(sample.ebitda))
        .bind(Decimal::from(sample.asking_price))
        .bind(sample.risk_grade.as_str())
        .bind(sample.seller_name)
        .bind(sample.seller_email)
        .bind(sample.reason_for_sale)
        .bind(sample.growth_opportunities)
        .bind(Json(sample.financial_data()))
        .bind(Json(key_metrics(index)))
        .bind(ListingStatus::Active.as_str())
        .bind(sample.views)
        .bind(sample.inquiries)
        .bind(sample.featured)
        .execute(&mut *tx)
        .await?;

        inserted += 1;
    }

    tx.commit().await?;
    tracing::info!(inserted, "Sample listings seeded");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{validate_listing_for_publish, CreateListingInput};

    #[test]
    fn test_samples_are_publishable() {
        for (index, sample) in SAMPLES.iter().enumerate() {
            let input = CreateListingInput {
                title: sample.title.into(),
                description: sample.description.into(),
                industry: Some(sample.industry),
                region: Some(sample.region),
                annual_revenue: Some(Decimal::from(sample.annual_revenue)),
                ebitda: Some(Decimal::from(sample.ebitda)),
                asking_price: Some(Decimal::from(sample.asking_price)),
                risk_grade: Some(sample.risk_grade),
                seller_name: sample.seller_name.into(),
                seller_email: sample.seller_email.into(),
                reason_for_sale: sample.reason_for_sale.into(),
                growth_opportunities: sample.growth_opportunities.into(),
                financial_data: sample.financial_data(),
                key_metrics: key_metrics(index),
                publish: true,
            };
            let errors = validate_listing_for_publish(&input, 2024);
            assert!(errors.is_empty(), "{}: {:?}", sample.title, errors);
        }
    }

    #[test]
    fn test_two_samples_are_featured() {
        assert_eq!(SAMPLES.iter().filter(|s| s.featured).count(), 2);
    }
}
