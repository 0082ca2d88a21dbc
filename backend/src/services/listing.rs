//! Listing service: catalog search, detail views, and the seller workflow

use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::auth::fetch_user;
use crate::services::document::document_refs_for;
use shared::{
    validate_listing_draft, validate_listing_for_publish, CreateListingInput, DocumentRef,
    FinancialYear, Industry, KeyMetrics, ListingCard, ListingDetail, ListingFilter,
    ListingStatus, PaginatedResponse, PaginationMeta, ParseEnumError, Region, RiskGrade,
    SubmissionResult, UpdateListingInput, UserRole,
};

const CARD_COLUMNS: &str = "id, title, industry, region, annual_revenue, ebitda, asking_price, \
     risk_grade, status, created_at, views, inquiries, featured";

const DETAIL_COLUMNS: &str = "id, seller_id, title, description, industry, region, \
     annual_revenue, ebitda, asking_price, risk_grade, seller_name, seller_email, \
     reason_for_sale, growth_opportunities, financial_data, key_metrics, status, views, \
     inquiries, featured, created_at, updated_at";

/// Listing service
#[derive(Clone)]
pub struct ListingService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct CardRow {
    id: Uuid,
    title: String,
    industry: Option<String>,
    region: Option<String>,
    annual_revenue: Option<Decimal>,
    ebitda: Option<Decimal>,
    asking_price: Option<Decimal>,
    risk_grade: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    views: i64,
    inquiries: i64,
    featured: bool,
}

/// Full `businesses` row
#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub industry: Option<String>,
    pub region: Option<String>,
    pub annual_revenue: Option<Decimal>,
    pub ebitda: Option<Decimal>,
    pub asking_price: Option<Decimal>,
    pub risk_grade: Option<String>,
    pub seller_name: String,
    pub seller_email: String,
    pub reason_for_sale: String,
    pub growth_opportunities: String,
    pub financial_data: Json<Vec<FinancialYear>>,
    pub key_metrics: Json<KeyMetrics>,
    pub status: String,
    pub views: i64,
    pub inquiries: i64,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_column<T>(value: Option<String>) -> AppResult<Option<T>>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn parse_status(value: &str) -> AppResult<ListingStatus> {
    value
        .parse::<ListingStatus>()
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn required<T>(value: Option<T>, column: &str, id: Uuid) -> AppResult<T> {
    value.ok_or_else(|| AppError::Internal(format!("active listing {} has no {}", id, column)))
}

impl CardRow {
    fn into_card(self) -> AppResult<ListingCard> {
        let id = self.id;
        Ok(ListingCard {
            id,
            title: self.title,
            industry: required(parse_column::<Industry>(self.industry)?, "industry", id)?,
            region: required(parse_column::<Region>(self.region)?, "region", id)?,
            annual_revenue: required(self.annual_revenue, "annual_revenue", id)?,
            ebitda: required(self.ebitda, "ebitda", id)?,
            asking_price: required(self.asking_price, "asking_price", id)?,
            risk_grade: required(parse_column::<RiskGrade>(self.risk_grade)?, "risk_grade", id)?,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            views: self.views,
            inquiries: self.inquiries,
            featured: self.featured,
        })
    }
}

impl ListingRow {
    pub fn status(&self) -> AppResult<ListingStatus> {
        parse_status(&self.status)
    }

    /// Detail view; the seller email is dropped unless `reveal_contact`
    pub fn into_detail(
        self,
        documents: Vec<DocumentRef>,
        reveal_contact: bool,
    ) -> AppResult<ListingDetail> {
        Ok(ListingDetail {
            id: self.id,
            title: self.title,
            description: self.description,
            industry: parse_column(self.industry)?,
            region: parse_column(self.region)?,
            annual_revenue: self.annual_revenue,
            ebitda: self.ebitda,
            asking_price: self.asking_price,
            risk_grade: parse_column(self.risk_grade)?,
            status: parse_status(&self.status)?,
            seller_id: self.seller_id,
            seller_name: self.seller_name,
            seller_email: reveal_contact.then_some(self.seller_email),
            reason_for_sale: self.reason_for_sale,
            growth_opportunities: self.growth_opportunities,
            financial_data: self.financial_data.0,
            key_metrics: self.key_metrics.0,
            documents,
            created_at: self.created_at,
            updated_at: self.updated_at,
            views: self.views,
            inquiries: self.inquiries,
            featured: self.featured,
        })
    }
}

// ============================================================================
// Access rules
// ============================================================================

/// Whether `viewer` may see the seller's contact details and documents
///
/// The owner always may; buyers need an active subscription; anonymous
/// callers and other sellers never may.
pub fn can_view_seller_contact(
    viewer: Option<&AuthUser>,
    seller_id: Uuid,
    viewer_subscribed: bool,
) -> bool {
    match viewer {
        Some(v) if v.user_id == seller_id => true,
        Some(v) => v.role == UserRole::Buyer && viewer_subscribed,
        None => false,
    }
}

/// Whether a listing in `status` is visible to `viewer` at all
pub fn is_listing_visible(viewer: Option<&AuthUser>, seller_id: Uuid, status: ListingStatus) -> bool {
    status.is_public() || viewer.is_some_and(|v| v.user_id == seller_id)
}

/// Live subscription check for buyers; always false for everyone else
pub async fn viewer_subscribed(db: &PgPool, viewer: Option<&AuthUser>) -> AppResult<bool> {
    match viewer {
        Some(v) if v.role == UserRole::Buyer => {
            let user = fetch_user(db, v.user_id).await?;
            Ok(user.has_active_subscription(Utc::now()))
        }
        _ => Ok(false),
    }
}

pub fn ensure_owner(user: &AuthUser, seller_id: Uuid) -> AppResult<()> {
    if user.user_id == seller_id {
        Ok(())
    } else {
        Err(AppError::NotOwner)
    }
}

// ============================================================================
// Catalog query building
// ============================================================================

/// Append the catalog `WHERE` clause: active listings narrowed by `filter`
pub fn push_catalog_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &ListingFilter) {
    qb.push(" WHERE status = ")
        .push_bind(ListingStatus::Active.as_str());

    if let Some(industry) = filter.industry {
        qb.push(" AND industry = ").push_bind(industry.as_str());
    }
    if let Some(region) = filter.region {
        qb.push(" AND region = ").push_bind(region.as_str());
    }
    if let Some(grade) = filter.risk_grade {
        qb.push(" AND risk_grade = ").push_bind(grade.as_str());
    }
    if let Some(min) = filter.min_revenue {
        qb.push(" AND annual_revenue >= ").push_bind(min);
    }
    if let Some(max) = filter.max_revenue {
        qb.push(" AND annual_revenue <= ").push_bind(max);
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND asking_price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND asking_price <= ").push_bind(max);
    }
}

/// `ORDER BY` for the catalog; `id` breaks ties so pages are stable
pub fn catalog_order_by(filter: &ListingFilter) -> String {
    let mut clause = String::from(" ORDER BY ");
    if filter.featured_first() {
        clause.push_str("featured DESC, ");
    }
    clause.push_str(filter.sort_key().as_str());
    clause.push(' ');
    clause.push_str(filter.sort_direction().as_sql());
    clause.push_str(", id ASC");
    clause
}

// ============================================================================
// Update rules
// ============================================================================

/// Merge a partial update into the current listing content
pub fn apply_update(base: &mut CreateListingInput, update: UpdateListingInput) {
    if let Some(v) = update.title {
        base.title = v;
    }
    if let Some(v) = update.description {
        base.description = v;
    }
    if update.industry.is_some() {
        base.industry = update.industry;
    }
    if update.region.is_some() {
        base.region = update.region;
    }
    if update.annual_revenue.is_some() {
        base.annual_revenue = update.annual_revenue;
    }
    if update.ebitda.is_some() {
        base.ebitda = update.ebitda;
    }
    if update.asking_price.is_some() {
        base.asking_price = update.asking_price;
    }
    if update.risk_grade.is_some() {
        base.risk_grade = update.risk_grade;
    }
    if let Some(v) = update.seller_name {
        base.seller_name = v;
    }
    if let Some(v) = update.seller_email {
        base.seller_email = v;
    }
    if let Some(v) = update.reason_for_sale {
        base.reason_for_sale = v;
    }
    if let Some(v) = update.growth_opportunities {
        base.growth_opportunities = v;
    }
    if let Some(v) = update.financial_data {
        base.financial_data = v;
    }
    if let Some(v) = update.key_metrics {
        base.key_metrics = v;
    }
}

/// Status an owner may set through an update; workflow steps have their own endpoints
pub fn check_owner_status_change(
    current: ListingStatus,
    requested: ListingStatus,
) -> AppResult<ListingStatus> {
    if requested == current {
        return Ok(current);
    }
    let owner_managed = matches!(current, ListingStatus::Active | ListingStatus::Pending);
    if owner_managed && current.can_transition_to(requested) {
        Ok(requested)
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "Cannot change listing status from {} to {}",
            current, requested
        )))
    }
}

fn validate_content(input: &CreateListingInput, status: ListingStatus) -> AppResult<()> {
    let year = Utc::now().year();
    let errors = if status == ListingStatus::Draft {
        validate_listing_draft(input, year)
    } else {
        validate_listing_for_publish(input, year)
    };
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidFields(errors))
    }
}

impl ListingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Public catalog page
    pub async fn search(&self, filter: &ListingFilter) -> AppResult<PaginatedResponse<ListingCard>> {
        filter.validate()?;
        let pagination = filter.pagination();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM businesses");
        push_catalog_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM businesses",
            CARD_COLUMNS
        ));
        push_catalog_filters(&mut query, filter);
        query.push(catalog_order_by(filter));
        query
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<CardRow> = query.build_query_as().fetch_all(&self.db).await?;
        let data = rows
            .into_iter()
            .map(CardRow::into_card)
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!(
            filters = filter.active_filter_count(),
            total,
            returned = data.len(),
            "Catalog search"
        );

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, u64::try_from(total).unwrap_or(0)),
        })
    }

    /// Detail view for any caller; counts the view
    ///
    /// Listings that are not active look missing to everyone but their owner.
    pub async fn view(&self, id: Uuid, viewer: Option<&AuthUser>) -> AppResult<ListingDetail> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE businesses SET views = views + 1
            WHERE id = $1 AND (status = $2 OR seller_id = $3)
            RETURNING {}
            "#,
            DETAIL_COLUMNS
        ))
        .bind(id)
        .bind(ListingStatus::Active.as_str())
        .bind(viewer.map(|v| v.user_id))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Business".to_string()))?;

        let subscribed = viewer_subscribed(&self.db, viewer).await?;
        let reveal = can_view_seller_contact(viewer, row.seller_id, subscribed);
        let documents = document_refs_for(&self.db, &[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        row.into_detail(documents, reveal)
    }

    /// Every listing owned by `user`, newest first
    pub async fn list_mine(&self, user: &AuthUser) -> AppResult<Vec<ListingDetail>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM businesses WHERE seller_id = $1 ORDER BY updated_at DESC, id",
            DETAIL_COLUMNS
        ))
        .bind(user.user_id)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut documents = document_refs_for(&self.db, &ids).await?;

        rows.into_iter()
            .map(|row| {
                let docs = documents.remove(&row.id).unwrap_or_default();
                row.into_detail(docs, true)
            })
            .collect()
    }

    /// Create a draft; with `publish` set it is submitted straight away
    pub async fn create(
        &self,
        user: &AuthUser,
        mut input: CreateListingInput,
    ) -> AppResult<(ListingDetail, Option<SubmissionResult>)> {
        user.require_role(UserRole::Seller)?;

        let account = fetch_user(&self.db, user.user_id).await?;
        if input.seller_email.trim().is_empty() {
            input.seller_email = account.email.clone();
        }
        if input.seller_name.trim().is_empty() {
            input.seller_name = account.name.clone();
        }
        let publish = input.publish;
        validate_content(
            &input,
            if publish {
                ListingStatus::PendingPayment
            } else {
                ListingStatus::Draft
            },
        )?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, seller_id, title, description, industry, region, annual_revenue, ebitda,
                asking_price, risk_grade, seller_name, seller_email, reason_for_sale,
                growth_opportunities, financial_data, key_metrics, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(id)
        .bind(user.user_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.industry.map(|i| i.as_str()))
        .bind(input.region.map(|r| r.as_str()))
        .bind(input.annual_revenue)
        .bind(input.ebitda)
        .bind(input.asking_price)
        .bind(input.risk_grade.map(|g| g.as_str()))
        .bind(&input.seller_name)
        .bind(input.seller_email.trim())
        .bind(&input.reason_for_sale)
        .bind(&input.growth_opportunities)
        .bind(Json(&input.financial_data))
        .bind(Json(&input.key_metrics))
        .bind(ListingStatus::Draft.as_str())
        .execute(&self.db)
        .await?;

        tracing::info!(business_id = %id, seller_id = %user.user_id, "Listing created");

        let submission = if publish {
            Some(self.submit(user, id).await?)
        } else {
            None
        };

        let detail = self.get_owned(user, id).await?;
        Ok((detail, submission))
    }

    /// Owner view without counting a page view
    pub async fn get_owned(&self, user: &AuthUser, id: Uuid) -> AppResult<ListingDetail> {
        let row = self.fetch_row(id).await?;
        ensure_owner(user, row.seller_id)?;
        let documents = document_refs_for(&self.db, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        row.into_detail(documents, true)
    }

    /// Partial update by the owner
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        update: UpdateListingInput,
    ) -> AppResult<ListingDetail> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM businesses WHERE id = $1 FOR UPDATE",
            DETAIL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Business".to_string()))?;

        ensure_owner(user, row.seller_id)?;
        let current = row.status()?;
        if !current.is_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "A {} listing can no longer be edited",
                current
            )));
        }

        let requested = update.status;
        let detail = row.into_detail(Vec::new(), true)?;
        let mut content = CreateListingInput::from(&detail);
        apply_update(&mut content, update);

        let next = match requested {
            Some(status) => check_owner_status_change(current, status)?,
            None => current,
        };
        validate_content(&content, next)?;

        sqlx::query(
            r#"
            UPDATE businesses SET
                title = $2, description = $3, industry = $4, region = $5,
                annual_revenue = $6, ebitda = $7, asking_price = $8, risk_grade = $9,
                seller_name = $10, seller_email = $11, reason_for_sale = $12,
                growth_opportunities = $13, financial_data = $14, key_metrics = $15,
                status = $16, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(content.title.trim())
        .bind(&content.description)
        .bind(content.industry.map(|i| i.as_str()))
        .bind(content.region.map(|r| r.as_str()))
        .bind(content.annual_revenue)
        .bind(content.ebitda)
        .bind(content.asking_price)
        .bind(content.risk_grade.map(|g| g.as_str()))
        .bind(&content.seller_name)
        .bind(content.seller_email.trim())
        .bind(&content.reason_for_sale)
        .bind(&content.growth_opportunities)
        .bind(Json(&content.financial_data))
        .bind(Json(&content.key_metrics))
        .bind(next.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if next != current {
            tracing::info!(business_id = %id, from = %current, to = %next, "Listing status changed");
        }

        self.get_owned(user, id).await
    }

    /// Delete a draft owned by `user`
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> AppResult<()> {
        let row = self.fetch_row(id).await?;
        ensure_owner(user, row.seller_id)?;
        let status = row.status()?;
        if status != ListingStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Only drafts can be deleted (current status: {})",
                status
            )));
        }

        sqlx::query("DELETE FROM businesses WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(ListingStatus::Draft.as_str())
            .execute(&self.db)
            .await?;

        tracing::info!(business_id = %id, "Draft listing deleted");
        Ok(())
    }

    /// Move a complete draft into the publication workflow
    pub async fn submit(&self, user: &AuthUser, id: Uuid) -> AppResult<SubmissionResult> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM businesses WHERE id = $1 FOR UPDATE",
            DETAIL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Business".to_string()))?;

        ensure_owner(user, row.seller_id)?;
        let current = row.status()?;
        if current != ListingStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Only drafts can be submitted (current status: {})",
                current
            )));
        }

        let detail = row.into_detail(Vec::new(), true)?;
        validate_content(&CreateListingInput::from(&detail), ListingStatus::PendingPayment)?;

        let email_verified =
            sqlx::query_scalar::<_, bool>("SELECT email_verified FROM users WHERE id = $1")
                .bind(user.user_id)
                .fetch_one(&mut *tx)
                .await?;
        let next = if email_verified {
            ListingStatus::PendingPayment
        } else {
            ListingStatus::PendingEmailVerification
        };

        sqlx::query("UPDATE businesses SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(business_id = %id, status = %next, "Listing submitted");

        Ok(SubmissionResult {
            business_id: id,
            status: next,
            verification_required: !email_verified,
        })
    }

    async fn fetch_row(&self, id: Uuid) -> AppResult<ListingRow> {
        sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM businesses WHERE id = $1",
            DETAIL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Business".to_string()))
    }
}
