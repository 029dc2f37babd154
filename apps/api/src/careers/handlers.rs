use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::careers::recommend::{lowercase_skills, recommend, sort_column, sort_direction};
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::{Path, Query};
use crate::models::career::{Career, CareerSummary, CareerView};
use crate::models::learning_path::LearningPathSummary;
use crate::pagination::{LimitQuery, PageQuery, Pagination};
use crate::state::AppState;

const SEARCH_VECTOR: &str =
    "to_tsvector('english', title || ' ' || description || ' ' || category)";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub experience_level: Option<String>,
    pub education_level: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl CareerFilter {
    fn paging(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a CareerFilter) {
    qb.push(" WHERE is_active = TRUE");
    let columns = [
        ("category", &filter.category),
        ("experience_level", &filter.experience_level),
        ("education_level", &filter.education_level),
    ];
    for (column, value) in columns {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            qb.push(format!(" AND {column} = ")).push_bind(value);
        }
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(format!(" AND {SEARCH_VECTOR} @@ plainto_tsquery('english', "))
            .push_bind(search)
            .push(")");
    }
}

/// GET /api/careers
pub async fn handle_list_careers(
    State(state): State<AppState>,
    Query(filter): Query<CareerFilter>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let paging = filter.paging();
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM careers");
    push_filters(&mut count, &filter);
    let total: i64 = count.build_query_scalar().fetch_one(&state.db).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM careers");
    push_filters(&mut select, &filter);
    select
        .push(format!(
            " ORDER BY {} {}, id",
            sort_column(filter.sort_by.as_deref()),
            sort_direction(filter.sort_order.as_deref())
        ))
        .push(" LIMIT ")
        .push_bind(paging.limit())
        .push(" OFFSET ")
        .push_bind(paging.offset());
    let careers: Vec<Career> = select.build_query_as().fetch_all(&state.db).await?;
    let careers: Vec<CareerView> = careers.into_iter().map(CareerView::from).collect();

    Ok(envelope::ok(json!({
        "careers": careers,
        "pagination": Pagination::new(&paging, total, "totalCareers"),
    })))
}

/// GET /api/careers/:id
pub async fn handle_get_career(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let career: Option<Career> =
        sqlx::query_as("SELECT * FROM careers WHERE id = $1 AND is_active = TRUE")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let career = career.ok_or_else(|| AppError::NotFound("Career not found".to_string()))?;

    let related: Vec<CareerSummary> = sqlx::query_as(
        "SELECT id, title, category, description FROM careers WHERE id = ANY($1) AND is_active = TRUE",
    )
    .bind(&career.related_careers)
    .fetch_all(&state.db)
    .await?;

    let paths: Vec<LearningPathSummary> = sqlx::query_as(
        "SELECT id, title, difficulty, estimated_weeks, total_hours FROM learning_paths WHERE id = ANY($1)",
    )
    .bind(&career.learning_paths)
    .fetch_all(&state.db)
    .await?;

    Ok(envelope::ok(json!({
        "career": CareerView::from(career),
        "relatedCareers": related,
        "learningPaths": paths,
    })))
}

/// GET /api/careers/recommendations
pub async fn handle_recommendations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Envelope<Value>>, AppError> {
    let skills = lowercase_skills(&user);
    let candidates: Vec<Career> = sqlx::query_as(
        r#"
        SELECT * FROM careers
        WHERE is_active = TRUE
          AND (category = $1
               OR EXISTS (
                   SELECT 1 FROM jsonb_array_elements(required_skills) AS s
                   WHERE lower(s->>'name') = ANY($2)))
        LIMIT 10
        "#,
    )
    .bind(&user.field)
    .bind(&skills)
    .fetch_all(&state.db)
    .await?;

    Ok(envelope::ok(json!({
        "recommendations": recommend(candidates, &user),
    })))
}

/// GET /api/careers/categories
pub async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let categories: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT category FROM careers WHERE is_active = TRUE ORDER BY category",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(envelope::ok(json!({ "categories": categories })))
}

/// GET /api/careers/search/:query
pub async fn handle_search(
    State(state): State<AppState>,
    Path(query): Path<String>,
    Query(limit): Query<LimitQuery>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let sql = format!(
        "SELECT * FROM careers WHERE is_active = TRUE \
         AND {SEARCH_VECTOR} @@ plainto_tsquery('english', $1) \
         ORDER BY ts_rank({SEARCH_VECTOR}, plainto_tsquery('english', $1)) DESC LIMIT $2"
    );
    let careers: Vec<Career> = sqlx::query_as(&sql)
        .bind(&query)
        .bind(limit.or_default(10))
        .fetch_all(&state.db)
        .await?;
    let careers: Vec<CareerView> = careers.into_iter().map(CareerView::from).collect();
    Ok(envelope::ok(json!({ "careers": careers })))
}

/// GET /api/careers/trending
pub async fn handle_trending(
    State(state): State<AppState>,
    Query(limit): Query<LimitQuery>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let careers: Vec<Career> = sqlx::query_as(
        r#"
        SELECT * FROM careers
        WHERE is_active = TRUE
          AND growth_rate >= 10
          AND job_outlook IN ('excellent', 'good')
        ORDER BY growth_rate DESC
        LIMIT $1
        "#,
    )
    .bind(limit.or_default(5))
    .fetch_all(&state.db)
    .await?;
    let careers: Vec<CareerView> = careers.into_iter().map(CareerView::from).collect();
    Ok(envelope::ok(json!({ "careers": careers })))
}
