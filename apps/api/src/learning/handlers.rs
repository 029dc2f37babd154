use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::{JsonBody, Path, Query};
use crate::learning::personalize::{add_rating, personalize, sort_column, sort_direction};
use crate::models::career::CareerSummary;
use crate::models::learning_path::{LearningPath, LearningPathView};
use crate::pagination::{LimitQuery, PageQuery, Pagination};
use crate::state::AppState;
use crate::validation::Validator;

const SEARCH_VECTOR: &str =
    "to_tsvector('english', title || ' ' || description || ' ' || category)";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a PathFilter) {
    qb.push(" WHERE is_active = TRUE");
    if let Some(category) = filter.category.as_deref().filter(|v| !v.is_empty()) {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(difficulty) = filter.difficulty.as_deref().filter(|v| !v.is_empty()) {
        qb.push(" AND difficulty = ").push_bind(difficulty);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(format!(" AND {SEARCH_VECTOR} @@ plainto_tsquery('english', "))
            .push_bind(search)
            .push(")");
    }
}

fn views(paths: Vec<LearningPath>) -> Vec<LearningPathView> {
    paths.into_iter().map(LearningPathView::from).collect()
}

/// GET /api/learning/paths
pub async fn handle_list_paths(
    State(state): State<AppState>,
    Query(filter): Query<PathFilter>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let paging = PageQuery {
        page: filter.page,
        limit: filter.limit,
    };

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM learning_paths");
    push_filters(&mut count, &filter);
    let total: i64 = count.build_query_scalar().fetch_one(&state.db).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM learning_paths");
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
    let paths: Vec<LearningPath> = select.build_query_as().fetch_all(&state.db).await?;

    Ok(envelope::ok(json!({
        "learningPaths": views(paths),
        "pagination": Pagination::new(&paging, total, "totalPaths"),
    })))
}

/// GET /api/learning/paths/:id
pub async fn handle_get_path(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let path: Option<LearningPath> =
        sqlx::query_as("SELECT * FROM learning_paths WHERE id = $1 AND is_active = TRUE")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let path = path.ok_or_else(|| AppError::NotFound("Learning path not found".to_string()))?;

    let related: Vec<CareerSummary> = sqlx::query_as(
        "SELECT id, title, category, description FROM careers WHERE id = ANY($1) AND is_active = TRUE",
    )
    .bind(&path.related_careers)
    .fetch_all(&state.db)
    .await?;

    Ok(envelope::ok(json!({
        "learningPath": LearningPathView::from(path),
        "relatedCareers": related,
    })))
}

/// GET /api/learning/personalized
pub async fn handle_personalized(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Envelope<Value>>, AppError> {
    let goal_titles: Vec<String> = user
        .goals
        .iter()
        .filter(|g| g.status != "completed")
        .map(|g| g.title.to_lowercase())
        .collect();

    // Candidates share the user's field or mention one of the open goals.
    let candidates: Vec<LearningPath> = sqlx::query_as(
        r#"
        SELECT * FROM learning_paths
        WHERE is_active = TRUE
          AND (category = $1
               OR EXISTS (
                   SELECT 1 FROM unnest($2::TEXT[]) AS goal
                   WHERE strpos(lower(title), goal) > 0 OR strpos(goal, lower(title)) > 0))
        ORDER BY popularity DESC
        LIMIT 10
        "#,
    )
    .bind(&user.field)
    .bind(&goal_titles)
    .fetch_all(&state.db)
    .await?;

    Ok(envelope::ok(json!({
        "learningPaths": personalize(candidates, &user),
    })))
}

/// GET /api/learning/categories
pub async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let categories: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT category FROM learning_paths WHERE is_active = TRUE ORDER BY category",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(envelope::ok(json!({ "categories": categories })))
}

/// GET /api/learning/search/:query
pub async fn handle_search(
    State(state): State<AppState>,
    Path(query): Path<String>,
    Query(limit): Query<LimitQuery>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let sql = format!(
        "SELECT * FROM learning_paths WHERE is_active = TRUE \
         AND {SEARCH_VECTOR} @@ plainto_tsquery('english', $1) \
         ORDER BY ts_rank({SEARCH_VECTOR}, plainto_tsquery('english', $1)) DESC LIMIT $2"
    );
    let paths: Vec<LearningPath> = sqlx::query_as(&sql)
        .bind(&query)
        .bind(limit.or_default(10))
        .fetch_all(&state.db)
        .await?;
    Ok(envelope::ok(json!({ "learningPaths": views(paths) })))
}

/// GET /api/learning/popular
pub async fn handle_popular(
    State(state): State<AppState>,
    Query(limit): Query<LimitQuery>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let paths: Vec<LearningPath> = sqlx::query_as(
        r#"
        SELECT * FROM learning_paths
        WHERE is_active = TRUE
        ORDER BY popularity DESC, rating_average DESC
        LIMIT $1
        "#,
    )
    .bind(limit.or_default(5))
    .fetch_all(&state.db)
    .await?;
    Ok(envelope::ok(json!({ "learningPaths": views(paths) })))
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i64,
}

/// POST /api/learning/paths/:id/rate
pub async fn handle_rate_path(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<RateRequest>,
) -> Result<Json<Envelope<Value>>, AppError> {
    Validator::new()
        .check((1..=5).contains(&req.rating), "rating", "Rating must be between 1 and 5")
        .finish()?;

    let path: Option<LearningPath> = sqlx::query_as("SELECT * FROM learning_paths WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let path = path.ok_or_else(|| AppError::NotFound("Learning path not found".to_string()))?;

    let rating = add_rating(path.rating(), req.rating as u8);
    sqlx::query(
        "UPDATE learning_paths SET rating_average = $1, rating_count = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(rating.average)
    .bind(rating.count)
    .bind(id)
    .execute(&state.db)
    .await?;

    Ok(envelope::ok_with_message(
        "Rating submitted successfully",
        json!({ "rating": rating }),
    ))
}
