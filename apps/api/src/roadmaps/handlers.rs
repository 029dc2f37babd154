use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::extractor::bearer_matches;
use crate::auth::AuthUser;
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::{JsonBody, Path, Query};
use crate::models::progress::UserProgress;
use crate::models::roadmap::{GeneratedPayload, Roadmap, RoadmapStatus, RoadmapView, ROADMAP_FIELDS};
use crate::models::user::User;
use crate::pagination::PageQuery;
use crate::progress::store::{find_progress, require_progress, save_progress};
use crate::progress::tracker::StepCompletion;
use crate::roadmaps::documentation::{self, find_document};
use crate::roadmaps::generation::{self, GenerateRequest, ESTIMATED_TIME};
use crate::roadmaps::layout::build_graph;
use crate::roadmaps::schema::field_slug;
use crate::roadmaps::store::{require_roadmap, save_roadmap, set_status};
use crate::state::AppState;
use crate::validation::Validator;

/// POST /api/roadmaps/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<GenerateRequest>,
) -> Result<(StatusCode, Json<Envelope<Value>>), AppError> {
    req.validate()?;
    let (roadmap, progress) = generation::start(&state, &user, req, Utc::now()).await?;

    Ok((
        StatusCode::ACCEPTED,
        envelope::ok_with_message(
            "Roadmap generation started",
            json!({
                "roadmap": RoadmapView::from(&roadmap),
                "progress": progress,
                "estimatedTime": ESTIMATED_TIME,
            }),
        ),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct RoadmapListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListPagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl ListPagination {
    fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoadmapWithProgress {
    #[serde(flatten)]
    pub roadmap: RoadmapView,
    pub progress: Option<UserProgress>,
}

/// GET /api/roadmaps
pub async fn handle_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<RoadmapListQuery>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let paging = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let (page, limit) = (paging.page(), paging.limit());
    let status = query.status.filter(|s| !s.is_empty());
    let field = query.field.filter(|f| !f.is_empty());

    let filter = "WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) AND ($3::TEXT IS NULL OR field = $3)";
    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM roadmaps {filter}"))
        .bind(user.id)
        .bind(&status)
        .bind(&field)
        .fetch_one(&state.db)
        .await?;

    let roadmaps: Vec<Roadmap> = sqlx::query_as(&format!(
        "SELECT * FROM roadmaps {filter} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
    ))
    .bind(user.id)
    .bind(&status)
    .bind(&field)
    .bind(limit)
    .bind(paging.offset())
    .fetch_all(&state.db)
    .await?;

    let ids: Vec<String> = roadmaps.iter().map(|r| r.roadmap_id.clone()).collect();
    let ledgers: Vec<UserProgress> =
        sqlx::query_as("SELECT * FROM user_progress WHERE user_id = $1 AND roadmap_id = ANY($2)")
            .bind(user.id)
            .bind(&ids)
            .fetch_all(&state.db)
            .await?;

    let items: Vec<RoadmapWithProgress> = roadmaps
        .iter()
        .map(|roadmap| RoadmapWithProgress {
            roadmap: RoadmapView::from(roadmap),
            progress: ledgers
                .iter()
                .find(|p| p.roadmap_id == roadmap.roadmap_id)
                .cloned(),
        })
        .collect();

    Ok(envelope::ok(json!({
        "roadmaps": items,
        "pagination": ListPagination::new(page, limit, total),
    })))
}

/// Owners see everything; anyone else only public roadmaps.
fn ensure_visible(roadmap: &Roadmap, user: &User) -> Result<(), AppError> {
    if roadmap.user_id == user.id || roadmap.is_public {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

/// Progress is only ever shown to the roadmap's owner.
async fn owner_progress(
    state: &AppState,
    roadmap: &Roadmap,
    user: &User,
) -> Result<Option<UserProgress>, AppError> {
    if roadmap.user_id != user.id {
        return Ok(None);
    }
    find_progress(&state.db, user.id, &roadmap.roadmap_id).await
}

/// GET /api/roadmaps/:id
pub async fn handle_get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let roadmap = require_roadmap(&state.db, &roadmap_id).await?;
    ensure_visible(&roadmap, &user)?;

    let progress = owner_progress(&state, &roadmap, &user).await?;
    let documentation = find_document(&state.db, &roadmap.roadmap_id).await?;

    Ok(envelope::ok(json!({
        "roadmap": RoadmapView::from(&roadmap),
        "progress": progress,
        "documentation": documentation,
        "completionPercentage": roadmap.completion_percentage(progress.as_ref()),
    })))
}

/// GET /api/roadmaps/:id/graph
pub async fn handle_graph(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let roadmap = require_roadmap(&state.db, &roadmap_id).await?;
    ensure_visible(&roadmap, &user)?;
    let progress = owner_progress(&state, &roadmap, &user).await?;

    Ok(envelope::ok(json!(build_graph(&roadmap, progress.as_ref()))))
}

pub const PROGRESS_ACTIONS: &[&str] = &["complete_step", "uncomplete_step", "add_note", "rate_step"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressAction {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub phase_id: String,
    #[serde(default)]
    pub step_id: String,
    pub time_spent: Option<f64>,
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

impl ProgressAction {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .one_of(&self.action, PROGRESS_ACTIONS, "action", "Invalid action")
            .require_non_empty(&self.phase_id, "phaseId", "Phase ID is required")
            .require_non_empty(&self.step_id, "stepId", "Step ID is required")
            .finish()
    }

    /// Out-of-range values are mapped to 0 so the tracker rejects them.
    fn rating(&self) -> Option<u8> {
        self.rating.map(|r| u8::try_from(r).unwrap_or(0))
    }

    /// Applies the action to `progress`.
    pub fn apply(self, progress: &mut UserProgress, now: chrono::DateTime<Utc>) -> Result<(), AppError> {
        let rating = self.rating();
        match self.action.as_str() {
            "complete_step" => {
                let unlocked = progress.complete_step(
                    &self.phase_id,
                    &self.step_id,
                    StepCompletion {
                        time_spent: self.time_spent,
                        rating,
                        notes: self.notes,
                    },
                    now,
                )?;
                for achievement in unlocked {
                    info!("User {} unlocked {:?}", progress.user_id, achievement.kind);
                }
            }
            "uncomplete_step" => progress.uncomplete_step(&self.phase_id, &self.step_id, now)?,
            "add_note" => progress.set_step_notes(
                &self.phase_id,
                &self.step_id,
                self.notes.unwrap_or_default(),
                now,
            )?,
            "rate_step" => progress.rate_step(&self.phase_id, &self.step_id, rating.unwrap_or(0), now)?,
            _ => return Err(AppError::Validation("Invalid action".to_string())),
        }
        Ok(())
    }
}

/// PUT /api/roadmaps/:id/progress
pub async fn handle_update_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
    JsonBody(req): JsonBody<ProgressAction>,
) -> Result<Json<Envelope<UserProgress>>, AppError> {
    req.validate()?;
    let mut progress = require_progress(&state.db, user.id, &roadmap_id).await?;
    req.apply(&mut progress, Utc::now())?;
    let progress = save_progress(&state.db, &progress).await?;
    Ok(envelope::ok_with_message("Progress updated successfully", progress))
}

#[derive(Debug, Deserialize)]
pub struct RateRoadmapRequest {
    pub rating: i64,
    pub feedback: Option<String>,
}

impl RateRoadmapRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .check((1..=5).contains(&self.rating), "rating", "Rating must be between 1 and 5")
            .max_len(
                self.feedback.as_deref(),
                1000,
                "feedback",
                "Feedback cannot exceed 1000 characters",
            )
            .finish()
    }
}

/// POST /api/roadmaps/:id/rate
pub async fn handle_rate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
    JsonBody(req): JsonBody<RateRoadmapRequest>,
) -> Result<Json<Envelope<Value>>, AppError> {
    req.validate()?;
    let rating = req.rating as u8;
    let now = Utc::now();

    let mut roadmap = require_roadmap(&state.db, &roadmap_id).await?;
    ensure_visible(&roadmap, &user)?;
    roadmap.add_rating(rating)?;
    let roadmap = save_roadmap(&state.db, &roadmap).await?;

    if let Some(mut progress) = find_progress(&state.db, user.id, &roadmap_id).await? {
        progress.rate_roadmap(rating, req.feedback.clone().unwrap_or_default(), now)?;
        save_progress(&state.db, &progress).await?;
    }

    Ok(envelope::ok_with_message(
        "Rating added successfully",
        json!({
            "roadmap": RoadmapView::from(&roadmap),
            "userRating": { "rating": rating, "feedback": req.feedback },
        }),
    ))
}

/// DELETE /api/roadmaps/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Envelope<()>>, AppError> {
    let roadmap: Option<Roadmap> =
        sqlx::query_as("SELECT * FROM roadmaps WHERE roadmap_id = $1 AND user_id = $2")
            .bind(&roadmap_id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;
    let roadmap = roadmap.ok_or_else(|| AppError::NotFound("Roadmap not found".to_string()))?;
    let document = find_document(&state.db, &roadmap_id).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM user_progress WHERE roadmap_object_id = $1")
        .bind(roadmap.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM roadmap_documents WHERE roadmap_object_id = $1")
        .bind(roadmap.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM roadmaps WHERE id = $1")
        .bind(roadmap.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    if let Some(document) = document {
        documentation::remove_archive(&state.s3, &state.config.s3_bucket, &document.s3_key).await;
    }

    info!("Roadmap {} deleted by user {}", roadmap_id, user.id);
    Ok(envelope::message_only("Roadmap deleted successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStats {
    pub name: String,
    pub slug: String,
    pub roadmap_count: i64,
    pub average_rating: f64,
}

/// GET /api/roadmaps/meta/fields
pub async fn handle_fields(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<FieldStats>>>, AppError> {
    let rows: Vec<(String, i64, Option<f64>)> = sqlx::query_as(
        r#"
        SELECT field,
               COUNT(*),
               AVG(rating_average) FILTER (WHERE rating_count > 0)
        FROM roadmaps
        WHERE status = 'completed'
        GROUP BY field
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let stats = ROADMAP_FIELDS
        .iter()
        .map(|field| {
            let row = rows.iter().find(|(name, _, _)| name == field);
            FieldStats {
                name: field.to_string(),
                slug: field_slug(field),
                roadmap_count: row.map_or(0, |(_, count, _)| *count),
                average_rating: row
                    .and_then(|(_, _, avg)| *avg)
                    .map_or(0.0, |avg| (avg * 10.0).round() / 10.0),
            }
        })
        .collect();

    Ok(envelope::ok(stats))
}

#[derive(Debug, Default, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<i64>,
}

/// GET /api/roadmaps/meta/popular
pub async fn handle_popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Envelope<Vec<RoadmapView>>>, AppError> {
    Validator::new()
        .check(
            query.limit.map_or(true, |l| (1..=50).contains(&l)),
            "limit",
            "Limit must be between 1 and 50",
        )
        .finish()?;

    let roadmaps: Vec<Roadmap> = sqlx::query_as(
        r#"
        SELECT * FROM roadmaps
        WHERE status = 'completed' AND is_public = TRUE AND rating_count >= 5
        ORDER BY rating_average DESC, rating_count DESC
        LIMIT $1
        "#,
    )
    .bind(query.limit.unwrap_or(10))
    .fetch_all(&state.db)
    .await?;

    Ok(envelope::ok(roadmaps.iter().map(RoadmapView::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub roadmap_id: String,
    pub status: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
}

/// POST /api/roadmaps/webhook/n8n-callback
pub async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<CallbackRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    if !bearer_matches(&headers, &state.config.workflow_webhook_secret) {
        warn!("Rejected workflow callback for {} with a bad secret", req.roadmap_id);
        return Err(AppError::Unauthorized("Unauthorized webhook request".to_string()));
    }

    let mut roadmap = require_roadmap(&state.db, &req.roadmap_id).await?;
    let now = Utc::now();

    if let Some(workflow_id) = req.workflow_id.filter(|id| !id.is_empty()) {
        roadmap.workflow_id = Some(workflow_id);
    }

    match (req.status.as_str(), req.data) {
        ("completed", Some(data)) => {
            let payload: GeneratedPayload = match serde_json::from_value(data) {
                Ok(payload) => payload,
                Err(e) => {
                    set_status(&state.db, roadmap.id, RoadmapStatus::Failed).await?;
                    return Err(AppError::UnprocessableEntity(format!(
                        "Generated roadmap is malformed: {e}"
                    )));
                }
            };
            generation::finish(&state, &mut roadmap, payload, now).await?;
        }
        ("failed", _) => {
            warn!(
                "Workflow reported failure for {}: {}",
                req.roadmap_id,
                req.error.as_deref().unwrap_or("no detail")
            );
            roadmap.status = RoadmapStatus::Failed.as_str().to_string();
            save_roadmap(&state.db, &roadmap).await?;
        }
        (status, _) => info!("Ignoring workflow callback status {status} for {}", req.roadmap_id),
    }

    Ok(envelope::message_only("Webhook processed successfully"))
}
