//! Roadmap generation lifecycle.
//!
//! `start` stores a `generating` placeholder and hands the request to the
//! external workflow. `finish` is reached either from the webhook callback or
//! from a workflow that answered synchronously; it validates the generated
//! document, stores it and seeds the owner's progress ledger.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::progress::UserProgress;
use crate::models::roadmap::{GeneratedPayload, Roadmap, RoadmapStatus, ROADMAP_FIELDS, ROADMAP_LEVELS};
use crate::models::user::User;
use crate::progress::store::{ensure_progress, save_progress};
use crate::roadmaps::documentation::{self, NewDocument};
use crate::roadmaps::schema::{placeholder, rejection, validate_generated};
use crate::roadmaps::store::{insert_roadmap, save_roadmap, set_status, set_workflow_id};
use crate::state::AppState;
use crate::validation::Validator;
use crate::workflow_client::GenerationPayload;

pub const ESTIMATED_TIME: &str = "2-3 minutes";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub field: String,
    pub level: String,
    #[serde(default)]
    pub custom_requirements: Option<String>,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .one_of(&self.field, ROADMAP_FIELDS, "field", "Please select a valid career field")
            .one_of(&self.level, ROADMAP_LEVELS, "level", "Please select a valid skill level")
            .max_len(
                self.custom_requirements.as_deref(),
                500,
                "customRequirements",
                "Custom requirements cannot exceed 500 characters",
            )
            .finish()
    }
}

/// Falls back to a time-based id when the workflow did not name its run.
pub fn workflow_id_or_default(workflow_id: Option<String>, now: DateTime<Utc>) -> String {
    workflow_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("workflow-{}", now.timestamp_millis()))
}

/// Creates the placeholder, triggers the workflow and opens the owner's
/// progress ledger.
pub async fn start(
    state: &AppState,
    user: &User,
    req: GenerateRequest,
    now: DateTime<Utc>,
) -> Result<(Roadmap, UserProgress), AppError> {
    let existing: Option<String> = sqlx::query_scalar(
        r#"
        SELECT roadmap_id FROM roadmaps
        WHERE user_id = $1 AND field = $2 AND level = $3
          AND status IN ('generating', 'completed')
        LIMIT 1
        "#,
    )
    .bind(user.id)
    .bind(&req.field)
    .bind(&req.level)
    .fetch_optional(&state.db)
    .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You already have a roadmap for this field and level".to_string(),
        ));
    }

    let pending = insert_roadmap(&state.db, &placeholder(user.id, &req.field, &req.level, now)).await?;

    let payload = GenerationPayload {
        field: req.field,
        level: req.level,
        user_id: user.id,
        roadmap_id: pending.roadmap_id.clone(),
        custom_requirements: req.custom_requirements.filter(|r| !r.trim().is_empty()),
        callback_url: state.config.callback_url(),
    };

    let response = match state.generator.trigger(&payload).await {
        Ok(response) => response,
        Err(e) => {
            set_status(&state.db, pending.id, RoadmapStatus::Failed).await?;
            return Err(AppError::Workflow(e.to_string()));
        }
    };

    // The callback may already have completed the roadmap while the trigger
    // was in flight, so only the workflow id is written here.
    let workflow_id = workflow_id_or_default(response.workflow_id.clone(), now);
    let mut roadmap = set_workflow_id(&state.db, pending.id, &workflow_id).await?;

    let mut progress = ensure_progress(
        &state.db,
        &UserProgress::new(user.id, &roadmap.roadmap_id, roadmap.id, now),
    )
    .await?;

    let synchronous = response.completed_payload().filter(|_| !roadmap.is_completed());
    if let Some(generated) = synchronous {
        match finish(state, &mut roadmap, generated, now).await {
            Ok(seeded) => progress = seeded,
            Err(e) => warn!("Synchronous result for {} rejected: {}", roadmap.roadmap_id, e),
        }
    }

    info!("Roadmap generation started for {} by user {}", roadmap.roadmap_id, user.id);
    Ok((roadmap, progress))
}

/// Stores generated content. Invalid content marks the roadmap failed and
/// yields 422.
pub async fn finish(
    state: &AppState,
    roadmap: &mut Roadmap,
    payload: GeneratedPayload,
    now: DateTime<Utc>,
) -> Result<UserProgress, AppError> {
    if let Err(errors) = validate_generated(&payload.roadmap_json) {
        warn!(
            "Generated roadmap {} failed validation with {} problem(s)",
            roadmap.roadmap_id,
            errors.len()
        );
        set_status(&state.db, roadmap.id, RoadmapStatus::Failed).await?;
        roadmap.status = RoadmapStatus::Failed.as_str().to_string();
        return Err(rejection(&errors));
    }

    let doc_title = payload
        .roadmap_json
        .title
        .clone()
        .unwrap_or_else(|| roadmap.title.clone());
    let markdown = payload.roadmap_doc.clone();
    roadmap.apply_generated(payload.roadmap_json, payload.roadmap_doc, now);
    *roadmap = save_roadmap(&state.db, roadmap).await?;

    let mut progress = ensure_progress(
        &state.db,
        &UserProgress::new(roadmap.user_id, &roadmap.roadmap_id, roadmap.id, now),
    )
    .await?;
    progress.seed_phases(&roadmap.phases);
    progress.last_updated = now;
    let progress = save_progress(&state.db, &progress).await?;

    // The markdown is also kept on the roadmap row, so a failed upload only
    // costs the archive copy.
    match documentation::archive(&state.s3, &state.config.s3_bucket, &roadmap.roadmap_id, &markdown).await {
        Ok(s3_key) => {
            documentation::record_document(
                &state.db,
                NewDocument {
                    roadmap: &*roadmap,
                    title: doc_title,
                    s3_key,
                    tokens: payload.tokens.unwrap_or_else(|| Value::Object(Default::default())),
                    generated_at: now,
                },
            )
            .await?;
        }
        Err(e) => warn!("Documentation for {} not archived: {}", roadmap.roadmap_id, e),
    }

    info!("Roadmap {} completed", roadmap.roadmap_id);
    Ok(progress)
}
