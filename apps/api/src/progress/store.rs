use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::progress::UserProgress;

/// Inserts the ledger unless the user already has one for this roadmap and
/// returns whichever row is stored.
pub async fn ensure_progress(db: &PgPool, progress: &UserProgress) -> Result<UserProgress, AppError> {
    sqlx::query(
        r#"
        INSERT INTO user_progress (
            id, user_id, roadmap_id, roadmap_object_id, started_at, last_updated,
            completed_at, phases, overall_progress, custom_notes, target_completion_date,
            study_hours_per_week, preferred_study_times, stats, achievements,
            roadmap_rating, learning_preferences, notifications, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        ON CONFLICT (user_id, roadmap_id) DO NOTHING
        "#,
    )
    .bind(progress.id)
    .bind(progress.user_id)
    .bind(&progress.roadmap_id)
    .bind(progress.roadmap_object_id)
    .bind(progress.started_at)
    .bind(progress.last_updated)
    .bind(progress.completed_at)
    .bind(&progress.phases)
    .bind(progress.overall_progress)
    .bind(&progress.custom_notes)
    .bind(progress.target_completion_date)
    .bind(progress.study_hours_per_week)
    .bind(&progress.preferred_study_times)
    .bind(&progress.stats)
    .bind(&progress.achievements)
    .bind(&progress.roadmap_rating)
    .bind(&progress.learning_preferences)
    .bind(&progress.notifications)
    .bind(progress.created_at)
    .bind(progress.updated_at)
    .execute(db)
    .await?;

    require_progress(db, progress.user_id, &progress.roadmap_id).await
}

/// Writes every mutable column back and bumps `updated_at`.
pub async fn save_progress(db: &PgPool, progress: &UserProgress) -> Result<UserProgress, AppError> {
    let row = sqlx::query_as(
        r#"
        UPDATE user_progress SET
            last_updated = $2,
            completed_at = $3,
            phases = $4,
            overall_progress = $5,
            custom_notes = $6,
            target_completion_date = $7,
            study_hours_per_week = $8,
            preferred_study_times = $9,
            stats = $10,
            achievements = $11,
            roadmap_rating = $12,
            learning_preferences = $13,
            notifications = $14,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(progress.id)
    .bind(progress.last_updated)
    .bind(progress.completed_at)
    .bind(&progress.phases)
    .bind(progress.overall_progress)
    .bind(&progress.custom_notes)
    .bind(progress.target_completion_date)
    .bind(progress.study_hours_per_week)
    .bind(&progress.preferred_study_times)
    .bind(&progress.stats)
    .bind(&progress.achievements)
    .bind(&progress.roadmap_rating)
    .bind(&progress.learning_preferences)
    .bind(&progress.notifications)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn find_progress(
    db: &PgPool,
    user_id: Uuid,
    roadmap_id: &str,
) -> Result<Option<UserProgress>, AppError> {
    let row = sqlx::query_as("SELECT * FROM user_progress WHERE user_id = $1 AND roadmap_id = $2")
        .bind(user_id)
        .bind(roadmap_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Loads the caller's ledger for a roadmap or fails with 404.
pub async fn require_progress(
    db: &PgPool,
    user_id: Uuid,
    roadmap_id: &str,
) -> Result<UserProgress, AppError> {
    find_progress(db, user_id, roadmap_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Progress record not found".to_string()))
}
