use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::roadmap::{Roadmap, RoadmapStatus};

pub async fn insert_roadmap(db: &PgPool, roadmap: &Roadmap) -> Result<Roadmap, AppError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO roadmaps (
            id, user_id, roadmap_id, title, field, level, overview, phases, connections,
            metadata, documentation, status, is_public, rating_average, rating_count,
            workflow_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(roadmap.id)
    .bind(roadmap.user_id)
    .bind(&roadmap.roadmap_id)
    .bind(&roadmap.title)
    .bind(&roadmap.field)
    .bind(&roadmap.level)
    .bind(&roadmap.overview)
    .bind(&roadmap.phases)
    .bind(&roadmap.connections)
    .bind(&roadmap.metadata)
    .bind(&roadmap.documentation)
    .bind(&roadmap.status)
    .bind(roadmap.is_public)
    .bind(roadmap.rating_average)
    .bind(roadmap.rating_count)
    .bind(&roadmap.workflow_id)
    .bind(roadmap.created_at)
    .bind(roadmap.updated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn save_roadmap(db: &PgPool, roadmap: &Roadmap) -> Result<Roadmap, AppError> {
    let row = sqlx::query_as(
        r#"
        UPDATE roadmaps SET
            title = $2,
            overview = $3,
            phases = $4,
            connections = $5,
            metadata = $6,
            documentation = $7,
            status = $8,
            is_public = $9,
            rating_average = $10,
            rating_count = $11,
            workflow_id = $12,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(roadmap.id)
    .bind(&roadmap.title)
    .bind(&roadmap.overview)
    .bind(&roadmap.phases)
    .bind(&roadmap.connections)
    .bind(&roadmap.metadata)
    .bind(&roadmap.documentation)
    .bind(&roadmap.status)
    .bind(roadmap.is_public)
    .bind(roadmap.rating_average)
    .bind(roadmap.rating_count)
    .bind(&roadmap.workflow_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Records the workflow run without touching content a concurrent callback
/// may already have written.
pub async fn set_workflow_id(db: &PgPool, id: Uuid, workflow_id: &str) -> Result<Roadmap, AppError> {
    let row = sqlx::query_as(
        "UPDATE roadmaps SET workflow_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(workflow_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn set_status(db: &PgPool, id: Uuid, status: RoadmapStatus) -> Result<(), AppError> {
    sqlx::query("UPDATE roadmaps SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn find_by_roadmap_id(db: &PgPool, roadmap_id: &str) -> Result<Option<Roadmap>, AppError> {
    let row = sqlx::query_as("SELECT * FROM roadmaps WHERE roadmap_id = $1")
        .bind(roadmap_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn require_roadmap(db: &PgPool, roadmap_id: &str) -> Result<Roadmap, AppError> {
    find_by_roadmap_id(db, roadmap_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Roadmap not found".to_string()))
}

/// Writes only the fields an owner may edit.
pub async fn save_owner_edits(db: &PgPool, roadmap: &Roadmap) -> Result<Roadmap, AppError> {
    let row = sqlx::query_as(
        r#"
        UPDATE roadmaps SET title = $2, overview = $3, metadata = $4, is_public = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(roadmap.id)
    .bind(&roadmap.title)
    .bind(&roadmap.overview)
    .bind(&roadmap.metadata)
    .bind(roadmap.is_public)
    .fetch_one(db)
    .await?;
    Ok(row)
}

const SHARED: &str = "is_public AND status = 'completed'";

/// One page of shared roadmaps, newest first, optionally narrowed to fields
/// matching a `LIKE` pattern.
pub async fn shared_page(
    db: &PgPool,
    field_pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Roadmap>, i64), AppError> {
    let filter = format!("WHERE {SHARED} AND ($1::TEXT IS NULL OR field ILIKE $1)");
    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM roadmaps {filter}"))
        .bind(field_pattern)
        .fetch_one(db)
        .await?;
    let rows = sqlx::query_as(&format!(
        "SELECT * FROM roadmaps {filter} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(field_pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok((rows, total))
}

/// Counts a view of a shared roadmap; `None` when it is not shared.
pub async fn view_shared(db: &PgPool, roadmap_id: &str) -> Result<Option<Roadmap>, AppError> {
    let row = sqlx::query_as(&format!(
        "UPDATE roadmaps SET view_count = view_count + 1 WHERE roadmap_id = $1 AND {SHARED} RETURNING *"
    ))
    .bind(roadmap_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Bumps the helpful counter of a shared roadmap and returns the new count.
pub async fn mark_helpful(db: &PgPool, roadmap_id: &str) -> Result<Option<i32>, AppError> {
    let count = sqlx::query_scalar(&format!(
        "UPDATE roadmaps SET helpful_count = helpful_count + 1 WHERE roadmap_id = $1 AND {SHARED} RETURNING helpful_count"
    ))
    .bind(roadmap_id)
    .fetch_optional(db)
    .await?;
    Ok(count)
}

pub async fn list_for_owner(db: &PgPool, user_id: Uuid) -> Result<Vec<Roadmap>, AppError> {
    let rows = sqlx::query_as("SELECT * FROM roadmaps WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}
