//! Generated markdown is archived to S3 and indexed in `roadmap_documents`.

use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::roadmap::{Roadmap, RoadmapDocument};

pub fn s3_key(roadmap_id: &str) -> String {
    format!("roadmaps/{roadmap_id}/documentation.md")
}

/// Uploads the markdown and returns the object key.
pub async fn archive(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    roadmap_id: &str,
    markdown: &str,
) -> Result<String, AppError> {
    let key = s3_key(roadmap_id);
    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(markdown.as_bytes().to_vec()))
        .content_type("text/markdown")
        .send()
        .await
        .map_err(|e| AppError::S3(e.to_string()))?;

    info!("Archived roadmap documentation to s3://{}/{}", bucket, key);
    Ok(key)
}

/// Best-effort: a missing object or an unreachable bucket is only logged.
pub async fn remove_archive(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) {
    if let Err(e) = s3.delete_object().bucket(bucket).key(key).send().await {
        warn!("Failed to delete s3://{}/{}: {}", bucket, key, e);
    }
}

pub struct NewDocument<'a> {
    pub roadmap: &'a Roadmap,
    pub title: String,
    pub s3_key: String,
    pub tokens: Value,
    pub generated_at: DateTime<Utc>,
}

/// One record per roadmap; a repeated callback replaces it.
pub async fn record_document(db: &PgPool, doc: NewDocument<'_>) -> Result<RoadmapDocument, AppError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO roadmap_documents (id, roadmap_id, roadmap_object_id, title, s3_key, ai_model, tokens, generated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (roadmap_id) DO UPDATE SET
            title = EXCLUDED.title,
            s3_key = EXCLUDED.s3_key,
            ai_model = EXCLUDED.ai_model,
            tokens = EXCLUDED.tokens,
            generated_at = EXCLUDED.generated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&doc.roadmap.roadmap_id)
    .bind(doc.roadmap.id)
    .bind(&doc.title)
    .bind(&doc.s3_key)
    .bind(&doc.roadmap.metadata.ai_model)
    .bind(&doc.tokens)
    .bind(doc.generated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn find_document(db: &PgPool, roadmap_id: &str) -> Result<Option<RoadmapDocument>, AppError> {
    let row = sqlx::query_as("SELECT * FROM roadmap_documents WHERE roadmap_id = $1")
        .bind(roadmap_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}
