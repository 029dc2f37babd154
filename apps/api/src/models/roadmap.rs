use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::career::SalaryRange;
use crate::models::learning_path::Rating;

pub const ROADMAP_FIELDS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "Data Science",
    "Machine Learning",
    "DevOps",
    "Cybersecurity",
    "UI/UX Design",
    "Product Management",
    "Digital Marketing",
    "Cloud Computing",
];

pub const ROADMAP_LEVELS: &[&str] = &["Beginner", "Intermediate", "Advanced", "Expert"];

pub const RESOURCE_TYPES: &[&str] = &["video", "article", "course", "book", "documentation", "tutorial"];
pub const STEP_TYPES: &[&str] = &["course", "project", "certification", "practice", "reading"];
pub const CONNECTION_TYPES: &[&str] = &["prerequisite", "recommended", "parallel", "optional"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapStatus {
    Generating,
    Completed,
    Failed,
}

impl RoadmapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoadmapStatus::Generating => "generating",
            RoadmapStatus::Completed => "completed",
            RoadmapStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default = "default_true")]
    pub free: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub description: String,
    pub difficulty: u8,
    pub estimated_hours: f64,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: String,
    pub order: i32,
    pub difficulty: u8,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub description: String,
    pub duration: String,
    pub difficulty: u8,
    #[serde(default)]
    pub outcomes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub ai_model: String,
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
}

/// Metadata as delivered by the generator; every key is optional and
/// overlays the stored metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub created_at: Option<DateTime<Utc>>,
    pub ai_model: Option<String>,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
    pub industry: Option<String>,
    pub salary_range: Option<SalaryRange>,
}

/// `roadmap_json` as produced by the generation workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRoadmap {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub overview: Overview,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub metadata: MetadataPatch,
}

/// The `{roadmap_json, roadmap_doc}` pair carried by the workflow response
/// or callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPayload {
    pub roadmap_json: GeneratedRoadmap,
    pub roadmap_doc: String,
    #[serde(default)]
    pub tokens: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Roadmap {
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub title: String,
    pub field: String,
    pub level: String,
    pub overview: Json<Overview>,
    pub phases: Json<Vec<Phase>>,
    pub connections: Json<Vec<Connection>>,
    pub metadata: Json<Metadata>,
    pub documentation: String,
    pub status: String,
    pub is_public: bool,
    pub rating_average: f64,
    pub rating_count: i32,
    pub workflow_id: Option<String>,
    pub helpful_count: i32,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapDocument {
    pub id: Uuid,
    pub roadmap_id: String,
    pub roadmap_object_id: Uuid,
    pub title: String,
    pub s3_key: String,
    pub ai_model: String,
    pub tokens: Value,
    pub generated_at: DateTime<Utc>,
}

/// Short form used by dashboards and leaderboards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapSummary {
    pub id: Uuid,
    pub roadmap_id: String,
    pub title: String,
    pub field: String,
    pub level: String,
    pub status: String,
}

impl From<&Roadmap> for RoadmapSummary {
    fn from(r: &Roadmap) -> Self {
        Self {
            id: r.id,
            roadmap_id: r.roadmap_id.clone(),
            title: r.title.clone(),
            field: r.field.clone(),
            level: r.level.clone(),
            status: r.status.clone(),
        }
    }
}

/// Inner `roadmap_json` of the API view.
#[derive(Debug, Clone, Serialize)]
pub struct RoadmapJson {
    pub id: String,
    pub title: String,
    pub field: String,
    pub level: String,
    pub overview: Overview,
    pub phases: Vec<Phase>,
    pub connections: Vec<Connection>,
    pub metadata: Metadata,
}

/// Roadmap as exposed over the API: generated content under `roadmap_json`,
/// markdown under `roadmap_doc`, bookkeeping alongside.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "roadmap_json")]
    pub roadmap_json: RoadmapJson,
    #[serde(rename = "roadmap_doc")]
    pub roadmap_doc: String,
    pub status: String,
    pub is_public: bool,
    pub rating: Rating,
    pub workflow_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

impl From<&Roadmap> for RoadmapView {
    fn from(r: &Roadmap) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            roadmap_json: RoadmapJson {
                id: r.roadmap_id.clone(),
                title: r.title.clone(),
                field: r.field.clone(),
                level: r.level.clone(),
                overview: r.overview.0.clone(),
                phases: r.phases.0.clone(),
                connections: r.connections.0.clone(),
                metadata: r.metadata.0.clone(),
            },
            roadmap_doc: r.documentation.clone(),
            status: r.status.clone(),
            is_public: r.is_public,
            rating: Rating {
                average: r.rating_average,
                count: r.rating_count,
            },
            workflow_id: r.workflow_id.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
            url: format!("/roadmaps/{}", r.roadmap_id),
        }
    }
}

fn default_true() -> bool {
    true
}
