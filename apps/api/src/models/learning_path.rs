use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const DIFFICULTIES: &[&str] = &["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub title: String,
    pub description: String,
    /// Hours.
    pub duration: u32,
    pub difficulty: String,
    /// video | article | interactive | project | quiz
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub is_free: bool,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub average: f64,
    pub count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    #[serde(rename = "estimatedDuration")]
    pub estimated_weeks: i32,
    pub total_hours: i32,
    pub courses: Json<Vec<Course>>,
    pub prerequisites: Vec<String>,
    pub learning_outcomes: Vec<String>,
    pub target_audience: String,
    pub related_careers: Vec<Uuid>,
    pub is_active: bool,
    pub popularity: i32,
    #[serde(skip)]
    pub rating_average: f64,
    #[serde(skip)]
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningPath {
    pub fn rating(&self) -> Rating {
        Rating {
            average: self.rating_average,
            count: self.rating_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathView {
    #[serde(flatten)]
    pub path: LearningPath,
    pub rating: Rating,
}

impl From<LearningPath> for LearningPathView {
    fn from(path: LearningPath) -> Self {
        let rating = path.rating();
        Self { path, rating }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathSummary {
    pub id: Uuid,
    pub title: String,
    pub difficulty: String,
    #[serde(rename = "estimatedDuration")]
    pub estimated_weeks: i32,
    pub total_hours: i32,
}
