use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const USER_FIELDS: &[&str] = &[
    "computer-science",
    "engineering",
    "business",
    "medicine",
    "arts",
    "science",
    "other",
];

pub const GOAL_STATUSES: &[&str] = &["planned", "in-progress", "completed"];
pub const GOAL_PRIORITIES: &[&str] = &["low", "medium", "high"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    /// 0 – 100
    pub level: u8,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub target_date: DateTime<Utc>,
    pub status: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: String,
    pub course_name: String,
    /// 0 – 100
    pub progress_percent: u8,
    pub completed_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub field: String,
    pub bio: String,
    pub location: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
    pub website: String,
    pub skills: Json<Vec<Skill>>,
    pub goals: Json<Vec<Goal>>,
    #[serde(rename = "progress")]
    pub course_progress: Json<Vec<CourseProgress>>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) fn sample_user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        field: "computer-science".to_string(),
        bio: String::new(),
        location: String::new(),
        phone: String::new(),
        linkedin: String::new(),
        github: String::new(),
        website: String::new(),
        skills: Json(vec![]),
        goals: Json(vec![]),
        course_progress: Json(vec![]),
        is_active: true,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}
