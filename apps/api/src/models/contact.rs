use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Message,
    Newsletter,
    Feedback,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Message => "message",
            ContactKind::Newsletter => "newsletter",
            ContactKind::Feedback => "feedback",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    pub kind: String,
    pub name: Option<String>,
    pub email: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub rating: Option<i16>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}
