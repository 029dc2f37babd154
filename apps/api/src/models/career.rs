use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const CAREER_CATEGORIES: &[&str] = &[
    "technology",
    "business",
    "healthcare",
    "education",
    "engineering",
    "design",
    "marketing",
    "finance",
    "other",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequiredSkill {
    pub name: String,
    /// beginner | intermediate | advanced
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Career {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub required_skills: Json<Vec<RequiredSkill>>,
    #[serde(skip)]
    pub salary_min: i64,
    #[serde(skip)]
    pub salary_max: i64,
    #[serde(skip)]
    pub salary_currency: String,
    pub job_outlook: String,
    pub education_level: String,
    pub experience_level: String,
    pub work_environment: String,
    pub growth_rate: i32,
    pub related_careers: Vec<Uuid>,
    pub learning_paths: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Career {
    pub fn salary_range(&self) -> SalaryRange {
        SalaryRange {
            min: self.salary_min,
            max: self.salary_max,
            currency: self.salary_currency.clone(),
        }
    }
}

/// Career as returned by the API: the row plus its nested salary range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerView {
    #[serde(flatten)]
    pub career: Career,
    pub salary_range: SalaryRange,
}

impl From<Career> for CareerView {
    fn from(career: Career) -> Self {
        let salary_range = career.salary_range();
        Self {
            career,
            salary_range,
        }
    }
}

/// Short form used when a career is referenced from another document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CareerSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
}
