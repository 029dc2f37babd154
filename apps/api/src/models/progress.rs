use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];
pub const DIFFICULTY_PREFERENCES: &[&str] = &["easy", "moderate", "challenging"];
pub const PACE_PREFERENCES: &[&str] = &["slow", "moderate", "fast"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProgress {
    pub resource_url: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProgress {
    pub project_title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    pub step_id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Hours.
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceProgress>,
    #[serde(default)]
    pub projects: Vec<ProjectProgress>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseProgress {
    pub phase_id: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<StepProgress>,
    /// 0 – 100
    #[serde(default)]
    pub overall_progress: u8,
    #[serde(default)]
    pub estimated_completion_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    /// Hours.
    pub total_time_spent: f64,
    pub average_session_time: f64,
    pub study_sessions: u32,
    pub streak_days: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FirstStep,
    FirstPhase,
    FirstProject,
    #[serde(rename = "streak_7_days")]
    Streak7Days,
    #[serde(rename = "streak_30_days")]
    Streak30Days,
    FastLearner,
    ConsistentLearner,
    RoadmapCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub achieved_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapRating {
    pub rating: u8,
    #[serde(default)]
    pub feedback: String,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyTime {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPreferences {
    #[serde(default)]
    pub preferred_resource_types: Vec<String>,
    pub difficulty_preference: String,
    pub pace_preference: String,
}

impl Default for LearningPreferences {
    fn default() -> Self {
        Self {
            preferred_resource_types: vec![],
            difficulty_preference: "moderate".to_string(),
            pace_preference: "moderate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyReminder {
    pub enabled: bool,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoal {
    pub enabled: bool,
    pub hours_per_week: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    pub daily_reminder: DailyReminder,
    pub weekly_goal: WeeklyGoal,
    pub milestone_reminder: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            daily_reminder: DailyReminder {
                enabled: true,
                time: "09:00".to_string(),
            },
            weekly_goal: WeeklyGoal {
                enabled: true,
                hours_per_week: 10,
            },
            milestone_reminder: true,
        }
    }
}

/// Per-user, per-roadmap completion ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub roadmap_object_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub phases: Json<Vec<PhaseProgress>>,
    /// 0 – 100
    pub overall_progress: i32,
    pub custom_notes: Option<String>,
    pub target_completion_date: Option<DateTime<Utc>>,
    pub study_hours_per_week: i32,
    pub preferred_study_times: Json<Vec<StudyTime>>,
    pub stats: Json<StudyStats>,
    pub achievements: Json<Vec<Achievement>>,
    pub roadmap_rating: Option<Json<RoadmapRating>>,
    pub learning_preferences: Json<LearningPreferences>,
    pub notifications: Json<Notifications>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    /// Fresh ledger for a roadmap that is still being generated.
    pub fn new(user_id: Uuid, roadmap_id: &str, roadmap_object_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            roadmap_id: roadmap_id.to_string(),
            roadmap_object_id,
            started_at: now,
            last_updated: now,
            completed_at: None,
            phases: Json(vec![]),
            overall_progress: 0,
            custom_notes: None,
            target_completion_date: None,
            study_hours_per_week: 10,
            preferred_study_times: Json(vec![]),
            stats: Json(StudyStats::default()),
            achievements: Json(vec![]),
            roadmap_rating: None,
            learning_preferences: Json(LearningPreferences::default()),
            notifications: Json(Notifications::default()),
            created_at: now,
            updated_at: now,
        }
    }
}
