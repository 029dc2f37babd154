use axum::{
    extract::State,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::types::Json as Jsonb;
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::{JsonBody, Path, Query};
use crate::models::progress::{
    StudyTime, UserProgress, DIFFICULTY_PREFERENCES, PACE_PREFERENCES, WEEKDAYS,
};
use crate::models::roadmap::{Roadmap, RoadmapSummary, RESOURCE_TYPES};
use crate::progress::achievements::{achievement_report, AchievementReport};
use crate::progress::dashboard::{
    dashboard_stats, detailed_stats, phase_breakdown, recent_activity, upcoming_steps, Tracked,
};
use crate::progress::store::{require_progress, save_progress};
use crate::roadmaps::store::find_by_roadmap_id;
use crate::state::AppState;
use crate::validation::{is_hh_mm, parse_iso8601, Validator};

#[derive(Debug, Serialize)]
pub struct ProgressWithRoadmap {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub roadmap: Option<RoadmapSummary>,
}

/// GET /api/progress/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Envelope<Value>>, AppError> {
    let records: Vec<UserProgress> =
        sqlx::query_as("SELECT * FROM user_progress WHERE user_id = $1 ORDER BY last_updated DESC")
            .bind(user.id)
            .fetch_all(&state.db)
            .await?;

    let ids: Vec<Uuid> = records.iter().map(|p| p.roadmap_object_id).collect();
    let roadmaps: Vec<Roadmap> = sqlx::query_as("SELECT * FROM roadmaps WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&state.db)
        .await?;

    let tracked: Vec<Tracked<'_>> = records
        .iter()
        .map(|p| (p, roadmaps.iter().find(|r| r.id == p.roadmap_object_id)))
        .collect();
    let now = Utc::now();

    let stats = dashboard_stats(&records);
    let activity = recent_activity(&tracked, now);
    let upcoming = upcoming_steps(&tracked, now);
    let listed: Vec<ProgressWithRoadmap> = tracked
        .iter()
        .map(|(p, r)| ProgressWithRoadmap {
            progress: (*p).clone(),
            roadmap: r.map(RoadmapSummary::from),
        })
        .collect();

    Ok(envelope::ok(json!({
        "stats": stats,
        "roadmaps": listed,
        "recentActivity": activity,
        "upcomingMilestones": upcoming,
    })))
}

/// GET /api/progress/:roadmapId
pub async fn handle_detail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let progress = require_progress(&state.db, user.id, &roadmap_id).await?;
    let roadmap = find_by_roadmap_id(&state.db, &roadmap_id).await?;
    let now = Utc::now();

    Ok(envelope::ok(json!({
        "stats": detailed_stats(&progress, roadmap.as_ref(), now),
        "phaseBreakdown": phase_breakdown(&progress, roadmap.as_ref()),
        "roadmap": roadmap.as_ref().map(RoadmapSummary::from),
        "progress": progress,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPreferencesPatch {
    pub preferred_resource_types: Option<Vec<String>>,
    pub difficulty_preference: Option<String>,
    pub pace_preference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub study_hours_per_week: Option<i64>,
    pub target_completion_date: Option<String>,
    pub preferred_study_times: Option<Vec<StudyTime>>,
    pub learning_preferences: Option<LearningPreferencesPatch>,
    pub custom_notes: Option<String>,
}

impl PreferencesUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.check(
            self.study_hours_per_week.map_or(true, |h| (1..=168).contains(&h)),
            "studyHoursPerWeek",
            "Study hours per week must be between 1 and 168",
        )
        .check(
            self.target_completion_date
                .as_deref()
                .map_or(true, |d| parse_iso8601(d).is_some()),
            "targetCompletionDate",
            "Target completion date must be a valid date",
        )
        .max_len(
            self.custom_notes.as_deref(),
            2000,
            "customNotes",
            "Custom notes cannot exceed 2000 characters",
        );

        for (i, slot) in self.preferred_study_times.iter().flatten().enumerate() {
            v.one_of(
                &slot.day.to_lowercase(),
                WEEKDAYS,
                &format!("preferredStudyTimes[{i}].day"),
                "Day must be a day of the week",
            )
            .check(
                is_hh_mm(&slot.start_time) && is_hh_mm(&slot.end_time),
                &format!("preferredStudyTimes[{i}]"),
                "Study times must use HH:MM",
            );
        }

        if let Some(prefs) = &self.learning_preferences {
            if let Some(d) = &prefs.difficulty_preference {
                v.one_of(
                    d,
                    DIFFICULTY_PREFERENCES,
                    "learningPreferences.difficultyPreference",
                    "Difficulty preference must be easy, moderate, or challenging",
                );
            }
            if let Some(p) = &prefs.pace_preference {
                v.one_of(
                    p,
                    PACE_PREFERENCES,
                    "learningPreferences.pacePreference",
                    "Pace preference must be slow, moderate, or fast",
                );
            }
            for kind in prefs.preferred_resource_types.iter().flatten() {
                v.one_of(
                    kind,
                    RESOURCE_TYPES,
                    "learningPreferences.preferredResourceTypes",
                    "Unknown resource type",
                );
            }
        }
        v.finish()
    }

    /// Absent keys leave the stored value untouched.
    pub fn apply(self, progress: &mut UserProgress, now: DateTime<Utc>) {
        if let Some(hours) = self.study_hours_per_week {
            progress.study_hours_per_week = hours as i32;
        }
        if let Some(date) = self.target_completion_date.as_deref().and_then(parse_iso8601) {
            progress.target_completion_date = Some(date);
        }
        if let Some(times) = self.preferred_study_times {
            progress.preferred_study_times = Jsonb(
                times
                    .into_iter()
                    .map(|t| StudyTime {
                        day: t.day.to_lowercase(),
                        ..t
                    })
                    .collect(),
            );
        }
        if let Some(patch) = self.learning_preferences {
            let prefs = &mut progress.learning_preferences.0;
            if let Some(types) = patch.preferred_resource_types {
                prefs.preferred_resource_types = types;
            }
            if let Some(d) = patch.difficulty_preference {
                prefs.difficulty_preference = d;
            }
            if let Some(p) = patch.pace_preference {
                prefs.pace_preference = p;
            }
        }
        if let Some(notes) = self.custom_notes.filter(|n| !n.is_empty()) {
            progress.custom_notes = Some(notes);
        }
        progress.last_updated = now;
    }
}

/// PUT /api/progress/:roadmapId/preferences
pub async fn handle_preferences(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
    JsonBody(req): JsonBody<PreferencesUpdate>,
) -> Result<Json<Envelope<UserProgress>>, AppError> {
    req.validate()?;
    let mut progress = require_progress(&state.db, user.id, &roadmap_id).await?;
    req.apply(&mut progress, Utc::now());
    let progress = save_progress(&state.db, &progress).await?;
    Ok(envelope::ok_with_message("Preferences updated successfully", progress))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepWork {
    pub phase_id: String,
    pub step_id: String,
    #[serde(default)]
    pub time_spent: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLog {
    pub duration: f64,
    #[serde(default)]
    pub steps_worked_on: Vec<StepWork>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_time_spent: f64,
    pub session_count: u32,
    pub streak_days: u32,
}

impl SessionLog {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .check(
                (0.1..=24.0).contains(&self.duration),
                "duration",
                "Duration must be between 0.1 and 24 hours",
            )
            .max_len(self.notes.as_deref(), 500, "notes", "Notes cannot exceed 500 characters")
            .finish()
    }

    /// Counts the session and credits time to the named steps. Unknown steps
    /// are skipped.
    pub fn apply(&self, progress: &mut UserProgress, now: DateTime<Utc>) -> SessionSummary {
        progress.add_study_time(self.duration, now);
        for work in self.steps_worked_on.iter().filter(|w| w.time_spent > 0.0) {
            let step = progress
                .phases
                .0
                .iter_mut()
                .find(|p| p.phase_id == work.phase_id)
                .and_then(|p| p.steps.iter_mut().find(|s| s.step_id == work.step_id));
            if let Some(step) = step {
                step.time_spent += work.time_spent;
            }
        }
        let stats = &progress.stats;
        SessionSummary {
            total_time_spent: stats.total_time_spent,
            session_count: stats.study_sessions,
            streak_days: stats.streak_days,
        }
    }
}

/// POST /api/progress/:roadmapId/session
pub async fn handle_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
    JsonBody(req): JsonBody<SessionLog>,
) -> Result<Json<Envelope<SessionSummary>>, AppError> {
    req.validate()?;
    let mut progress = require_progress(&state.db, user.id, &roadmap_id).await?;
    let summary = req.apply(&mut progress, Utc::now());
    save_progress(&state.db, &progress).await?;
    Ok(envelope::ok_with_message("Study session logged successfully", summary))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub roadmap_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, FromRow)]
struct LeaderboardRow {
    user_id: Uuid,
    user_name: String,
    roadmap_title: Option<String>,
    roadmap_field: Option<String>,
    overall_progress: i32,
    time_spent: f64,
    completed_at: Option<DateTime<Utc>>,
    achievements: i32,
    streak_days: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user: Value,
    pub roadmap: Option<Value>,
    pub progress: i32,
    pub time_spent: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub achievements: i32,
    pub streak_days: i64,
}

/// GET /api/progress/meta/leaderboard
pub async fn handle_leaderboard(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Envelope<Vec<LeaderboardEntry>>>, AppError> {
    Validator::new()
        .check(
            query.limit.map_or(true, |l| (1..=50).contains(&l)),
            "limit",
            "Limit must be between 1 and 50",
        )
        .check(
            query.roadmap_id.as_deref().map_or(true, |id| !id.is_empty()),
            "roadmapId",
            "Invalid roadmap ID",
        )
        .finish()?;

    // Ties on progress go to less time spent, then to earlier completion.
    let rows: Vec<LeaderboardRow> = sqlx::query_as(
        r#"
        SELECT up.user_id,
               u.name AS user_name,
               r.title AS roadmap_title,
               r.field AS roadmap_field,
               up.overall_progress,
               COALESCE((up.stats->>'totalTimeSpent')::FLOAT8, 0) AS time_spent,
               up.completed_at,
               jsonb_array_length(up.achievements) AS achievements,
               COALESCE((up.stats->>'streakDays')::BIGINT, 0) AS streak_days
        FROM user_progress up
        JOIN users u ON u.id = up.user_id
        LEFT JOIN roadmaps r ON r.id = up.roadmap_object_id
        WHERE ($1::TEXT IS NULL OR up.roadmap_id = $1)
        ORDER BY up.overall_progress DESC, time_spent ASC, up.completed_at ASC NULLS LAST
        LIMIT $2
        "#,
    )
    .bind(&query.roadmap_id)
    .bind(query.limit.unwrap_or(10))
    .fetch_all(&state.db)
    .await?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            user: json!({ "name": row.user_name, "id": row.user_id }),
            roadmap: row
                .roadmap_title
                .map(|title| json!({ "title": title, "field": row.roadmap_field })),
            progress: row.overall_progress,
            time_spent: row.time_spent,
            completed_at: row.completed_at,
            achievements: row.achievements,
            streak_days: row.streak_days,
        })
        .collect();

    Ok(envelope::ok(entries))
}

/// GET /api/progress/:roadmapId/achievements
pub async fn handle_achievements(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Envelope<AchievementReport>>, AppError> {
    let progress = require_progress(&state.db, user.id, &roadmap_id).await?;
    Ok(envelope::ok(achievement_report(&progress.achievements)))
}
