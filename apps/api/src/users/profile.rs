//! In-memory edits to a user document. Handlers load the row, apply one of
//! these and write the row back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{CourseProgress, Goal, Skill, User, GOAL_PRIORITIES, GOAL_STATUSES};
use crate::validation::{parse_iso8601, Validator};

/// Average course length assumed when estimating study hours.
const HOURS_PER_COURSE: f64 = 10.0;

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .check(
                self.name.as_deref().map_or(true, |n| n.trim().chars().count() >= 2),
                "name",
                "Name must be at least 2 characters",
            )
            .max_len(self.name.as_deref().map(str::trim), 50, "name", "Name cannot exceed 50 characters")
            .max_len(self.bio.as_deref(), 500, "bio", "Bio cannot be more than 500 characters")
            .finish()
    }

    /// Only the whitelisted profile fields are ever touched.
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        let fields = [
            (self.bio, &mut user.bio),
            (self.location, &mut user.location),
            (self.phone, &mut user.phone),
            (self.linkedin, &mut user.linkedin),
            (self.github, &mut user.github),
            (self.website, &mut user.website),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SkillInput {
    #[serde(default)]
    pub name: String,
    pub level: i64,
    #[serde(default)]
    pub category: String,
}

impl SkillInput {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .require_non_empty(&self.name, "name", "Skill name is required")
            .check((0..=100).contains(&self.level), "level", "Skill level must be between 0 and 100")
            .require_non_empty(&self.category, "category", "Skill category is required")
            .finish()
    }
}

/// Updates the skill with the same name (case-insensitive) or appends a new one.
pub fn upsert_skill(skills: &mut Vec<Skill>, input: SkillInput) {
    let name = input.name.trim().to_string();
    let level = input.level.clamp(0, 100) as u8;
    match skills.iter_mut().find(|s| s.name.eq_ignore_ascii_case(&name)) {
        Some(skill) => {
            skill.level = level;
            skill.category = input.category;
        }
        None => skills.push(Skill {
            id: Uuid::new_v4(),
            name,
            level,
            category: input.category,
        }),
    }
}

pub fn remove_skill(skills: &mut Vec<Skill>, skill_id: Uuid) {
    skills.retain(|s| s.id != skill_id);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_date: String,
    pub priority: Option<String>,
}

impl NewGoal {
    pub fn into_goal(self, now: DateTime<Utc>) -> Result<Goal, AppError> {
        let target = parse_iso8601(&self.target_date);
        Validator::new()
            .require_non_empty(&self.title, "title", "Goal title is required")
            .require_non_empty(&self.description, "description", "Goal description is required")
            .check(target.is_some(), "targetDate", "Valid target date is required")
            .check(
                self.priority.as_deref().map_or(true, |p| GOAL_PRIORITIES.contains(&p)),
                "priority",
                "Priority must be low, medium, or high",
            )
            .finish()?;

        Ok(Goal {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            target_date: target.unwrap_or(now),
            status: "planned".to_string(),
            priority: self.priority.unwrap_or_else(|| "medium".to_string()),
            created_at: now,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl GoalUpdate {
    pub fn apply(self, goal: &mut Goal) -> Result<(), AppError> {
        let target = self.target_date.as_deref().map(parse_iso8601);
        Validator::new()
            .check(
                self.title.as_deref().map_or(true, |t| !t.trim().is_empty()),
                "title",
                "Goal title cannot be empty",
            )
            .check(
                self.description.as_deref().map_or(true, |d| !d.trim().is_empty()),
                "description",
                "Goal description cannot be empty",
            )
            .check(
                !matches!(target, Some(None)),
                "targetDate",
                "Valid target date is required",
            )
            .check(
                self.status.as_deref().map_or(true, |s| GOAL_STATUSES.contains(&s)),
                "status",
                "Status must be planned, in-progress, or completed",
            )
            .check(
                self.priority.as_deref().map_or(true, |p| GOAL_PRIORITIES.contains(&p)),
                "priority",
                "Priority must be low, medium, or high",
            )
            .finish()?;

        if let Some(title) = self.title {
            goal.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            goal.description = description.trim().to_string();
        }
        if let Some(Some(target)) = target {
            goal.target_date = target;
        }
        if let Some(status) = self.status {
            goal.status = status;
        }
        if let Some(priority) = self.priority {
            goal.priority = priority;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressInput {
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub course_name: String,
    pub progress_percent: i64,
}

impl CourseProgressInput {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .require_non_empty(&self.course_id, "courseId", "Course ID is required")
            .require_non_empty(&self.course_name, "courseName", "Course name is required")
            .check(
                (0..=100).contains(&self.progress_percent),
                "progressPercent",
                "Progress must be between 0 and 100",
            )
            .finish()
    }
}

/// Updates the entry for the course or starts a new one. Reaching 100%
/// stamps `completedAt`.
pub fn upsert_course_progress(
    progress: &mut Vec<CourseProgress>,
    input: CourseProgressInput,
    now: DateTime<Utc>,
) {
    let percent = input.progress_percent.clamp(0, 100) as u8;
    let completed_at = (percent == 100).then_some(now);
    match progress.iter_mut().find(|p| p.course_id == input.course_id) {
        Some(entry) => {
            entry.progress_percent = percent;
            entry.course_name = input.course_name;
            if completed_at.is_some() {
                entry.completed_at = completed_at;
            }
        }
        None => progress.push(CourseProgress {
            course_id: input.course_id,
            course_name: input.course_name,
            progress_percent: percent,
            completed_at,
            started_at: now,
        }),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_skills: usize,
    pub completed_goals: usize,
    pub total_goals: usize,
    pub completed_courses: usize,
    pub total_courses: usize,
    pub total_study_hours: f64,
    pub current_streak: u32,
}

/// `current_streak` comes from the user's roadmap progress records.
pub fn user_stats(user: &User, current_streak: u32) -> UserStats {
    UserStats {
        total_skills: user.skills.len(),
        completed_goals: user.goals.iter().filter(|g| g.status == "completed").count(),
        total_goals: user.goals.len(),
        completed_courses: user
            .course_progress
            .iter()
            .filter(|p| p.progress_percent == 100)
            .count(),
        total_courses: user.course_progress.len(),
        total_study_hours: user
            .course_progress
            .iter()
            .map(|p| f64::from(p.progress_percent) / 100.0 * HOURS_PER_COURSE)
            .sum(),
        current_streak,
    }
}
