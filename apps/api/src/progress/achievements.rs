use serde::Serialize;

use crate::models::progress::{Achievement, AchievementKind};

/// Catalogue order is the order shown to users.
pub const ALL_ACHIEVEMENTS: &[AchievementKind] = &[
    AchievementKind::FirstStep,
    AchievementKind::FirstPhase,
    AchievementKind::FirstProject,
    AchievementKind::Streak7Days,
    AchievementKind::Streak30Days,
    AchievementKind::FastLearner,
    AchievementKind::ConsistentLearner,
    AchievementKind::RoadmapCompleted,
];

impl AchievementKind {
    pub fn title(&self) -> &'static str {
        match self {
            AchievementKind::FirstStep => "First Step Complete!",
            AchievementKind::FirstPhase => "Phase Master!",
            AchievementKind::FirstProject => "Project Builder!",
            AchievementKind::Streak7Days => "Week Warrior!",
            AchievementKind::Streak30Days => "Monthly Master!",
            AchievementKind::FastLearner => "Fast Learner!",
            AchievementKind::ConsistentLearner => "Consistent Learner!",
            AchievementKind::RoadmapCompleted => "Roadmap Conqueror!",
        }
    }

    /// What the user has to do, as shown in the catalogue.
    pub fn goal(&self) -> &'static str {
        match self {
            AchievementKind::FirstStep => "Complete your first learning step",
            AchievementKind::FirstPhase => "Complete your first learning phase",
            AchievementKind::FirstProject => "Complete your first project",
            AchievementKind::Streak7Days => "Study for 7 consecutive days",
            AchievementKind::Streak30Days => "Study for 30 consecutive days",
            AchievementKind::FastLearner => "Complete steps faster than average",
            AchievementKind::ConsistentLearner => "Maintain regular study schedule",
            AchievementKind::RoadmapCompleted => "Complete the entire roadmap",
        }
    }

    /// What the user did, as stored on the unlocked achievement.
    pub fn accomplishment(&self) -> &'static str {
        match self {
            AchievementKind::FirstStep => "You completed your first learning step",
            AchievementKind::FirstPhase => "You completed your first learning phase",
            AchievementKind::FirstProject => "You completed your first project",
            AchievementKind::Streak7Days => "You studied for 7 consecutive days",
            AchievementKind::Streak30Days => "You studied for 30 consecutive days",
            AchievementKind::FastLearner => "You completed steps faster than average",
            AchievementKind::ConsistentLearner => "You kept a regular study schedule",
            AchievementKind::RoadmapCompleted => "You completed the entire roadmap",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub title: &'static str,
    pub description: &'static str,
    pub earned: bool,
    pub earned_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementReport {
    pub achievements: Vec<AchievementStatus>,
    pub total_earned: usize,
    pub total_possible: usize,
}

/// Full catalogue with the user's unlocks marked.
pub fn achievement_report(earned: &[Achievement]) -> AchievementReport {
    let achievements = ALL_ACHIEVEMENTS
        .iter()
        .map(|kind| {
            let unlocked = earned.iter().find(|a| a.kind == *kind);
            AchievementStatus {
                kind: *kind,
                title: kind.title(),
                description: kind.goal(),
                earned: unlocked.is_some(),
                earned_at: unlocked.map(|a| a.achieved_at),
            }
        })
        .collect();

    AchievementReport {
        achievements,
        total_earned: earned.len(),
        total_possible: ALL_ACHIEVEMENTS.len(),
    }
}
