use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::progress::{Achievement, PhaseProgress, StepProgress, UserProgress};
use crate::models::roadmap::{Phase, Roadmap};

const RECENT_ACTIVITY_DAYS: i64 = 7;
const RECENT_ACTIVITY_LIMIT: usize = 10;
const NEXT_STEPS_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_roadmaps: usize,
    pub completed_roadmaps: usize,
    pub in_progress_roadmaps: usize,
    pub not_started_roadmaps: usize,
    pub total_time_spent: f64,
    pub average_progress: i32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_achievements: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub roadmap_id: String,
    pub roadmap_title: Option<String>,
    pub step_id: String,
    pub step_title: String,
    pub completed_at: DateTime<Utc>,
    pub time_spent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingStep {
    pub roadmap_id: String,
    pub roadmap_title: Option<String>,
    pub phase_id: String,
    pub phase_title: String,
    pub step_id: String,
    pub step_title: String,
    pub estimated_completion: DateTime<Utc>,
}

/// A progress row paired with the roadmap it tracks, when that still exists.
pub type Tracked<'a> = (&'a UserProgress, Option<&'a Roadmap>);

fn phase_title(roadmap: Option<&Roadmap>, phase_id: &str) -> String {
    find_phase(roadmap, phase_id)
        .map(|p| p.title.clone())
        .unwrap_or_else(|| phase_id.to_string())
}

fn step_title(roadmap: Option<&Roadmap>, phase_id: &str, step_id: &str) -> String {
    find_phase(roadmap, phase_id)
        .and_then(|p| p.steps.iter().find(|s| s.id == step_id))
        .map(|s| s.title.clone())
        .unwrap_or_else(|| step_id.to_string())
}

fn find_phase<'a>(roadmap: Option<&'a Roadmap>, phase_id: &str) -> Option<&'a Phase> {
    roadmap.and_then(|r| r.phases.iter().find(|p| p.id == phase_id))
}

pub fn dashboard_stats(records: &[UserProgress]) -> DashboardStats {
    let total = records.len();
    let average_progress = if total == 0 {
        0
    } else {
        let sum: i64 = records.iter().map(|p| i64::from(p.overall_progress)).sum();
        (sum as f64 / total as f64).round() as i32
    };

    DashboardStats {
        total_roadmaps: total,
        completed_roadmaps: records.iter().filter(|p| p.completed_at.is_some()).count(),
        in_progress_roadmaps: records
            .iter()
            .filter(|p| p.completed_at.is_none() && p.overall_progress > 0)
            .count(),
        not_started_roadmaps: records.iter().filter(|p| p.overall_progress == 0).count(),
        total_time_spent: records.iter().map(|p| p.stats.total_time_spent).sum(),
        average_progress,
        current_streak: records.iter().map(|p| p.stats.streak_days).max().unwrap_or(0),
        longest_streak: records.iter().map(|p| p.stats.longest_streak).max().unwrap_or(0),
        total_achievements: records.iter().map(|p| p.achievements.len()).sum(),
    }
}

/// Steps completed in the last week, newest first.
pub fn recent_activity(tracked: &[Tracked<'_>], now: DateTime<Utc>) -> Vec<Activity> {
    let since = now - Duration::days(RECENT_ACTIVITY_DAYS);
    let mut activity: Vec<Activity> = tracked
        .iter()
        .flat_map(|(progress, roadmap)| {
            progress.phases.iter().flat_map(move |phase| {
                phase.steps.iter().filter_map(move |step| {
                    let completed_at = step.completed_at.filter(|at| *at >= since)?;
                    Some(Activity {
                        kind: "step_completed",
                        roadmap_id: progress.roadmap_id.clone(),
                        roadmap_title: roadmap.map(|r| r.title.clone()),
                        step_id: step.step_id.clone(),
                        step_title: step_title(*roadmap, &phase.phase_id, &step.step_id),
                        completed_at,
                        time_spent: step.time_spent,
                    })
                })
            })
        })
        .collect();

    activity.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    activity.truncate(RECENT_ACTIVITY_LIMIT);
    activity
}

/// First open step of the first open phase, for each unfinished roadmap.
pub fn upcoming_steps(tracked: &[Tracked<'_>], now: DateTime<Utc>) -> Vec<UpcomingStep> {
    tracked
        .iter()
        .filter(|(progress, _)| progress.completed_at.is_none())
        .filter_map(|(progress, roadmap)| {
            let phase = progress.phases.iter().find(|p| p.completed_at.is_none())?;
            let step = phase.steps.iter().find(|s| !s.completed)?;
            Some(UpcomingStep {
                roadmap_id: progress.roadmap_id.clone(),
                roadmap_title: roadmap.map(|r| r.title.clone()),
                phase_id: phase.phase_id.clone(),
                phase_title: phase_title(*roadmap, &phase.phase_id),
                step_id: step.step_id.clone(),
                step_title: step_title(*roadmap, &phase.phase_id, &step.step_id),
                estimated_completion: progress.estimated_completion(now),
            })
        })
        .take(NEXT_STEPS_LIMIT)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    pub overall_progress: i32,
    pub total_phases: usize,
    pub completed_phases: usize,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub time_spent: f64,
    /// Hours, extrapolated from the time already spent per completed step.
    pub estimated_time_remaining: i64,
    pub average_step_rating: f64,
    pub study_streak_days: u32,
    pub longest_streak: u32,
    pub estimated_completion_date: DateTime<Utc>,
    pub achievements: Vec<Achievement>,
}

pub fn detailed_stats(
    progress: &UserProgress,
    roadmap: Option<&Roadmap>,
    now: DateTime<Utc>,
) -> DetailedStats {
    DetailedStats {
        overall_progress: progress.overall_progress,
        total_phases: progress.phases.len(),
        completed_phases: progress
            .phases
            .iter()
            .filter(|p| p.completed_at.is_some())
            .count(),
        total_steps: progress.total_steps(),
        completed_steps: progress.completed_steps(),
        time_spent: progress.stats.total_time_spent,
        estimated_time_remaining: estimated_time_remaining(progress, roadmap),
        average_step_rating: average_step_rating(progress),
        study_streak_days: progress.stats.streak_days,
        longest_streak: progress.stats.longest_streak,
        estimated_completion_date: progress.estimated_completion(now),
        achievements: progress.achievements.0.clone(),
    }
}

fn estimated_time_remaining(progress: &UserProgress, roadmap: Option<&Roadmap>) -> i64 {
    let Some(roadmap) = roadmap else {
        return 0;
    };
    if progress.completed_at.is_some() {
        return 0;
    }
    let completed = progress.completed_steps();
    let total: usize = roadmap.phases.iter().map(|p| p.steps.len()).sum();
    let remaining = total.saturating_sub(completed);
    let per_step = progress.stats.total_time_spent / completed.max(1) as f64;
    (remaining as f64 * per_step).round() as i64
}

/// Mean of the rated steps, one decimal. Zero when nothing is rated.
pub fn average_step_rating(progress: &UserProgress) -> f64 {
    let ratings: Vec<f64> = progress
        .phases
        .iter()
        .flat_map(|p| p.steps.iter())
        .filter_map(|s| s.rating)
        .map(f64::from)
        .collect();
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseBreakdown {
    pub phase_id: String,
    pub title: String,
    pub progress: u8,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub time_spent: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepProgress>,
}

pub fn phase_breakdown(progress: &UserProgress, roadmap: Option<&Roadmap>) -> Vec<PhaseBreakdown> {
    progress
        .phases
        .iter()
        .map(|phase: &PhaseProgress| {
            let completed = phase.steps.iter().filter(|s| s.completed).count();
            let total = phase.steps.len();
            PhaseBreakdown {
                phase_id: phase.phase_id.clone(),
                title: phase_title(roadmap, &phase.phase_id),
                progress: if total == 0 {
                    0
                } else {
                    ((completed as f64 / total as f64) * 100.0).round() as u8
                },
                completed_steps: completed,
                total_steps: total,
                time_spent: phase.steps.iter().map(|s| s.time_spent).sum(),
                started_at: phase.started_at,
                completed_at: phase.completed_at,
                steps: phase.steps.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roadmap::{Metadata, Overview};
    use crate::progress::tracker::tests::{roadmap_phases, seeded};
    use crate::progress::tracker::StepCompletion;
    use chrono::TimeZone;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()
    }

    fn roadmap(progress: &UserProgress) -> Roadmap {
        Roadmap {
            id: progress.roadmap_object_id,
            user_id: progress.user_id,
            roadmap_id: progress.roadmap_id.clone(),
            title: "Web Development Career Path - Beginner Level".to_string(),
            field: "Web Development".to_string(),
            level: "Beginner".to_string(),
            overview: Json(Overview {
                description: "Learn the web".to_string(),
                duration: "3 months".to_string(),
                difficulty: 2,
                outcomes: vec![],
            }),
            phases: Json(roadmap_phases()),
            connections: Json(vec![]),
            metadata: Json(Metadata {
                created_at: at(1),
                ai_model: "GPT-4".to_string(),
                version: "1.0".to_string(),
                tags: vec![],
                industry: None,
                salary_range: None,
            }),
            documentation: String::new(),
            status: "completed".to_string(),
            is_public: false,
            rating_average: 0.0,
            rating_count: 0,
            workflow_id: None,
            helpful_count: 0,
            view_count: 0,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    #[test]
    fn test_dashboard_stats_buckets() {
        let mut fresh = seeded(at(1));
        fresh.id = Uuid::new_v4();
        let mut halfway = seeded(at(1));
        halfway
            .complete_step("p1", "s1", StepCompletion { time_spent: Some(2.0), ..Default::default() }, at(2))
            .unwrap();
        halfway
            .complete_step("p1", "s2", StepCompletion { time_spent: Some(1.0), ..Default::default() }, at(3))
            .unwrap();

        let stats = dashboard_stats(&[fresh, halfway]);
        assert_eq!(stats.total_roadmaps, 2);
        assert_eq!(stats.completed_roadmaps, 0);
        assert_eq!(stats.in_progress_roadmaps, 1);
        assert_eq!(stats.not_started_roadmaps, 1);
        assert_eq!(stats.total_time_spent, 3.0);
        assert_eq!(stats.average_progress, 25);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.total_achievements, 2);
    }

    #[test]
    fn test_dashboard_stats_empty() {
        let stats = dashboard_stats(&[]);
        assert_eq!(stats.average_progress, 0);
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn test_recent_activity_window_and_order() {
        let mut progress = seeded(at(1));
        progress.complete_step("p1", "s1", StepCompletion::default(), at(1)).unwrap();
        progress.complete_step("p1", "s2", StepCompletion::default(), at(9)).unwrap();
        progress.complete_step("p2", "s3", StepCompletion::default(), at(10)).unwrap();
        let map = roadmap(&progress);

        let activity = recent_activity(&[(&progress, Some(&map))], at(12));
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].step_id, "s3");
        assert_eq!(activity[0].step_title, "Step s3");
        assert_eq!(activity[1].step_id, "s2");
        assert_eq!(
            activity[0].roadmap_title.as_deref(),
            Some("Web Development Career Path - Beginner Level")
        );
    }

    #[test]
    fn test_upcoming_steps_skip_finished_phases() {
        let mut progress = seeded(at(1));
        progress.complete_step("p1", "s1", StepCompletion::default(), at(1)).unwrap();
        progress.complete_step("p1", "s2", StepCompletion::default(), at(2)).unwrap();
        let map = roadmap(&progress);

        let upcoming = upcoming_steps(&[(&progress, Some(&map))], at(3));
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].phase_id, "p2");
        assert_eq!(upcoming[0].phase_title, "Projects");
        assert_eq!(upcoming[0].step_id, "s3");

        // without the roadmap the ids stand in for titles
        let upcoming = upcoming_steps(&[(&progress, None)], at(3));
        assert_eq!(upcoming[0].step_title, "s3");
    }

    #[test]
    fn test_detailed_stats_extrapolates_remaining_time() {
        let mut progress = seeded(at(1));
        progress
            .complete_step("p1", "s1", StepCompletion { time_spent: Some(3.0), rating: Some(4), notes: None }, at(1))
            .unwrap();
        progress
            .complete_step("p1", "s2", StepCompletion { time_spent: Some(2.0), rating: Some(5), notes: None }, at(1))
            .unwrap();
        let map = roadmap(&progress);

        let stats = detailed_stats(&progress, Some(&map), at(1));
        assert_eq!(stats.completed_steps, 2);
        assert_eq!(stats.completed_phases, 1);
        // 2 remaining * 2.5h
        assert_eq!(stats.estimated_time_remaining, 5);
        assert_eq!(stats.average_step_rating, 4.5);
        assert_eq!(detailed_stats(&progress, None, at(1)).estimated_time_remaining, 0);
    }

    #[test]
    fn test_average_step_rating_rounds_to_one_decimal() {
        let mut progress = seeded(at(1));
        progress.rate_step("p1", "s1", 5, at(1)).unwrap();
        progress.rate_step("p1", "s2", 4, at(1)).unwrap();
        progress.rate_step("p2", "s3", 4, at(1)).unwrap();
        assert_eq!(average_step_rating(&progress), 4.3);
    }

    #[test]
    fn test_phase_breakdown() {
        let mut progress = seeded(at(1));
        progress
            .complete_step("p2", "s4", StepCompletion { time_spent: Some(1.5), ..Default::default() }, at(1))
            .unwrap();
        let map = roadmap(&progress);
        let breakdown = phase_breakdown(&progress, Some(&map));
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].title, "Foundations");
        assert_eq!(breakdown[0].progress, 0);
        assert_eq!(breakdown[1].progress, 50);
        assert_eq!(breakdown[1].time_spent, 1.5);
        assert!(breakdown[1].started_at.is_some());
    }
}
