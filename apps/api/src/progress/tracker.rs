//! Progress aggregator.
//!
//! Every mutation here is pure arithmetic over a `UserProgress` already in
//! memory. Callers load the row, apply one operation with an explicit `now`,
//! and write the row back. Percentages, streak counters and achievement
//! unlocks are recomputed in place.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::errors::AppError;
use crate::models::progress::{
    Achievement, AchievementKind, PhaseProgress, RoadmapRating, StepProgress, UserProgress,
};
use crate::models::roadmap::Phase;

/// Planning assumption used for completion estimates.
pub const HOURS_PER_STEP: f64 = 2.0;

#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("Phase not found")]
    PhaseNotFound,
    #[error("Step not found")]
    StepNotFound,
    #[error("Rating must be between 1 and 5")]
    InvalidRating,
}

impl From<ProgressError> for AppError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::PhaseNotFound | ProgressError::StepNotFound => {
                AppError::NotFound(e.to_string())
            }
            ProgressError::InvalidRating => AppError::Validation(e.to_string()),
        }
    }
}

/// Optional details recorded alongside a completed step.
#[derive(Debug, Clone, Default)]
pub struct StepCompletion {
    /// Hours.
    pub time_spent: Option<f64>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

fn check_rating(rating: u8) -> Result<u8, ProgressError> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(ProgressError::InvalidRating)
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}

impl UserProgress {
    /// Mirrors the roadmap's phase/step tree with nothing completed.
    pub fn seed_phases(&mut self, phases: &[Phase]) {
        self.phases.0 = phases
            .iter()
            .map(|phase| PhaseProgress {
                phase_id: phase.id.clone(),
                steps: phase
                    .steps
                    .iter()
                    .map(|step| StepProgress {
                        step_id: step.id.clone(),
                        ..StepProgress::default()
                    })
                    .collect(),
                ..PhaseProgress::default()
            })
            .collect();
        self.recalculate();
    }

    pub fn total_steps(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }

    pub fn completed_steps(&self) -> usize {
        self.phases
            .iter()
            .flat_map(|p| p.steps.iter())
            .filter(|s| s.completed)
            .count()
    }

    /// Recomputes the overall and per-phase percentages. Phases without
    /// steps keep whatever value they had.
    pub fn recalculate(&mut self) {
        for phase in self.phases.iter_mut() {
            if phase.steps.is_empty() {
                continue;
            }
            let done = phase.steps.iter().filter(|s| s.completed).count();
            phase.overall_progress = percent(done, phase.steps.len());
        }
        self.overall_progress = i32::from(percent(self.completed_steps(), self.total_steps()));
    }

    /// Advances the daily streak. Days are UTC calendar days.
    pub fn record_study_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        let stats = &mut self.stats.0;
        match stats.last_study_date {
            None => stats.streak_days = 1,
            Some(last) => match (today - last).num_days() {
                1 => stats.streak_days += 1,
                d if d > 1 => stats.streak_days = 1,
                // same day, or a clock that went backwards
                _ => return,
            },
        }
        stats.last_study_date = Some(today);
        stats.longest_streak = stats.longest_streak.max(stats.streak_days);
    }

    /// Logs a study session of `hours`.
    pub fn add_study_time(&mut self, hours: f64, now: DateTime<Utc>) {
        let stats = &mut self.stats.0;
        stats.total_time_spent += hours;
        stats.study_sessions += 1;
        stats.average_session_time = stats.total_time_spent / f64::from(stats.study_sessions);
        self.record_study_day(now);
        self.last_updated = now;
    }

    fn locate(&self, phase_id: &str, step_id: &str) -> Result<(usize, usize), ProgressError> {
        let p = self
            .phases
            .iter()
            .position(|p| p.phase_id == phase_id)
            .ok_or(ProgressError::PhaseNotFound)?;
        let s = self.phases[p]
            .steps
            .iter()
            .position(|s| s.step_id == step_id)
            .ok_or(ProgressError::StepNotFound)?;
        Ok((p, s))
    }

    /// Marks a step done and returns any achievements unlocked by it.
    pub fn complete_step(
        &mut self,
        phase_id: &str,
        step_id: &str,
        details: StepCompletion,
        now: DateTime<Utc>,
    ) -> Result<Vec<Achievement>, ProgressError> {
        let rating = details.rating.map(check_rating).transpose()?;
        let (p, s) = self.locate(phase_id, step_id)?;
        let logged = details.time_spent.filter(|h| *h > 0.0);

        let phase = &mut self.phases.0[p];
        let step = &mut phase.steps[s];
        step.completed = true;
        step.completed_at = Some(now);
        if let Some(hours) = logged {
            step.time_spent += hours;
        }
        if rating.is_some() {
            step.rating = rating;
        }
        if details.notes.is_some() {
            step.notes = details.notes;
        }

        if phase.started_at.is_none() {
            phase.started_at = Some(now);
        }
        if phase.steps.iter().all(|s| s.completed) {
            phase.completed_at = Some(now);
        }

        // Time spent on a step counts as a study session.
        if let Some(hours) = logged {
            self.add_study_time(hours, now);
        }
        self.record_study_day(now);
        self.recalculate();

        let total = self.total_steps();
        if total > 0 && self.completed_steps() == total && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.last_updated = now;

        Ok(self.check_achievements(now))
    }

    pub fn uncomplete_step(
        &mut self,
        phase_id: &str,
        step_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        let (p, s) = self.locate(phase_id, step_id)?;
        let phase = &mut self.phases.0[p];
        let step = &mut phase.steps[s];
        step.completed = false;
        step.completed_at = None;
        phase.completed_at = None;
        self.completed_at = None;
        self.recalculate();
        self.last_updated = now;
        Ok(())
    }

    pub fn set_step_notes(
        &mut self,
        phase_id: &str,
        step_id: &str,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        let (p, s) = self.locate(phase_id, step_id)?;
        self.phases.0[p].steps[s].notes = Some(notes);
        self.last_updated = now;
        Ok(())
    }

    pub fn rate_step(
        &mut self,
        phase_id: &str,
        step_id: &str,
        rating: u8,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        let rating = check_rating(rating)?;
        let (p, s) = self.locate(phase_id, step_id)?;
        self.phases.0[p].steps[s].rating = Some(rating);
        self.last_updated = now;
        Ok(())
    }

    fn has_achievement(&self, kind: AchievementKind) -> bool {
        self.achievements.iter().any(|a| a.kind == kind)
    }

    /// Awards every achievement whose rule now holds and that the user does
    /// not have yet. Returns the new ones.
    pub fn check_achievements(&mut self, now: DateTime<Utc>) -> Vec<Achievement> {
        let stats = &self.stats.0;
        let rules = [
            (AchievementKind::FirstStep, self.completed_steps() >= 1),
            (
                AchievementKind::FirstPhase,
                self.phases.iter().any(|p| p.completed_at.is_some()),
            ),
            (AchievementKind::Streak7Days, stats.streak_days >= 7),
            (AchievementKind::Streak30Days, stats.streak_days >= 30),
            (AchievementKind::RoadmapCompleted, self.completed_at.is_some()),
        ];

        let unlocked: Vec<Achievement> = rules
            .into_iter()
            .filter(|(kind, holds)| *holds && !self.has_achievement(*kind))
            .map(|(kind, _)| Achievement {
                kind,
                achieved_at: now,
                title: kind.title().to_string(),
                description: kind.accomplishment().to_string(),
            })
            .collect();

        self.achievements.0.extend(unlocked.iter().cloned());
        unlocked
    }

    pub fn rate_roadmap(
        &mut self,
        rating: u8,
        feedback: String,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        let rating = check_rating(rating)?;
        self.roadmap_rating = Some(sqlx::types::Json(RoadmapRating {
            rating,
            feedback,
            rated_at: now,
        }));
        self.last_updated = now;
        Ok(())
    }

    /// Projected finish date at the configured weekly study hours, rounded
    /// up to whole weeks. A finished ledger reports when it finished.
    pub fn estimated_completion(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(completed_at) = self.completed_at {
            return completed_at;
        }
        let remaining = self.total_steps() - self.completed_steps();
        let hours = remaining as f64 * HOURS_PER_STEP;
        let per_week = f64::from(self.study_hours_per_week.max(1));
        let weeks = (hours / per_week).ceil() as i64;
        now + Duration::days(weeks * 7)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::roadmap::Step;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn step(id: &str) -> Step {
        Step {
            id: id.to_string(),
            title: format!("Step {id}"),
            description: "Practice".to_string(),
            kind: "practice".to_string(),
            duration: "1 week".to_string(),
            order: 1,
            difficulty: 2,
            skills: vec![],
            prerequisites: vec![],
            resources: vec![],
            projects: vec![],
            milestones: vec![],
        }
    }

    pub(crate) fn roadmap_phases() -> Vec<Phase> {
        vec![
            Phase {
                id: "p1".to_string(),
                title: "Foundations".to_string(),
                description: "Basics".to_string(),
                duration: "2 weeks".to_string(),
                order: 1,
                color: Some("#2563EB".to_string()),
                steps: vec![step("s1"), step("s2")],
            },
            Phase {
                id: "p2".to_string(),
                title: "Projects".to_string(),
                description: "Build things".to_string(),
                duration: "3 weeks".to_string(),
                order: 2,
                color: None,
                steps: vec![step("s3"), step("s4")],
            },
        ]
    }

    pub(crate) fn seeded(now: DateTime<Utc>) -> UserProgress {
        let mut progress = UserProgress::new(Uuid::new_v4(), "web-development-beginner-1", Uuid::new_v4(), now);
        progress.seed_phases(&roadmap_phases());
        progress
    }

    #[test]
    fn test_seed_mirrors_phase_tree() {
        let progress = seeded(at(2026, 1, 1, 9));
        assert_eq!(progress.phases.len(), 2);
        assert_eq!(progress.total_steps(), 4);
        assert_eq!(progress.completed_steps(), 0);
        assert_eq!(progress.overall_progress, 0);
        assert!(progress.phases[0].steps.iter().all(|s| !s.completed && s.time_spent == 0.0));
    }

    #[test]
    fn test_recalculate_with_no_steps_is_zero() {
        let mut progress = UserProgress::new(Uuid::new_v4(), "r", Uuid::new_v4(), at(2026, 1, 1, 9));
        progress.phases.0.push(PhaseProgress {
            phase_id: "empty".to_string(),
            overall_progress: 40,
            ..PhaseProgress::default()
        });
        progress.recalculate();
        assert_eq!(progress.overall_progress, 0);
        // phases without steps are left alone
        assert_eq!(progress.phases[0].overall_progress, 40);
    }

    #[test]
    fn test_complete_step_updates_percentages() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        progress
            .complete_step("p1", "s1", StepCompletion::default(), now)
            .unwrap();
        assert_eq!(progress.overall_progress, 25);
        assert_eq!(progress.phases[0].overall_progress, 50);
        assert_eq!(progress.phases[1].overall_progress, 0);
        assert_eq!(progress.phases[0].started_at, Some(now));
        assert!(progress.phases[0].completed_at.is_none());
    }

    #[test]
    fn test_overall_progress_rounds() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        progress.phases.0[1].steps.push(StepProgress {
            step_id: "s5".to_string(),
            ..StepProgress::default()
        });
        progress
            .complete_step("p1", "s1", StepCompletion::default(), now)
            .unwrap();
        // 1 of 5
        assert_eq!(progress.overall_progress, 20);
        progress
            .complete_step("p2", "s5", StepCompletion::default(), now)
            .unwrap();
        // 1 of 3 in phase two
        assert_eq!(progress.phases[1].overall_progress, 33);
    }

    #[test]
    fn test_complete_step_records_details() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        progress
            .complete_step(
                "p1",
                "s2",
                StepCompletion {
                    time_spent: Some(1.5),
                    rating: Some(4),
                    notes: Some("Read the book twice".to_string()),
                },
                now,
            )
            .unwrap();
        let step = &progress.phases[0].steps[1];
        assert!(step.completed);
        assert_eq!(step.completed_at, Some(now));
        assert_eq!(step.time_spent, 1.5);
        assert_eq!(step.rating, Some(4));
        assert_eq!(step.notes.as_deref(), Some("Read the book twice"));
        assert_eq!(progress.stats.total_time_spent, 1.5);
        assert_eq!(progress.stats.study_sessions, 1);
        assert_eq!(progress.stats.average_session_time, 1.5);
    }

    #[test]
    fn test_step_time_keeps_session_average_current() {
        let mut progress = seeded(at(2026, 1, 1, 9));
        progress.add_study_time(3.0, at(2026, 1, 1, 9));
        progress
            .complete_step(
                "p1",
                "s1",
                StepCompletion {
                    time_spent: Some(1.0),
                    ..StepCompletion::default()
                },
                at(2026, 1, 2, 9),
            )
            .unwrap();
        assert_eq!(progress.stats.study_sessions, 2);
        assert_eq!(progress.stats.total_time_spent, 4.0);
        assert_eq!(progress.stats.average_session_time, 2.0);
        assert_eq!(progress.stats.streak_days, 2);

        // No time logged, no session.
        progress
            .complete_step("p1", "s2", StepCompletion::default(), at(2026, 1, 2, 10))
            .unwrap();
        assert_eq!(progress.stats.study_sessions, 2);
    }

    #[test]
    fn test_complete_step_rejects_bad_rating_before_mutating() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        let err = progress
            .complete_step(
                "p1",
                "s1",
                StepCompletion {
                    rating: Some(6),
                    ..StepCompletion::default()
                },
                now,
            )
            .unwrap_err();
        assert_eq!(err, ProgressError::InvalidRating);
        assert_eq!(progress.completed_steps(), 0);
    }

    #[test]
    fn test_unknown_phase_and_step() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        assert_eq!(
            progress
                .complete_step("nope", "s1", StepCompletion::default(), now)
                .unwrap_err(),
            ProgressError::PhaseNotFound
        );
        assert_eq!(
            progress.uncomplete_step("p1", "s9", now).unwrap_err(),
            ProgressError::StepNotFound
        );
    }

    #[test]
    fn test_finishing_every_step_completes_roadmap() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        for (phase, step) in [("p1", "s1"), ("p1", "s2"), ("p2", "s3")] {
            progress
                .complete_step(phase, step, StepCompletion::default(), now)
                .unwrap();
        }
        assert!(progress.phases[0].completed_at.is_some());
        assert!(progress.completed_at.is_none());

        let later = at(2026, 1, 2, 9);
        let unlocked = progress
            .complete_step("p2", "s4", StepCompletion::default(), later)
            .unwrap();
        assert_eq!(progress.overall_progress, 100);
        assert_eq!(progress.completed_at, Some(later));
        assert!(unlocked
            .iter()
            .any(|a| a.kind == AchievementKind::RoadmapCompleted));
    }

    #[test]
    fn test_uncomplete_clears_completion_dates() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        for (phase, step) in [("p1", "s1"), ("p1", "s2"), ("p2", "s3"), ("p2", "s4")] {
            progress
                .complete_step(phase, step, StepCompletion::default(), now)
                .unwrap();
        }
        progress.uncomplete_step("p1", "s2", now).unwrap();
        assert!(!progress.phases[0].steps[1].completed);
        assert!(progress.phases[0].completed_at.is_none());
        assert!(progress.completed_at.is_none());
        assert_eq!(progress.overall_progress, 75);
        // the phase was started and stays started
        assert!(progress.phases[0].started_at.is_some());
    }

    #[test]
    fn test_streak_transitions() {
        let mut progress = seeded(at(2026, 1, 1, 9));

        progress.record_study_day(at(2026, 1, 1, 9));
        assert_eq!(progress.stats.streak_days, 1);

        // same day again
        progress.record_study_day(at(2026, 1, 1, 23));
        assert_eq!(progress.stats.streak_days, 1);

        progress.record_study_day(at(2026, 1, 2, 0));
        progress.record_study_day(at(2026, 1, 3, 12));
        assert_eq!(progress.stats.streak_days, 3);
        assert_eq!(progress.stats.longest_streak, 3);

        // gap resets, longest survives
        progress.record_study_day(at(2026, 1, 6, 8));
        assert_eq!(progress.stats.streak_days, 1);
        assert_eq!(progress.stats.longest_streak, 3);
        assert_eq!(
            progress.stats.last_study_date,
            Some(at(2026, 1, 6, 8).date_naive())
        );
    }

    #[test]
    fn test_streak_ignores_earlier_dates() {
        let mut progress = seeded(at(2026, 1, 1, 9));
        progress.record_study_day(at(2026, 1, 5, 9));
        progress.record_study_day(at(2026, 1, 4, 9));
        assert_eq!(progress.stats.streak_days, 1);
        assert_eq!(
            progress.stats.last_study_date,
            Some(at(2026, 1, 5, 9).date_naive())
        );
    }

    #[test]
    fn test_study_sessions_average() {
        let mut progress = seeded(at(2026, 1, 1, 9));
        progress.add_study_time(2.0, at(2026, 1, 1, 9));
        progress.add_study_time(1.0, at(2026, 1, 2, 9));
        assert_eq!(progress.stats.study_sessions, 2);
        assert_eq!(progress.stats.total_time_spent, 3.0);
        assert_eq!(progress.stats.average_session_time, 1.5);
        assert_eq!(progress.stats.streak_days, 2);
    }

    #[test]
    fn test_achievements_awarded_once() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        let first = progress
            .complete_step("p1", "s1", StepCompletion::default(), now)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, AchievementKind::FirstStep);
        assert_eq!(first[0].description, "You completed your first learning step");

        let second = progress
            .complete_step("p1", "s2", StepCompletion::default(), now)
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind, AchievementKind::FirstPhase);
        assert_eq!(progress.achievements.len(), 2);

        assert!(progress.check_achievements(now).is_empty());
    }

    #[test]
    fn test_streak_achievements() {
        let mut progress = seeded(at(2026, 1, 1, 9));
        for day in 1..=7 {
            progress.record_study_day(at(2026, 1, day, 9));
        }
        let unlocked = progress.check_achievements(at(2026, 1, 7, 9));
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].kind, AchievementKind::Streak7Days);

        for day in 8..=30 {
            progress.record_study_day(at(2026, 1, day, 9));
        }
        let unlocked = progress.check_achievements(at(2026, 1, 30, 9));
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].kind, AchievementKind::Streak30Days);
        assert_eq!(progress.stats.longest_streak, 30);
    }

    #[test]
    fn test_rate_step_and_notes() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        progress.rate_step("p2", "s3", 5, now).unwrap();
        progress
            .set_step_notes("p2", "s3", "Good exercises".to_string(), now)
            .unwrap();
        assert_eq!(progress.phases[1].steps[0].rating, Some(5));
        assert_eq!(
            progress.phases[1].steps[0].notes.as_deref(),
            Some("Good exercises")
        );
        assert_eq!(
            progress.rate_step("p2", "s3", 0, now).unwrap_err(),
            ProgressError::InvalidRating
        );
    }

    #[test]
    fn test_rate_roadmap() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        progress
            .rate_roadmap(4, "Solid plan".to_string(), now)
            .unwrap();
        let rating = progress.roadmap_rating.as_ref().unwrap();
        assert_eq!(rating.rating, 4);
        assert_eq!(rating.rated_at, now);
        assert!(progress.rate_roadmap(9, String::new(), now).is_err());
    }

    #[test]
    fn test_estimated_completion_rounds_up_to_weeks() {
        let now = at(2026, 1, 1, 9);
        let mut progress = seeded(now);
        // 4 steps * 2h = 8h at 10h/week -> one week
        assert_eq!(progress.estimated_completion(now), now + Duration::days(7));

        progress.study_hours_per_week = 3;
        // 8h at 3h/week -> 3 weeks
        assert_eq!(progress.estimated_completion(now), now + Duration::days(21));

        let finished = at(2026, 1, 3, 9);
        for (phase, step) in [("p1", "s1"), ("p1", "s2"), ("p2", "s3"), ("p2", "s4")] {
            progress
                .complete_step(phase, step, StepCompletion::default(), finished)
                .unwrap();
        }
        // A finished ledger keeps its completion date as time moves on.
        assert_eq!(progress.estimated_completion(finished), finished);
        assert_eq!(progress.estimated_completion(at(2026, 2, 1, 9)), finished);
    }

    #[test]
    fn test_progress_error_maps_to_http() {
        assert_eq!(
            AppError::from(ProgressError::StepNotFound).status(),
            axum::http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ProgressError::InvalidRating).status(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }
}
