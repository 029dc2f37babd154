use serde::Serialize;

use crate::models::learning_path::{LearningPath, LearningPathView, Rating};
use crate::models::user::User;

pub const PERSONALIZED_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedPath {
    #[serde(flatten)]
    pub path: LearningPathView,
    pub relevance_score: u32,
}

/// Difficulty band for an average skill level (0–100).
pub fn difficulty_for_level(average: f64) -> &'static str {
    if average < 40.0 {
        "beginner"
    } else if average < 70.0 {
        "intermediate"
    } else {
        "advanced"
    }
}

/// +2 per open goal whose title overlaps the path title, +1 for the user's
/// field, +1 when the difficulty fits the user's average skill level.
pub fn relevance_score(path: &LearningPath, user: &User) -> u32 {
    let title = path.title.to_lowercase();
    let mut score = user
        .goals
        .iter()
        .filter(|g| g.status != "completed")
        .map(|g| g.title.to_lowercase())
        .filter(|goal| title.contains(goal.as_str()) || goal.contains(title.as_str()))
        .count() as u32
        * 2;

    if path.category == user.field {
        score += 1;
    }

    if !user.skills.is_empty() {
        let average = user.skills.iter().map(|s| f64::from(s.level)).sum::<f64>()
            / user.skills.len() as f64;
        if path.difficulty == difficulty_for_level(average) {
            score += 1;
        }
    }
    score
}

pub fn personalize(paths: Vec<LearningPath>, user: &User) -> Vec<PersonalizedPath> {
    let mut scored: Vec<PersonalizedPath> = paths
        .into_iter()
        .map(|path| {
            let relevance_score = relevance_score(&path, user);
            PersonalizedPath {
                path: path.into(),
                relevance_score,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    scored.truncate(PERSONALIZED_LIMIT);
    scored
}

/// Folds one more rating into a running average, rounded to one decimal.
pub fn add_rating(current: Rating, rating: u8) -> Rating {
    let count = current.count + 1;
    let average = (current.average * f64::from(current.count) + f64::from(rating)) / f64::from(count);
    Rating {
        average: (average * 10.0).round() / 10.0,
        count,
    }
}

pub fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by.unwrap_or("popularity") {
        "title" => "title",
        "category" => "category",
        "difficulty" => "difficulty",
        "rating" => "rating_average",
        "estimatedDuration" => "estimated_weeks",
        "totalHours" => "total_hours",
        "createdAt" => "created_at",
        _ => "popularity",
    }
}

pub fn sort_direction(sort_order: Option<&str>) -> &'static str {
    match sort_order {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{sample_user, Goal, Skill};
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn path(title: &str, category: &str, difficulty: &str) -> LearningPath {
        LearningPath {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "A path".to_string(),
            category: category.to_string(),
            difficulty: difficulty.to_string(),
            estimated_weeks: 8,
            total_hours: 40,
            courses: Json(vec![]),
            prerequisites: vec![],
            learning_outcomes: vec![],
            target_audience: "Everyone".to_string(),
            related_careers: vec![],
            is_active: true,
            popularity: 0,
            rating_average: 0.0,
            rating_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn goal(title: &str, status: &str) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            target_date: Utc::now(),
            status: status.to_string(),
            priority: "medium".to_string(),
            created_at: Utc::now(),
        }
    }

    fn skill(level: u8) -> Skill {
        Skill {
            id: Uuid::new_v4(),
            name: format!("skill-{level}"),
            level,
            category: "general".to_string(),
        }
    }

    #[test]
    fn test_difficulty_bands() {
        assert_eq!(difficulty_for_level(10.0), "beginner");
        assert_eq!(difficulty_for_level(40.0), "intermediate");
        assert_eq!(difficulty_for_level(69.9), "intermediate");
        assert_eq!(difficulty_for_level(70.0), "advanced");
    }

    #[test]
    fn test_relevance_goal_overlap_both_directions() {
        let mut user = sample_user();
        user.field = "engineering".to_string();
        user.goals = Json(vec![
            goal("Rust", "planned"),
            goal("Master Web Development Basics", "in-progress"),
            goal("Rust", "completed"),
        ]);
        // "rust" is inside the title; the title is inside the second goal
        let p = path("Web Development Basics with Rust", "technology", "advanced");
        assert_eq!(relevance_score(&p, &user), 2);
        let p = path("Web Development Basics", "technology", "advanced");
        assert_eq!(relevance_score(&p, &user), 2);
    }

    #[test]
    fn test_relevance_field_and_difficulty() {
        let mut user = sample_user();
        user.field = "computer-science".to_string();
        user.skills = Json(vec![skill(30), skill(60)]);
        // average 45 -> intermediate
        let p = path("Systems", "computer-science", "intermediate");
        assert_eq!(relevance_score(&p, &user), 2);
        let p = path("Systems", "business", "beginner");
        assert_eq!(relevance_score(&p, &user), 0);
    }

    #[test]
    fn test_no_skills_means_no_difficulty_bonus() {
        let user = sample_user();
        let p = path("Anything", "arts", "beginner");
        assert_eq!(relevance_score(&p, &user), 0);
    }

    #[test]
    fn test_personalize_orders_by_score() {
        let mut user = sample_user();
        user.field = "science".to_string();
        let paths = vec![
            path("Painting", "arts", "beginner"),
            path("Physics", "science", "beginner"),
        ];
        let ranked = personalize(paths, &user);
        assert_eq!(ranked[0].path.path.title, "Physics");
        assert_eq!(ranked[0].relevance_score, 1);
        let value = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(value["relevanceScore"], 1);
        assert_eq!(value["rating"]["count"], 0);
    }

    #[test]
    fn test_add_rating_rounds() {
        let r = add_rating(Rating { average: 0.0, count: 0 }, 4);
        assert_eq!(r, Rating { average: 4.0, count: 1 });
        let r = add_rating(r, 5);
        assert_eq!(r, Rating { average: 4.5, count: 2 });
        let r = add_rating(r, 5);
        // 14 / 3
        assert_eq!(r, Rating { average: 4.7, count: 3 });
    }

    #[test]
    fn test_sort_defaults_to_popularity_desc() {
        assert_eq!(sort_column(None), "popularity");
        assert_eq!(sort_column(Some("rating")), "rating_average");
        assert_eq!(sort_direction(None), "DESC");
        assert_eq!(sort_direction(Some("asc")), "ASC");
    }
}
