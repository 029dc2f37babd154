use serde::Serialize;

use crate::models::career::{Career, CareerView};
use crate::models::user::User;

pub const RECOMMENDATION_LIMIT: usize = 5;

/// Weight of a category/field match relative to one matching skill.
const FIELD_BONUS: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(flatten)]
    pub career: CareerView,
    pub match_percentage: i64,
}

/// Share of the career's required skills the user has, with a half-skill
/// bonus when the career category is the user's field.
pub fn match_percentage(career: &Career, user_skills: &[String], user_field: &str) -> i64 {
    let mut score = career
        .required_skills
        .iter()
        .filter(|s| user_skills.contains(&s.name.to_lowercase()))
        .count() as f64;
    if career.category == user_field {
        score += FIELD_BONUS;
    }
    let total = career.required_skills.len() as f64 + FIELD_BONUS;
    (score / total * 100.0).round() as i64
}

pub fn lowercase_skills(user: &User) -> Vec<String> {
    user.skills.iter().map(|s| s.name.to_lowercase()).collect()
}

/// Scores every candidate and keeps the best few. Ties keep candidate order.
pub fn recommend(candidates: Vec<Career>, user: &User) -> Vec<Recommendation> {
    let skills = lowercase_skills(user);
    let mut scored: Vec<Recommendation> = candidates
        .into_iter()
        .map(|career| {
            let match_percentage = match_percentage(&career, &skills, &user.field);
            Recommendation {
                career: career.into(),
                match_percentage,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.match_percentage.cmp(&a.match_percentage));
    scored.truncate(RECOMMENDATION_LIMIT);
    scored
}

/// Maps a client `sortBy` onto a column. Anything unknown sorts by title.
pub fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by.unwrap_or("title") {
        "category" => "category",
        "growthRate" => "growth_rate",
        "jobOutlook" => "job_outlook",
        "experienceLevel" => "experience_level",
        "educationLevel" => "education_level",
        "salaryRange" | "salaryMin" => "salary_min",
        "salaryMax" => "salary_max",
        "createdAt" => "created_at",
        _ => "title",
    }
}

pub fn sort_direction(sort_order: Option<&str>) -> &'static str {
    match sort_order {
        Some("desc") => "DESC",
        _ => "ASC",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::career::RequiredSkill;
    use crate::models::user::{sample_user, Skill};
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    pub(crate) fn career(title: &str, category: &str, skills: &[&str]) -> Career {
        Career {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{title} role"),
            category: category.to_string(),
            required_skills: Json(
                skills
                    .iter()
                    .map(|s| RequiredSkill {
                        name: s.to_string(),
                        level: "intermediate".to_string(),
                    })
                    .collect(),
            ),
            salary_min: 60_000,
            salary_max: 120_000,
            salary_currency: "USD".to_string(),
            job_outlook: "good".to_string(),
            education_level: "bachelor".to_string(),
            experience_level: "mid".to_string(),
            work_environment: "remote".to_string(),
            growth_rate: 12,
            related_careers: vec![],
            learning_paths: vec![],
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user_with(field: &str, skills: &[&str]) -> User {
        let mut user = sample_user();
        user.field = field.to_string();
        user.skills = Json(
            skills
                .iter()
                .map(|s| Skill {
                    id: Uuid::new_v4(),
                    name: s.to_string(),
                    level: 50,
                    category: "programming".to_string(),
                })
                .collect(),
        );
        user
    }

    #[test]
    fn test_match_percentage_skills_only() {
        let c = career("Backend Engineer", "technology", &["Rust", "SQL", "Docker"]);
        let skills = vec!["rust".to_string(), "sql".to_string()];
        // 2 / 3.5
        assert_eq!(match_percentage(&c, &skills, "engineering"), 57);
    }

    #[test]
    fn test_match_percentage_field_bonus() {
        let c = career("Civil Engineer", "engineering", &["CAD"]);
        // (1 + 0.5) / 1.5
        assert_eq!(match_percentage(&c, &["cad".to_string()], "engineering"), 100);
        // 0.5 / 1.5
        assert_eq!(match_percentage(&c, &[], "engineering"), 33);
    }

    #[test]
    fn test_recommend_sorts_and_truncates() {
        let user = user_with("technology", &["Rust", "SQL"]);
        let mut candidates: Vec<Career> = (0..6)
            .map(|i| career(&format!("Other {i}"), "finance", &["Excel"]))
            .collect();
        candidates.push(career("Backend Engineer", "technology", &["Rust", "SQL"]));

        let recs = recommend(candidates, &user);
        assert_eq!(recs.len(), RECOMMENDATION_LIMIT);
        assert_eq!(recs[0].career.career.title, "Backend Engineer");
        assert_eq!(recs[0].match_percentage, 100);
        assert_eq!(recs[1].match_percentage, 0);
    }

    #[test]
    fn test_recommendation_serializes_flat() {
        let user = user_with("technology", &["Rust"]);
        let recs = recommend(vec![career("Backend Engineer", "technology", &["Rust"])], &user);
        let value = serde_json::to_value(&recs[0]).unwrap();
        assert_eq!(value["title"], "Backend Engineer");
        assert_eq!(value["matchPercentage"], 100);
        assert_eq!(value["salaryRange"]["currency"], "USD");
        assert!(value.get("salaryMin").is_none());
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(sort_column(Some("growthRate")), "growth_rate");
        assert_eq!(sort_column(Some("title; DROP TABLE careers")), "title");
        assert_eq!(sort_column(None), "title");
        assert_eq!(sort_direction(Some("desc")), "DESC");
        assert_eq!(sort_direction(Some("sideways")), "ASC");
    }
}
