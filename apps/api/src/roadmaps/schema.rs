//! Roadmap document rules: how placeholders are built, what generated
//! content must look like before it is stored, and the rating and completion
//! arithmetic on a stored roadmap.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::errors::{AppError, FieldError};
use crate::models::learning_path::Rating;
use crate::models::progress::UserProgress;
use crate::models::roadmap::{
    GeneratedRoadmap, Metadata, MetadataPatch, Overview, Roadmap, RoadmapStatus,
    CONNECTION_TYPES, RESOURCE_TYPES, STEP_TYPES,
};
use crate::validation::{is_hex_color, is_http_url};

pub const PLACEHOLDER_DOCUMENTATION: &str = "Generating documentation...";
pub const DEFAULT_AI_MODEL: &str = "GPT-4";

/// `Data Science` -> `data-science`, `UI/UX Design` -> `ui-ux-design`.
/// Slugs end up in URL paths, so `/` never survives.
pub fn field_slug(field: &str) -> String {
    field
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Public identifier: `{field-slug}-{level}-{millis}`.
pub fn slug(field: &str, level: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        field_slug(field),
        level.to_lowercase(),
        now.timestamp_millis()
    )
}

pub fn roadmap_title(field: &str, level: &str) -> String {
    format!("{field} Career Path - {level} Level")
}

/// A `generating` roadmap with stand-in content, stored before the workflow
/// is triggered.
pub fn placeholder(user_id: Uuid, field: &str, level: &str, now: DateTime<Utc>) -> Roadmap {
    let roadmap_id = slug(field, level, now);
    let tags = vec![field_slug(field), level.to_lowercase()];
    Roadmap {
        id: Uuid::new_v4(),
        user_id,
        roadmap_id,
        title: roadmap_title(field, level),
        field: field.to_string(),
        level: level.to_string(),
        overview: Json(Overview {
            description: "AI-generated roadmap is being created...".to_string(),
            duration: "TBD".to_string(),
            difficulty: 3,
            outcomes: vec![],
        }),
        phases: Json(vec![]),
        connections: Json(vec![]),
        metadata: Json(Metadata {
            created_at: now,
            ai_model: DEFAULT_AI_MODEL.to_string(),
            version: "1.0".to_string(),
            tags,
            industry: None,
            salary_range: None,
        }),
        documentation: PLACEHOLDER_DOCUMENTATION.to_string(),
        status: RoadmapStatus::Generating.as_str().to_string(),
        is_public: false,
        rating_average: 0.0,
        rating_count: 0,
        workflow_id: None,
        helpful_count: 0,
        view_count: 0,
        created_at: now,
        updated_at: now,
    }
}

fn difficulty_ok(value: u8) -> bool {
    (1..=5).contains(&value)
}

/// Structural checks on generator output. Every problem is reported with
/// a path into the document.
pub fn validate_generated(roadmap: &GeneratedRoadmap) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut push = |field: String, message: &str| {
        errors.push(FieldError {
            field,
            message: message.to_string(),
        })
    };

    if !difficulty_ok(roadmap.overview.difficulty) {
        push("overview.difficulty".to_string(), "Difficulty must be between 1 and 5");
    }

    for (p, phase) in roadmap.phases.iter().enumerate() {
        if phase.id.trim().is_empty() {
            push(format!("phases[{p}].id"), "Phase id is required");
        }
        if let Some(color) = &phase.color {
            if !is_hex_color(color) {
                push(format!("phases[{p}].color"), "Color must be a #RRGGBB hex value");
            }
        }
        for (s, step) in phase.steps.iter().enumerate() {
            let at = format!("phases[{p}].steps[{s}]");
            if step.id.trim().is_empty() {
                push(format!("{at}.id"), "Step id is required");
            }
            if !STEP_TYPES.contains(&step.kind.as_str()) {
                push(format!("{at}.type"), "Unknown step type");
            }
            if !difficulty_ok(step.difficulty) {
                push(format!("{at}.difficulty"), "Difficulty must be between 1 and 5");
            }
            for (r, resource) in step.resources.iter().enumerate() {
                if !RESOURCE_TYPES.contains(&resource.kind.as_str()) {
                    push(format!("{at}.resources[{r}].type"), "Unknown resource type");
                }
                if !is_http_url(&resource.url) {
                    push(format!("{at}.resources[{r}].url"), "Resource URL must be http(s)");
                }
            }
            for (j, project) in step.projects.iter().enumerate() {
                if !difficulty_ok(project.difficulty) {
                    push(
                        format!("{at}.projects[{j}].difficulty"),
                        "Difficulty must be between 1 and 5",
                    );
                }
            }
        }
    }

    for (c, connection) in roadmap.connections.iter().enumerate() {
        if !CONNECTION_TYPES.contains(&connection.kind.as_str()) {
            push(format!("connections[{c}].type"), "Unknown connection type");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// 422 carrying the first few structural problems.
pub fn rejection(errors: &[FieldError]) -> AppError {
    let summary = errors
        .iter()
        .take(3)
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    AppError::UnprocessableEntity(format!("Generated roadmap is invalid ({summary})"))
}

/// Overlays generator metadata onto the stored metadata; absent keys keep
/// their current value.
pub fn merge_metadata(current: &mut Metadata, patch: MetadataPatch) {
    if let Some(created_at) = patch.created_at {
        current.created_at = created_at;
    }
    if let Some(ai_model) = patch.ai_model {
        current.ai_model = ai_model;
    }
    if let Some(version) = patch.version {
        current.version = version;
    }
    if let Some(tags) = patch.tags {
        current.tags = tags;
    }
    if patch.industry.is_some() {
        current.industry = patch.industry;
    }
    if patch.salary_range.is_some() {
        current.salary_range = patch.salary_range;
    }
}

impl Roadmap {
    pub fn rating(&self) -> Rating {
        Rating {
            average: self.rating_average,
            count: self.rating_count,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RoadmapStatus::Completed.as_str()
    }

    pub fn total_steps(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }

    /// Folds a 1–5 rating into the running average. The stored average is
    /// not rounded.
    pub fn add_rating(&mut self, rating: u8) -> Result<(), AppError> {
        if !difficulty_ok(rating) {
            return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
        }
        let total = self.rating_average * f64::from(self.rating_count);
        self.rating_count += 1;
        self.rating_average = (total + f64::from(rating)) / f64::from(self.rating_count);
        Ok(())
    }

    /// Share of this roadmap's steps the given ledger has completed.
    pub fn completion_percentage(&self, progress: Option<&UserProgress>) -> u8 {
        let Some(progress) = progress else {
            return 0;
        };
        let total = self.total_steps();
        if total == 0 {
            return 0;
        }
        ((progress.completed_steps() as f64 / total as f64) * 100.0).round() as u8
    }

    /// Copies generated content in and marks the roadmap completed.
    pub fn apply_generated(&mut self, generated: GeneratedRoadmap, documentation: String, now: DateTime<Utc>) {
        self.overview = Json(generated.overview);
        self.phases = Json(generated.phases);
        self.connections = Json(generated.connections);
        merge_metadata(&mut self.metadata.0, generated.metadata);
        self.documentation = documentation;
        self.status = RoadmapStatus::Completed.as_str().to_string();
        self.updated_at = now;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::roadmap::{Connection, Resource};
    use crate::progress::tracker::tests::{roadmap_phases, seeded};
    use crate::progress::tracker::StepCompletion;
    use chrono::TimeZone;

    pub(crate) fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()
    }

    pub(crate) fn generated() -> GeneratedRoadmap {
        GeneratedRoadmap {
            id: None,
            title: Some("Web Development Roadmap".to_string()),
            overview: Overview {
                description: "Learn the web".to_string(),
                duration: "3 months".to_string(),
                difficulty: 2,
                outcomes: vec!["Ship a site".to_string()],
            },
            phases: roadmap_phases(),
            connections: vec![Connection {
                from: "p1".to_string(),
                to: "p2".to_string(),
                kind: "prerequisite".to_string(),
                label: None,
            }],
            metadata: MetadataPatch::default(),
        }
    }

    /// A completed roadmap with the standard two-phase tree.
    pub(crate) fn completed_roadmap() -> Roadmap {
        let mut roadmap = placeholder(Uuid::new_v4(), "Web Development", "Beginner", at(1));
        roadmap.apply_generated(generated(), "# Web".to_string(), at(1));
        roadmap
    }

    #[test]
    fn test_slug_and_title() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(slug("UI/UX Design", "Expert", now), "ui-ux-design-expert-1700000000123");
        assert_eq!(field_slug("UI / UX Design"), "ui-ux-design");
        assert_eq!(slug("Data  Science", "Beginner", now), "data-science-beginner-1700000000123");
        assert_eq!(roadmap_title("DevOps", "Advanced"), "DevOps Career Path - Advanced Level");
    }

    #[test]
    fn test_placeholder_shape() {
        let roadmap = placeholder(Uuid::nil(), "Data Science", "Beginner", at(1));
        assert_eq!(roadmap.status, "generating");
        assert_eq!(roadmap.overview.duration, "TBD");
        assert_eq!(roadmap.overview.difficulty, 3);
        assert_eq!(roadmap.metadata.tags, vec!["data-science", "beginner"]);
        assert_eq!(roadmap.documentation, PLACEHOLDER_DOCUMENTATION);
        assert!(roadmap.roadmap_id.starts_with("data-science-beginner-"));
    }

    #[test]
    fn test_valid_generated_passes() {
        assert!(validate_generated(&generated()).is_ok());
    }

    #[test]
    fn test_invalid_generated_reports_paths() {
        let mut bad = generated();
        bad.overview.difficulty = 0;
        bad.phases[0].color = Some("blue".to_string());
        bad.phases[1].steps[0].kind = "lecture".to_string();
        bad.phases[1].steps[0].resources.push(Resource {
            title: "Docs".to_string(),
            kind: "podcast".to_string(),
            url: "ftp://example.com".to_string(),
            duration: None,
            free: true,
        });
        bad.connections[0].kind = "sometimes".to_string();

        let errors = validate_generated(&bad).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "overview.difficulty",
                "phases[0].color",
                "phases[1].steps[0].type",
                "phases[1].steps[0].resources[0].type",
                "phases[1].steps[0].resources[0].url",
                "connections[0].type",
            ]
        );
        assert_eq!(rejection(&errors).status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_merge_metadata_keeps_absent_keys() {
        let mut roadmap = placeholder(Uuid::nil(), "DevOps", "Advanced", at(1));
        merge_metadata(
            &mut roadmap.metadata.0,
            MetadataPatch {
                ai_model: Some("claude".to_string()),
                industry: Some("Cloud".to_string()),
                ..MetadataPatch::default()
            },
        );
        assert_eq!(roadmap.metadata.ai_model, "claude");
        assert_eq!(roadmap.metadata.industry.as_deref(), Some("Cloud"));
        assert_eq!(roadmap.metadata.version, "1.0");
        assert_eq!(roadmap.metadata.tags, vec!["devops", "advanced"]);
    }

    #[test]
    fn test_add_rating_running_average() {
        let mut roadmap = completed_roadmap();
        roadmap.add_rating(5).unwrap();
        roadmap.add_rating(4).unwrap();
        roadmap.add_rating(4).unwrap();
        assert_eq!(roadmap.rating_count, 3);
        assert!((roadmap.rating_average - 13.0 / 3.0).abs() < 1e-9);
        assert!(roadmap.add_rating(6).is_err());
        assert_eq!(roadmap.rating_count, 3);
    }

    #[test]
    fn test_completion_percentage() {
        let roadmap = completed_roadmap();
        assert_eq!(roadmap.completion_percentage(None), 0);

        let mut progress = seeded(at(1));
        progress
            .complete_step("p1", "s1", StepCompletion::default(), at(2))
            .unwrap();
        assert_eq!(roadmap.completion_percentage(Some(&progress)), 25);

        let empty = placeholder(Uuid::nil(), "DevOps", "Advanced", at(1));
        assert_eq!(empty.completion_percentage(Some(&progress)), 0);
    }

    #[test]
    fn test_apply_generated_completes() {
        let roadmap = completed_roadmap();
        assert!(roadmap.is_completed());
        assert_eq!(roadmap.total_steps(), 4);
        assert_eq!(roadmap.documentation, "# Web");
        assert_eq!(roadmap.overview.duration, "3 months");
        assert_eq!(roadmap.metadata.ai_model, DEFAULT_AI_MODEL);
    }
}
