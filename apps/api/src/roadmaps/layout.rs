//! Node/edge layout of a roadmap for flow-chart rendering.
//!
//! Phases run down the left column. Each phase's steps sit to its right in
//! rows of three, and the next phase starts below the last row.

use serde::Serialize;

use crate::models::progress::UserProgress;
use crate::models::roadmap::{Connection, Roadmap};

const PHASE_X: i32 = 50;
const FIRST_PHASE_Y: i32 = 100;
const PHASE_SPACING: i32 = 300;
const STEP_X: i32 = 300;
const STEP_SPACING: i32 = 200;
const STEP_OFFSET_Y: i32 = 120;
const ROW_HEIGHT: i32 = 120;
const STEPS_PER_ROW: usize = 3;

pub const DEFAULT_COLOR: &str = "#2563EB";
const STEP_LINK_COLOR: &str = "#94A3B8";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Phase,
    Step,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    pub label: String,
    pub description: String,
    pub duration: String,
    pub color: String,
    /// Owning phase, for step nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    /// Phase completion percentage, or 100/0 for a step.
    pub progress: u8,
    pub completed: bool,
    pub time_spent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub color: String,
    pub stroke_width: u8,
    pub dashed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub overall_progress: u8,
}

pub fn connection_color(kind: &str) -> &'static str {
    match kind {
        "prerequisite" => "#DC2626",
        "parallel" => "#7C3AED",
        "optional" => "#6B7280",
        _ => DEFAULT_COLOR,
    }
}

fn connection_edge(connection: &Connection) -> GraphEdge {
    GraphEdge {
        id: format!("connection-{}-{}", connection.from, connection.to),
        source: connection.from.clone(),
        target: connection.to.clone(),
        label: connection.label.clone(),
        color: connection_color(&connection.kind).to_string(),
        stroke_width: if connection.kind == "prerequisite" { 3 } else { 2 },
        dashed: connection.kind == "optional",
    }
}

fn plain_edge(source: &str, target: &str, color: &str) -> GraphEdge {
    GraphEdge {
        id: format!("{source}-{target}"),
        source: source.to_string(),
        target: target.to_string(),
        label: None,
        color: color.to_string(),
        stroke_width: 2,
        dashed: false,
    }
}

/// Lays out `roadmap`, overlaying completion from `progress` when given.
pub fn build_graph(roadmap: &Roadmap, progress: Option<&UserProgress>) -> RoadmapGraph {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut y = FIRST_PHASE_Y;

    for phase in roadmap.phases.iter() {
        let color = phase.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string());
        let tracked = progress.and_then(|p| p.phases.iter().find(|pp| pp.phase_id == phase.id));

        nodes.push(GraphNode {
            id: phase.id.clone(),
            kind: NodeKind::Phase,
            position: Position { x: PHASE_X, y },
            label: phase.title.clone(),
            description: phase.description.clone(),
            duration: phase.duration.clone(),
            color: color.clone(),
            phase_id: None,
            difficulty: None,
            progress: tracked.map_or(0, |pp| pp.overall_progress),
            completed: tracked.is_some_and(|pp| pp.completed_at.is_some()),
            time_spent: tracked.map_or(0.0, |pp| pp.steps.iter().map(|s| s.time_spent).sum()),
        });

        for (index, step) in phase.steps.iter().enumerate() {
            let row = (index / STEPS_PER_ROW) as i32;
            let col = index % STEPS_PER_ROW;
            let step_progress = tracked.and_then(|pp| pp.steps.iter().find(|s| s.step_id == step.id));
            let completed = step_progress.is_some_and(|s| s.completed);

            nodes.push(GraphNode {
                id: step.id.clone(),
                kind: NodeKind::Step,
                position: Position {
                    x: STEP_X + col as i32 * STEP_SPACING,
                    y: y + STEP_OFFSET_Y + row * ROW_HEIGHT,
                },
                label: step.title.clone(),
                description: step.description.clone(),
                duration: step.duration.clone(),
                color: color.clone(),
                phase_id: Some(phase.id.clone()),
                difficulty: Some(step.difficulty),
                progress: if completed { 100 } else { 0 },
                completed,
                time_spent: step_progress.map_or(0.0, |s| s.time_spent),
            });

            if col == 0 {
                edges.push(plain_edge(&phase.id, &step.id, &color));
            } else {
                edges.push(plain_edge(&phase.steps[index - 1].id, &step.id, STEP_LINK_COLOR));
            }
        }

        let rows = phase.steps.len().div_ceil(STEPS_PER_ROW) as i32;
        y += PHASE_SPACING + rows * ROW_HEIGHT;
    }

    edges.extend(roadmap.connections.iter().map(connection_edge));

    RoadmapGraph {
        nodes,
        edges,
        overall_progress: roadmap.completion_percentage(progress),
    }
}
