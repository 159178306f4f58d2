//! Dependency graph validation
//!
//! Builds a directed graph over all task IDs in the project and checks the
//! invariants the scheduler relies on: every dependency resolves, no task
//! depends on itself, and the graph is acyclic. Problems are reported as a
//! structured [`ValidationReport`], never as errors, so callers can render
//! them directly.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::id::TaskId;
use super::task::Milestone;

/// Result of validating a milestone collection
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Directed graph over task IDs; edges run dependency -> dependent
///
/// Dangling dependency references are skipped when building edges, so the
/// graph is usable even on invalid input (validation reports them separately).
pub(crate) struct TaskGraph {
    graph: DiGraph<TaskId, ()>,
}

impl TaskGraph {
    /// Builds the graph from every task in the project
    pub(crate) fn from_milestones(milestones: &[Milestone]) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for milestone in milestones {
            for task in &milestone.tasks {
                if !nodes.contains_key(&task.task_id) {
                    let idx = graph.add_node(task.task_id.clone());
                    nodes.insert(task.task_id.clone(), idx);
                }
            }
        }

        for milestone in milestones {
            for task in &milestone.tasks {
                let Some(&task_idx) = nodes.get(&task.task_id) else {
                    continue;
                };
                for dep in &task.depends_on {
                    if dep == &task.task_id {
                        continue;
                    }
                    if let Some(&dep_idx) = nodes.get(dep) {
                        graph.add_edge(dep_idx, task_idx, ());
                    }
                }
            }
        }

        Self { graph }
    }

    /// Returns all task IDs in topological order (dependencies first), or one
    /// task involved in a cycle
    pub(crate) fn topo_order(&self) -> Result<Vec<TaskId>, TaskId> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            // The cycle always names a live node
            Err(cycle) => Err(self.graph[cycle.node_id()].clone()),
        }
    }
}

/// Validates the dependency structure of a milestone collection
///
/// Errors (user-correctable): duplicate milestone/task IDs, missing or
/// duplicate milestone names, non-positive durations, self-dependencies,
/// dangling dependency references, and at most one dependency cycle.
/// Warnings: dependencies that cross milestone boundaries.
pub fn validate_dependencies(milestones: &[Milestone]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut seen_milestone_ids = HashSet::new();
    let mut seen_milestone_names = HashSet::new();
    let mut seen_task_ids = HashSet::new();

    for milestone in milestones {
        if !seen_milestone_ids.insert(&milestone.milestone_id) {
            errors.push(format!(
                "Duplicate milestone ID \"{}\"",
                milestone.milestone_id
            ));
        }

        let name = milestone.milestone_name.trim();
        if name.is_empty() {
            errors.push(format!(
                "Milestone \"{}\" has no name",
                milestone.milestone_id
            ));
        } else if !seen_milestone_names.insert(name.to_string()) {
            errors.push(format!("Duplicate milestone name \"{}\"", name));
        }

        for task in &milestone.tasks {
            if !seen_task_ids.insert(&task.task_id) {
                errors.push(format!("Duplicate task ID \"{}\"", task.task_id));
            }
            if task.duration_days == 0 {
                errors.push(format!(
                    "Task \"{}\" has a non-positive duration",
                    task.name
                ));
            }
        }
    }

    // All references must resolve; cross-milestone references are only warnings
    let known = super::task::all_task_ids(milestones);
    for milestone in milestones {
        let own: HashSet<&TaskId> = milestone.tasks.iter().map(|t| &t.task_id).collect();

        for task in &milestone.tasks {
            for dep in &task.depends_on {
                if dep == &task.task_id {
                    errors.push(format!("Task \"{}\" depends on itself", task.name));
                } else if !known.contains(dep) {
                    errors.push(format!(
                        "Task \"{}\" depends on unknown task \"{}\"",
                        task.name, dep
                    ));
                } else if !own.contains(dep) {
                    warnings.push(format!(
                        "Task \"{}\" depends on \"{}\" in another milestone",
                        task.name, dep
                    ));
                }
            }
        }
    }

    // Full-graph cycle detection; one reported cycle is sufficient signal
    let graph = TaskGraph::from_milestones(milestones);
    if let Err(task_id) = graph.topo_order() {
        errors.push(format!(
            "Circular dependency detected involving task \"{}\"",
            task_id
        ));
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
