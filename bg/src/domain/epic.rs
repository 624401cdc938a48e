//! Epic and user story models
//!
//! Epics group work derived from an approved BRD; stories break epics into
//! implementable units. Both carry `blocked_by` dependency lists which are
//! validated acyclic at construction time so downstream ordering can never
//! loop.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::brd::Priority;

/// T-shirt sizing for effort estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// A grouping of related work derived from a BRD
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Components affected by this epic
    #[serde(default)]
    pub components: Vec<String>,

    #[serde(default)]
    pub effort: EffortSize,

    #[serde(default)]
    pub priority: Priority,

    /// Epic IDs that must complete before this one can start
    #[serde(default)]
    pub blocked_by: Vec<String>,

    /// Epic IDs waiting on this one
    #[serde(default)]
    pub blocks: Vec<String>,
}

/// A single unit of implementable work derived from an Epic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    pub id: String,
    pub epic_id: String,
    pub title: String,

    /// User role ("As a ...")
    pub as_a: String,
    /// Capability ("I want ...")
    pub i_want: String,
    /// Benefit ("so that ...")
    pub so_that: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub acceptance_criteria: Vec<String>,

    #[serde(default)]
    pub files_to_modify: Vec<String>,

    #[serde(default)]
    pub files_to_create: Vec<String>,

    #[serde(default)]
    pub estimated_points: Option<u32>,

    #[serde(default)]
    pub priority: Priority,

    /// Story IDs that must complete before this one
    #[serde(default)]
    pub blocked_by: Vec<String>,
}

impl UserStory {
    /// Standard user story sentence
    pub fn to_user_story_format(&self) -> String {
        format!("As a {}, I want {}, so that {}.", self.as_a, self.i_want, self.so_that)
    }
}

/// Validate that a `blocked_by` graph is acyclic
///
/// Takes `(id, blocked_by)` pairs; returns the offending path on a cycle.
/// References to unknown ids are ignored here - they are a warning, not a
/// cycle.
pub fn validate_dependency_graph<'a, I>(items: I) -> Result<(), Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let graph: HashMap<&str, &[String]> = items.into_iter().collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut cycle_path = Vec::new();

    let mut ids: Vec<&str> = graph.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        if !visited.contains(id) && has_cycle_dfs(id, &graph, &mut visited, &mut rec_stack, &mut cycle_path) {
            return Err(cycle_path);
        }
    }

    Ok(())
}

/// DFS helper for cycle detection
fn has_cycle_dfs<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    cycle_path: &mut Vec<String>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    cycle_path.push(node.to_string());

    if let Some(deps) = graph.get(node) {
        for dep_id in deps.iter() {
            if !visited.contains(dep_id.as_str()) {
                if graph.contains_key(dep_id.as_str())
                    && has_cycle_dfs(dep_id.as_str(), graph, visited, rec_stack, cycle_path)
                {
                    return true;
                }
            } else if rec_stack.contains(dep_id.as_str()) {
                cycle_path.push(dep_id.clone());
                return true;
            }
        }
    }

    rec_stack.remove(node);
    cycle_path.pop();
    false
}

/// Topologically sort epics by `blocked_by` dependencies
///
/// Returns indices into the input slice in execution order (blockers
/// first). Fails with the cycle path if the graph is cyclic.
pub fn topological_sort(epics: &[Epic]) -> Result<Vec<usize>, Vec<String>> {
    validate_dependency_graph(epics.iter().map(|e| (e.id.as_str(), e.blocked_by.as_slice())))?;

    let index_map: HashMap<&str, usize> = epics.iter().enumerate().map(|(i, e)| (e.id.as_str(), i)).collect();

    let mut order = Vec::with_capacity(epics.len());
    let mut placed = HashSet::new();

    // Cycle-free by validation above, so this terminates
    while order.len() < epics.len() {
        for (idx, epic) in epics.iter().enumerate() {
            if placed.contains(&idx) {
                continue;
            }
            let ready = epic
                .blocked_by
                .iter()
                .filter_map(|dep| index_map.get(dep.as_str()))
                .all(|dep_idx| placed.contains(dep_idx));
            if ready {
                order.push(idx);
                placed.insert(idx);
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epic(id: &str, blocked_by: &[&str]) -> Epic {
        Epic {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            components: vec![],
            effort: EffortSize::Medium,
            priority: Priority::Medium,
            blocked_by: blocked_by.iter().map(|s| s.to_string()).collect(),
            blocks: vec![],
        }
    }

    #[test]
    fn test_acyclic_graph_passes() {
        let epics = vec![epic("a", &[]), epic("b", &["a"]), epic("c", &["a", "b"])];
        let result = validate_dependency_graph(epics.iter().map(|e| (e.id.as_str(), e.blocked_by.as_slice())));
        assert!(result.is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let epics = vec![epic("a", &["c"]), epic("b", &["a"]), epic("c", &["b"])];
        let result = validate_dependency_graph(epics.iter().map(|e| (e.id.as_str(), e.blocked_by.as_slice())));
        assert!(result.is_err());
        let path = result.unwrap_err();
        assert!(path.len() >= 3);
    }

    #[test]
    fn test_self_cycle_detected() {
        let epics = vec![epic("a", &["a"])];
        let result = validate_dependency_graph(epics.iter().map(|e| (e.id.as_str(), e.blocked_by.as_slice())));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_reference_is_not_a_cycle() {
        let epics = vec![epic("a", &["ghost"])];
        let result = validate_dependency_graph(epics.iter().map(|e| (e.id.as_str(), e.blocked_by.as_slice())));
        assert!(result.is_ok());
    }

    #[test]
    fn test_topological_sort_simple() {
        let epics = vec![epic("b", &["a"]), epic("a", &[]), epic("c", &["b"])];
        let order = topological_sort(&epics).unwrap();

        let pos = |id: &str| order.iter().position(|&i| epics[i].id == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn test_topological_sort_diamond() {
        let epics = vec![
            epic("d", &["b", "c"]),
            epic("b", &["a"]),
            epic("c", &["a"]),
            epic("a", &[]),
        ];
        let order = topological_sort(&epics).unwrap();
        let pos = |id: &str| order.iter().position(|&i| epics[i].id == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn test_topological_sort_rejects_cycle() {
        let epics = vec![epic("a", &["b"]), epic("b", &["a"])];
        assert!(topological_sort(&epics).is_err());
    }

    #[test]
    fn test_user_story_format() {
        let story = UserStory {
            id: "s1".to_string(),
            epic_id: "e1".to_string(),
            title: "Login".to_string(),
            as_a: "registered user".to_string(),
            i_want: "to log in with OAuth".to_string(),
            so_that: "I don't need a password".to_string(),
            description: String::new(),
            acceptance_criteria: vec![],
            files_to_modify: vec![],
            files_to_create: vec![],
            estimated_points: Some(3),
            priority: Priority::High,
            blocked_by: vec![],
        };

        assert_eq!(
            story.to_user_story_format(),
            "As a registered user, I want to log in with OAuth, so that I don't need a password."
        );
    }
}
