//! Result types for knowledge source queries
//!
//! These model the neutral JSON protocol spoken by the code-graph service
//! and the local content source. They carry no query state - every value
//! is a snapshot owned by the caller.

use serde::{Deserialize, Serialize};

/// A code component known to the structural graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentNode {
    pub name: String,

    /// Component kind: "class", "service", "module", "function", ...
    pub kind: String,

    /// Source path, empty when the graph has no file mapping
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub description: String,

    /// Structural importance score assigned by the graph service
    #[serde(default, rename = "page-rank")]
    pub page_rank: f64,
}

/// A directed relationship between two components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,

    /// Relationship kind: "DEPENDS_ON", "CALLS", "IMPORTS", ...
    pub kind: String,

    pub target: String,
}

/// Result of a structural scope query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureView {
    #[serde(default)]
    pub components: Vec<ComponentNode>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl StructureView {
    /// Look up a component by name (case-insensitive)
    pub fn find_component(&self, name: &str) -> Option<&ComponentNode> {
        self.components.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Upstream/downstream dependencies of a single component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyView {
    /// Components this one depends on
    #[serde(default)]
    pub upstream: Vec<String>,

    /// Components that depend on this one
    #[serde(default)]
    pub downstream: Vec<String>,
}

impl DependencyView {
    /// Check whether `target` appears as an upstream dependency (case-insensitive)
    pub fn depends_on(&self, target: &str) -> bool {
        self.upstream.iter().any(|u| u.eq_ignore_ascii_case(target))
    }
}

/// A similar-feature match from the graph's similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub name: String,

    /// Relevance score in [0,1], higher is closer
    #[serde(default)]
    pub score: f64,
}

/// A directory listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub path: String,

    #[serde(rename = "is-dir")]
    pub is_dir: bool,
}

/// A single matching line from a file content search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMatch {
    pub path: String,

    /// 1-based line number
    pub line: u64,

    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_component_case_insensitive() {
        let view = StructureView {
            components: vec![ComponentNode {
                name: "OrderService".to_string(),
                kind: "service".to_string(),
                path: "src/orders/service.rs".to_string(),
                description: String::new(),
                page_rank: 0.4,
            }],
            relationships: vec![],
        };

        assert!(view.find_component("orderservice").is_some());
        assert!(view.find_component("OrderService").is_some());
        assert!(view.find_component("PaymentService").is_none());
    }

    #[test]
    fn test_depends_on() {
        let deps = DependencyView {
            upstream: vec!["AuthService".to_string()],
            downstream: vec!["ApiGateway".to_string()],
        };

        assert!(deps.depends_on("authservice"));
        assert!(!deps.depends_on("ApiGateway"));
    }

    #[test]
    fn test_structure_view_deserialize_defaults() {
        let view: StructureView = serde_json::from_str("{}").unwrap();
        assert!(view.components.is_empty());
        assert!(view.relationships.is_empty());
    }

    #[test]
    fn test_component_node_deserialize() {
        let json = r#"{
            "name": "PaymentService",
            "kind": "service",
            "path": "src/payments.rs",
            "page-rank": 0.7
        }"#;

        let node: ComponentNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.name, "PaymentService");
        assert!((node.page_rank - 0.7).abs() < f64::EPSILON);
        assert!(node.description.is_empty());
    }
}
