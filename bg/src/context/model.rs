//! Aggregated context models
//!
//! One `AggregatedContext` is built per generation request and never
//! mutated afterwards. Revision rounds append advisory notes; the
//! underlying architecture/implementation views stay as originally built.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Information about a code component relevant to the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,

    /// "service", "class", "module", ...
    pub kind: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// An API contract surfaced by the structural graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiContract {
    pub endpoint: String,
    pub method: String,
    pub service: String,
}

/// Content of one source file with its relevance to the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    pub path: String,
    pub content: String,

    /// Why this file is relevant
    #[serde(default)]
    pub relevance: String,

    /// Relevance in [0,1]; compression drops lowest scores first
    pub relevance_score: f64,

    /// Set once compression has truncated this file's content
    #[serde(default)]
    pub truncated: bool,
}

/// Architecture view: components, their dependency edges, API contracts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureView {
    #[serde(default)]
    pub components: Vec<ComponentInfo>,

    /// component name -> names it depends on
    #[serde(default)]
    pub dependencies: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub api_contracts: Vec<ApiContract>,
}

/// Implementation view: key files and detected patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplementationView {
    #[serde(default)]
    pub key_files: Vec<FileContext>,

    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Complete aggregated context for one generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedContext {
    /// The original free-text feature request; never dropped or truncated
    pub request: String,

    pub architecture: ArchitectureView,

    pub implementation: ImplementationView,

    #[serde(default)]
    pub similar_features: Vec<String>,

    /// Revision advisories appended across loop turns (never removed)
    #[serde(default)]
    pub advisories: Vec<String>,
}

impl AggregatedContext {
    /// Rough token count estimate (~4 chars per token heuristic)
    pub fn estimated_tokens(&self) -> usize {
        let total_chars = serde_json::to_string(self).map(|s| s.len()).unwrap_or(0);
        total_chars / 4
    }

    /// Return a copy with an advisory note appended
    pub fn with_advisory(&self, note: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.advisories.push(note.into());
        copy
    }
}
