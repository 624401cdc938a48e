//! Business Requirements Document model
//!
//! The BRD is the unit that flows through the generate→verify loop. Its
//! sections are structured fields, not free markdown - the claim extractor
//! depends on that structure, and the minimal fallback document preserves
//! it even when the generator degrades.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::generate_id;

/// Kind of document an agent can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Brd,
    Epics,
    Backlogs,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Brd => write!(f, "brd"),
            DocumentKind::Epics => write!(f, "epics"),
            DocumentKind::Backlogs => write!(f, "backlogs"),
        }
    }
}

/// Requirement priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A single requirement with acceptance criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

/// Business Requirements Document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrdDocument {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,

    pub business_context: String,

    #[serde(default)]
    pub objectives: Vec<String>,

    #[serde(default)]
    pub functional_requirements: Vec<Requirement>,

    #[serde(default)]
    pub technical_requirements: Vec<Requirement>,

    /// Dependency statements: "OrderService depends on PaymentGateway"
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub risks: Vec<String>,

    /// Components the document asserts exist in the codebase
    #[serde(default)]
    pub referenced_components: Vec<String>,

    /// Source files the document asserts exist
    #[serde(default)]
    pub referenced_files: Vec<String>,

    /// Raw generator text preserved when structured parsing degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Section names used by verification to map failures back to revisable regions
pub const SECTION_BUSINESS_CONTEXT: &str = "business-context";
pub const SECTION_OBJECTIVES: &str = "objectives";
pub const SECTION_FUNCTIONAL: &str = "functional-requirements";
pub const SECTION_TECHNICAL: &str = "technical-requirements";
pub const SECTION_DEPENDENCIES: &str = "dependencies";
pub const SECTION_COMPONENTS: &str = "referenced-components";
pub const SECTION_FILES: &str = "referenced-files";

impl BrdDocument {
    /// Create an empty document with a generated id
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: generate_id("brd", &title),
            title,
            created_at: Utc::now(),
            business_context: String::new(),
            objectives: vec![],
            functional_requirements: vec![],
            technical_requirements: vec![],
            dependencies: vec![],
            risks: vec![],
            referenced_components: vec![],
            referenced_files: vec![],
            notes: None,
        }
    }

    /// Deterministic minimal fallback document
    ///
    /// Produced when the generator cannot deliver structured output. Still
    /// a valid, verifiable document: it makes no codebase assertions, so
    /// verification yields zero mechanical claims rather than failures.
    pub fn minimal(request: &str, raw: Option<String>) -> Self {
        let title: String = request.chars().take(80).collect();
        let mut doc = Self::new(title.trim());
        doc.business_context = format!("Feature request: {}", request);
        doc.objectives = vec!["Deliver the requested capability".to_string()];
        doc.notes = raw;
        doc
    }

    /// All section names a document can carry claims for
    pub fn section_names() -> &'static [&'static str] {
        &[
            SECTION_BUSINESS_CONTEXT,
            SECTION_OBJECTIVES,
            SECTION_FUNCTIONAL,
            SECTION_TECHNICAL,
            SECTION_DEPENDENCIES,
            SECTION_COMPONENTS,
            SECTION_FILES,
        ]
    }

    /// Render as plain markdown for terminal output
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# Business Requirements Document: {}\n\n", self.title));
        md.push_str(&format!("**Date:** {}\n\n", self.created_at.format("%Y-%m-%d")));

        md.push_str("## Business Context\n\n");
        md.push_str(&self.business_context);
        md.push_str("\n\n## Objectives\n\n");
        for (i, obj) in self.objectives.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", i + 1, obj));
        }

        md.push_str("\n## Functional Requirements\n\n");
        for req in &self.functional_requirements {
            md.push_str(&format!("### {}: {}\n\n{}\n\n", req.id, req.title, req.description));
            for ac in &req.acceptance_criteria {
                md.push_str(&format!("- [ ] {}\n", ac));
            }
            md.push('\n');
        }

        md.push_str("## Technical Requirements\n\n");
        for req in &self.technical_requirements {
            md.push_str(&format!("### {}: {}\n\n{}\n\n", req.id, req.title, req.description));
        }

        md.push_str("## Dependencies\n\n");
        for dep in &self.dependencies {
            md.push_str(&format!("- {}\n", dep));
        }

        md.push_str("\n## Risks\n\n");
        for risk in &self.risks {
            md.push_str(&format!("- {}\n", risk));
        }

        if let Some(notes) = &self.notes {
            md.push_str(&format!("\n## Notes\n\n{}\n", notes));
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_id() {
        let doc = BrdDocument::new("Add OAuth");
        assert!(doc.id.contains("-brd-add-oauth"));
        assert_eq!(doc.title, "Add OAuth");
    }

    #[test]
    fn test_minimal_document_is_well_formed() {
        let doc = BrdDocument::minimal("Add payment retries", Some("raw llm text".to_string()));
        assert!(!doc.business_context.is_empty());
        assert!(!doc.objectives.is_empty());
        assert_eq!(doc.notes.as_deref(), Some("raw llm text"));
        // No codebase assertions in the fallback
        assert!(doc.referenced_components.is_empty());
        assert!(doc.referenced_files.is_empty());
        assert!(doc.dependencies.is_empty());
    }

    #[test]
    fn test_markdown_render_contains_sections() {
        let mut doc = BrdDocument::new("Test");
        doc.business_context = "Some context".to_string();
        doc.objectives = vec!["First".to_string()];
        doc.functional_requirements = vec![Requirement {
            id: "FR-1".to_string(),
            title: "Do the thing".to_string(),
            description: "It does the thing".to_string(),
            priority: Priority::High,
            acceptance_criteria: vec!["Thing is done".to_string()],
        }];

        let md = doc.to_markdown();
        assert!(md.contains("## Business Context"));
        assert!(md.contains("FR-1"));
        assert!(md.contains("- [ ] Thing is done"));
    }

    #[test]
    fn test_serde_round_trip() {
        let doc = BrdDocument::minimal("request", None);
        let json = serde_json::to_string(&doc).unwrap();
        let back: BrdDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, doc.id);
        assert_eq!(back.title, doc.title);
    }
}
