//! Claim extraction from structured documents
//!
//! Extraction is purely mechanical: it walks the document's structured
//! sections and derives atomic, independently-falsifiable claims. Running
//! it twice over the same document yields byte-identical claim id sets -
//! there is no model call and no randomness anywhere in this module.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::domain::{
    BrdDocument, SECTION_BUSINESS_CONTEXT, SECTION_COMPONENTS, SECTION_DEPENDENCIES, SECTION_FILES,
    SECTION_FUNCTIONAL, SECTION_OBJECTIVES, SECTION_TECHNICAL,
};

/// What kind of fact a claim asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimKind {
    /// "Component X exists in the codebase"
    ComponentExistence,
    /// "X depends on Y"
    DependencyRelationship,
    /// "File path/to/f.rs exists"
    FileReference,
    /// "The system retries payments 3 times" - not mechanically checkable
    BehavioralAssertion,
    /// An objective derived from the request - not mechanically checkable
    RequirementDerivation,
}

/// An atomic, independently-checkable factual claim
///
/// Claims are derived, never authored; they are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Deterministic id: `clm-{section}-{ordinal}`
    pub id: String,

    pub kind: ClaimKind,

    /// Literal text extracted from the document
    pub text: String,

    /// Document section this claim maps back to
    pub section: String,

    /// Primary entity the claim is about (component name, file path, ...)
    pub subject: String,

    /// Secondary operand for relational claims (dependency target)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

/// Extract all claims from a document
///
/// At most `max_per_section` claims are kept per section, in document
/// order, so the cap does not disturb id stability of the claims kept.
pub fn extract_claims(doc: &BrdDocument, max_per_section: usize) -> Vec<Claim> {
    let mut claims = Vec::new();

    let mut section = SectionCounter::new(SECTION_COMPONENTS, max_per_section);
    for component in &doc.referenced_components {
        section.push(&mut claims, |id| Claim {
            id,
            kind: ClaimKind::ComponentExistence,
            text: format!("Component `{}` exists in the codebase", component),
            section: SECTION_COMPONENTS.to_string(),
            subject: component.clone(),
            object: None,
        });
    }

    let mut section = SectionCounter::new(SECTION_DEPENDENCIES, max_per_section);
    for statement in &doc.dependencies {
        match parse_dependency(statement) {
            Some((source, targets)) => {
                // "X depends on Y and Z" splits into one claim per target -
                // each is independently falsifiable
                for target in targets {
                    let source = source.clone();
                    section.push(&mut claims, |id| Claim {
                        id,
                        kind: ClaimKind::DependencyRelationship,
                        text: format!("{} depends on {}", source, target),
                        section: SECTION_DEPENDENCIES.to_string(),
                        subject: source.clone(),
                        object: Some(target.clone()),
                    });
                }
            }
            None => {
                section.push(&mut claims, |id| Claim {
                    id,
                    kind: ClaimKind::BehavioralAssertion,
                    text: statement.clone(),
                    section: SECTION_DEPENDENCIES.to_string(),
                    subject: statement.clone(),
                    object: None,
                });
            }
        }
    }

    let mut section = SectionCounter::new(SECTION_FILES, max_per_section);
    for path in &doc.referenced_files {
        section.push(&mut claims, |id| Claim {
            id,
            kind: ClaimKind::FileReference,
            text: format!("File `{}` exists", path),
            section: SECTION_FILES.to_string(),
            subject: path.clone(),
            object: None,
        });
    }

    let mut section = SectionCounter::new(SECTION_FUNCTIONAL, max_per_section);
    for req in &doc.functional_requirements {
        section.push(&mut claims, |id| Claim {
            id,
            kind: ClaimKind::BehavioralAssertion,
            text: req.description.clone(),
            section: SECTION_FUNCTIONAL.to_string(),
            subject: req.title.clone(),
            object: None,
        });
    }

    let mut section = SectionCounter::new(SECTION_TECHNICAL, max_per_section);
    for req in &doc.technical_requirements {
        section.push(&mut claims, |id| Claim {
            id,
            kind: ClaimKind::BehavioralAssertion,
            text: req.description.clone(),
            section: SECTION_TECHNICAL.to_string(),
            subject: req.title.clone(),
            object: None,
        });
    }

    let mut section = SectionCounter::new(SECTION_OBJECTIVES, max_per_section);
    for objective in &doc.objectives {
        section.push(&mut claims, |id| Claim {
            id,
            kind: ClaimKind::RequirementDerivation,
            text: objective.clone(),
            section: SECTION_OBJECTIVES.to_string(),
            subject: objective.clone(),
            object: None,
        });
    }

    // PascalCase names in prose are implicit component-existence claims
    let mut section = SectionCounter::new(SECTION_BUSINESS_CONTEXT, max_per_section);
    for entity in extract_pascal_entities(&doc.business_context) {
        section.push(&mut claims, |id| Claim {
            id,
            kind: ClaimKind::ComponentExistence,
            text: format!("Component `{}` mentioned in business context exists", entity),
            section: SECTION_BUSINESS_CONTEXT.to_string(),
            subject: entity.clone(),
            object: None,
        });
    }

    claims
}

/// Per-section ordinal counter producing stable claim ids
struct SectionCounter {
    section: &'static str,
    next: usize,
    cap: usize,
}

impl SectionCounter {
    fn new(section: &'static str, cap: usize) -> Self {
        Self { section, next: 1, cap }
    }

    fn push(&mut self, claims: &mut Vec<Claim>, build: impl FnOnce(String) -> Claim) {
        if self.next > self.cap {
            return;
        }
        let id = format!("clm-{}-{:02}", self.section, self.next);
        self.next += 1;
        claims.push(build(id));
    }
}

/// Parse a dependency statement into (source, targets)
///
/// Accepts "X depends on Y", "X depends on Y and Z", "X -> Y".
fn parse_dependency(statement: &str) -> Option<(String, Vec<String>)> {
    let (source, rest) = if let Some((lhs, rhs)) = statement.split_once(" depends on ") {
        (lhs, rhs)
    } else if let Some((lhs, rhs)) = statement.split_once("->") {
        (lhs, rhs)
    } else {
        return None;
    };

    let source = source.trim().trim_matches('`').to_string();
    if source.is_empty() {
        return None;
    }

    let targets: Vec<String> = rest
        .split(" and ")
        .flat_map(|part| part.split(','))
        .map(|part| part.trim().trim_matches('`').trim_end_matches('.').to_string())
        .filter(|part| !part.is_empty())
        .collect();

    if targets.is_empty() { None } else { Some((source, targets)) }
}

/// PascalCase identifiers with at least two humps ("OrderService")
fn extract_pascal_entities(text: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").expect("valid regex"));

    let mut entities = Vec::new();
    for m in re.find_iter(text) {
        let name = m.as_str().to_string();
        if !entities.contains(&name) {
            entities.push(name);
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, Requirement};

    fn doc() -> BrdDocument {
        let mut doc = BrdDocument::new("Order retries");
        doc.business_context = "Extend OrderService with retry handling.".to_string();
        doc.objectives = vec!["Reduce failed orders".to_string()];
        doc.referenced_components = vec!["OrderService".to_string(), "PaymentGateway".to_string()];
        doc.referenced_files = vec!["src/orders.rs".to_string()];
        doc.dependencies = vec!["OrderService depends on PaymentGateway and RetryQueue".to_string()];
        doc.functional_requirements = vec![Requirement {
            id: "FR-1".to_string(),
            title: "Retry payments".to_string(),
            description: "The system retries failed payments 3 times".to_string(),
            priority: Priority::High,
            acceptance_criteria: vec![],
        }];
        doc
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let document = doc();
        let first: Vec<String> = extract_claims(&document, 10).into_iter().map(|c| c.id).collect();
        let second: Vec<String> = extract_claims(&document, 10).into_iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_conjunction_splits_into_atomic_claims() {
        let claims = extract_claims(&doc(), 10);
        let deps: Vec<&Claim> = claims
            .iter()
            .filter(|c| c.kind == ClaimKind::DependencyRelationship)
            .collect();

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].object.as_deref(), Some("PaymentGateway"));
        assert_eq!(deps[1].object.as_deref(), Some("RetryQueue"));
        // Both atomic claims share the source subject
        assert!(deps.iter().all(|c| c.subject == "OrderService"));
    }

    #[test]
    fn test_claim_ids_follow_section_ordinals() {
        let claims = extract_claims(&doc(), 10);

        let components: Vec<&str> = claims
            .iter()
            .filter(|c| c.section == SECTION_COMPONENTS)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(
            components,
            vec!["clm-referenced-components-01", "clm-referenced-components-02"]
        );
    }

    #[test]
    fn test_behavioral_claims_from_requirements() {
        let claims = extract_claims(&doc(), 10);
        let behavioral: Vec<&Claim> = claims
            .iter()
            .filter(|c| c.kind == ClaimKind::BehavioralAssertion && c.section == SECTION_FUNCTIONAL)
            .collect();

        assert_eq!(behavioral.len(), 1);
        assert!(behavioral[0].text.contains("3 times"));
    }

    #[test]
    fn test_pascal_entities_from_business_context() {
        let claims = extract_claims(&doc(), 10);
        let implicit: Vec<&Claim> = claims
            .iter()
            .filter(|c| c.section == SECTION_BUSINESS_CONTEXT)
            .collect();

        assert_eq!(implicit.len(), 1);
        assert_eq!(implicit[0].subject, "OrderService");
    }

    #[test]
    fn test_unparseable_dependency_becomes_behavioral() {
        let mut document = doc();
        document.dependencies = vec!["Relies on upstream billing cycle".to_string()];

        let claims = extract_claims(&document, 10);
        let dep_claims: Vec<&Claim> = claims.iter().filter(|c| c.section == SECTION_DEPENDENCIES).collect();

        assert_eq!(dep_claims.len(), 1);
        assert_eq!(dep_claims[0].kind, ClaimKind::BehavioralAssertion);
    }

    #[test]
    fn test_section_cap_applies() {
        let mut document = doc();
        document.referenced_components = (0..20).map(|i| format!("Component{}", i)).collect();

        let claims = extract_claims(&document, 5);
        let count = claims.iter().filter(|c| c.section == SECTION_COMPONENTS).count();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_parse_dependency_arrow_form() {
        let (source, targets) = parse_dependency("AuthService -> TokenStore").unwrap();
        assert_eq!(source, "AuthService");
        assert_eq!(targets, vec!["TokenStore".to_string()]);
    }

    #[test]
    fn test_parse_dependency_rejects_prose() {
        assert!(parse_dependency("the billing system is external").is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_doc() -> impl Strategy<Value = BrdDocument> {
            (
                proptest::collection::vec("[A-Za-z ]{1,40}", 0..8),
                proptest::collection::vec("[A-Za-z][A-Za-z0-9]{0,20}", 0..8),
                proptest::collection::vec("[a-z/]{1,30}\\.rs", 0..5),
                "[A-Za-z .]{0,120}",
            )
                .prop_map(|(objectives, components, files, context)| {
                    let mut doc = BrdDocument::new("generated");
                    doc.business_context = context;
                    doc.objectives = objectives;
                    doc.referenced_components = components;
                    doc.referenced_files = files;
                    doc
                })
        }

        proptest! {
            #[test]
            fn prop_claim_ids_deterministic(doc in arbitrary_doc(), cap in 1usize..12) {
                let first: Vec<String> = extract_claims(&doc, cap).into_iter().map(|c| c.id).collect();
                let second: Vec<String> = extract_claims(&doc, cap).into_iter().map(|c| c.id).collect();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn prop_claim_ids_unique(doc in arbitrary_doc(), cap in 1usize..12) {
                let ids: Vec<String> = extract_claims(&doc, cap).into_iter().map(|c| c.id).collect();
                let mut deduped = ids.clone();
                deduped.sort();
                deduped.dedup();
                prop_assert_eq!(ids.len(), deduped.len());
            }
        }
    }

    #[test]
    fn test_minimal_document_yields_no_mechanical_claims() {
        let doc = BrdDocument::minimal("add feature", None);
        let claims = extract_claims(&doc, 10);

        assert!(
            claims
                .iter()
                .all(|c| matches!(c.kind, ClaimKind::BehavioralAssertion | ClaimKind::RequirementDerivation))
        );
    }
}
