//! Evidence items and per-claim confidence aggregation
//!
//! An `EvidenceBundle` holds everything gathered for one claim during one
//! verification pass. Bundles are discarded after their aggregate score is
//! folded into the section results - nothing here is persisted.

use serde::{Deserialize, Serialize};

/// How a piece of evidence relates to its claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    Supports,
    Contradicts,
    Inconclusive,
    NotFound,
}

/// A located fact in the codebase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum CodeReference {
    File { path: String, line: Option<u64> },
    GraphNode { name: String },
    GraphEdge { source: String, target: String },
}

impl std::fmt::Display for CodeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeReference::File { path, line: Some(line) } => write!(f, "{}:{}", path, line),
            CodeReference::File { path, line: None } => write!(f, "{}", path),
            CodeReference::GraphNode { name } => write!(f, "graph:{}", name),
            CodeReference::GraphEdge { source, target } => write!(f, "graph:{}->{}", source, target),
        }
    }
}

/// One piece of support or contradiction for a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: EvidenceKind,

    /// Locating reference; absent for inconclusive evidence
    pub reference: Option<CodeReference>,

    /// Confidence in this item, in [0,1]
    pub confidence: f64,

    /// Short human-readable description of what was checked
    pub detail: String,
}

impl EvidenceItem {
    pub fn supports(reference: CodeReference, confidence: f64, detail: impl Into<String>) -> Self {
        Self {
            kind: EvidenceKind::Supports,
            reference: Some(reference),
            confidence,
            detail: detail.into(),
        }
    }

    pub fn contradicts(reference: Option<CodeReference>, confidence: f64, detail: impl Into<String>) -> Self {
        Self {
            kind: EvidenceKind::Contradicts,
            reference,
            confidence,
            detail: detail.into(),
        }
    }

    pub fn inconclusive(detail: impl Into<String>) -> Self {
        Self {
            kind: EvidenceKind::Inconclusive,
            reference: None,
            confidence: 0.5,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            kind: EvidenceKind::NotFound,
            reference: None,
            confidence: 0.0,
            detail: detail.into(),
        }
    }
}

/// Contradicting evidence caps claim confidence at this fraction of the
/// acceptance threshold, keeping contradicted claims strictly below it
/// for any threshold in (0,1].
const CONTRADICTION_CAP: f64 = 0.5;

/// Weight applied to inconclusive evidence in the aggregate
const INCONCLUSIVE_WEIGHT: f64 = 0.5;

/// All evidence gathered for a single claim in one verification pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub claim_id: String,
    pub items: Vec<EvidenceItem>,
}

impl EvidenceBundle {
    pub fn new(claim_id: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            items: vec![],
        }
    }

    pub fn push(&mut self, item: EvidenceItem) {
        self.items.push(item);
    }

    pub fn has_contradiction(&self) -> bool {
        self.items.iter().any(|i| i.kind == EvidenceKind::Contradicts)
    }

    pub fn has_support(&self) -> bool {
        self.items.iter().any(|i| i.kind == EvidenceKind::Supports)
    }

    /// Evidence-weighted aggregate confidence for the claim
    ///
    /// Contradiction dominates: any contradicting item caps the result
    /// below `min_confidence` regardless of supporting volume. A bundle
    /// with zero items scores 0.0 (unverified, never omitted).
    pub fn aggregate_confidence(&self, min_confidence: f64) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }

        if self.has_contradiction() {
            return min_confidence * CONTRADICTION_CAP;
        }

        let sum: f64 = self
            .items
            .iter()
            .map(|item| match item.kind {
                EvidenceKind::Supports => item.confidence,
                EvidenceKind::Inconclusive => item.confidence * INCONCLUSIVE_WEIGHT,
                EvidenceKind::Contradicts | EvidenceKind::NotFound => 0.0,
            })
            .sum();

        sum / self.items.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> CodeReference {
        CodeReference::GraphNode { name: name.to_string() }
    }

    #[test]
    fn test_empty_bundle_scores_zero() {
        let bundle = EvidenceBundle::new("clm-objectives-01");
        assert_eq!(bundle.aggregate_confidence(0.7), 0.0);
    }

    #[test]
    fn test_supporting_evidence_raises_confidence() {
        let mut bundle = EvidenceBundle::new("clm-referenced-components-01");
        bundle.push(EvidenceItem::supports(node("OrderService"), 0.9, "component found"));

        let confidence = bundle.aggregate_confidence(0.7);
        assert!((confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contradiction_dominates_any_support() {
        let mut bundle = EvidenceBundle::new("clm-dependencies-01");
        for _ in 0..10 {
            bundle.push(EvidenceItem::supports(node("X"), 1.0, "support"));
        }
        bundle.push(EvidenceItem::contradicts(None, 0.8, "graph disagrees"));

        let min_confidence = 0.7;
        let confidence = bundle.aggregate_confidence(min_confidence);
        assert!(confidence < min_confidence, "contradiction must cap below threshold");
    }

    #[test]
    fn test_contradiction_caps_for_any_threshold() {
        let mut bundle = EvidenceBundle::new("c");
        bundle.push(EvidenceItem::supports(node("X"), 1.0, "support"));
        bundle.push(EvidenceItem::contradicts(None, 1.0, "contra"));

        for threshold in [0.1, 0.3, 0.5, 0.7, 0.9, 1.0] {
            assert!(bundle.aggregate_confidence(threshold) < threshold);
        }
    }

    #[test]
    fn test_not_found_dilutes_support() {
        let mut supported = EvidenceBundle::new("a");
        supported.push(EvidenceItem::supports(node("X"), 0.8, "found"));

        let mut diluted = EvidenceBundle::new("b");
        diluted.push(EvidenceItem::supports(node("X"), 0.8, "found"));
        diluted.push(EvidenceItem::not_found("second lookup empty"));

        assert!(diluted.aggregate_confidence(0.7) < supported.aggregate_confidence(0.7));
    }

    #[test]
    fn test_inconclusive_scores_between_nothing_and_support() {
        let mut bundle = EvidenceBundle::new("clm-functional-requirements-01");
        bundle.push(EvidenceItem::inconclusive("behavioral assertion"));

        let confidence = bundle.aggregate_confidence(0.7);
        assert!(confidence > 0.0);
        assert!(confidence < 0.7);
    }

    #[test]
    fn test_code_reference_display() {
        assert_eq!(
            CodeReference::File {
                path: "src/auth.rs".to_string(),
                line: Some(42)
            }
            .to_string(),
            "src/auth.rs:42"
        );
        assert_eq!(node("AuthService").to_string(), "graph:AuthService");
        assert_eq!(
            CodeReference::GraphEdge {
                source: "A".to_string(),
                target: "B".to_string()
            }
            .to_string(),
            "graph:A->B"
        );
    }
}
