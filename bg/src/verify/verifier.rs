//! Verifier agent - evidence collection and document verification
//!
//! Dispatches each claim to the knowledge source that can check it.
//! Source failures never propagate: an unreachable source yields
//! `NotFound` evidence and the claim scores as unverified. Evidence
//! lookups within one pass are independent and run concurrently up to a
//! configured limit.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info};

use knowledgestore::{ContentSource, StructureSource};

use super::claim::{Claim, ClaimKind, extract_claims};
use super::evidence::{CodeReference, EvidenceBundle, EvidenceItem};
use super::report::{ClaimResult, VerificationReport};
use crate::config::VerificationConfig;
use crate::domain::BrdDocument;

/// Confidence assigned to a direct graph hit for a component
const GRAPH_HIT_CONFIDENCE: f64 = 0.9;

/// Confidence assigned to a direct file read
const FILE_HIT_CONFIDENCE: f64 = 0.95;

/// Confidence when a referenced file is only found at another path
const FILE_MOVED_CONFIDENCE: f64 = 0.6;

/// Confidence of positive-absence contradictions
const ABSENCE_CONFIDENCE: f64 = 0.8;

/// The verifier agent
///
/// Owns no request state: claims and evidence bundles live only for the
/// duration of one `verify_document` call, so one verifier can serve many
/// concurrent requests and abandoned calls leave nothing behind.
pub struct VerifierAgent {
    graph: Arc<dyn StructureSource>,
    files: Arc<dyn ContentSource>,
    config: VerificationConfig,
}

impl VerifierAgent {
    /// Create a verifier over injected knowledge source clients
    pub fn new(graph: Arc<dyn StructureSource>, files: Arc<dyn ContentSource>, config: VerificationConfig) -> Self {
        Self { graph, files, config }
    }

    /// Verify a whole document draft
    ///
    /// Extracts claims, gathers evidence concurrently (bounded by
    /// `max_evidence_lookups`), and aggregates into a report. Results are
    /// re-ordered back to extraction order so reports are reproducible
    /// regardless of lookup completion order.
    pub async fn verify_document(&self, doc: &BrdDocument, iteration: u32) -> VerificationReport {
        let claims = extract_claims(doc, self.config.max_claims_per_section);
        info!(claims = claims.len(), iteration, "verify_document: extracted claims");

        let min_confidence = self.config.min_confidence;

        let mut results: Vec<ClaimResult> = futures::stream::iter(claims.into_iter().map(|claim| async move {
            let bundle = self.verify_claim(&claim).await;
            ClaimResult::from_bundle(claim, &bundle, min_confidence)
        }))
        .buffer_unordered(self.config.max_evidence_lookups)
        .collect()
        .await;

        results.sort_by(|a, b| a.claim.id.cmp(&b.claim.id));

        let report = VerificationReport::build(results, min_confidence, iteration);
        info!(
            confidence = report.confidence_score,
            approved = report.is_approved,
            risk = ?report.hallucination_risk,
            "verify_document: done"
        );
        report
    }

    /// Gather evidence for a single claim
    ///
    /// Dispatches on claim kind. Behavioral assertions and requirement
    /// derivations cannot be mechanically checked and are marked
    /// inconclusive by design, never silently verified.
    pub async fn verify_claim(&self, claim: &Claim) -> EvidenceBundle {
        debug!(id = %claim.id, kind = ?claim.kind, "verify_claim: called");
        let mut bundle = EvidenceBundle::new(&claim.id);

        match claim.kind {
            ClaimKind::ComponentExistence => self.check_component(claim, &mut bundle).await,
            ClaimKind::DependencyRelationship => self.check_dependency(claim, &mut bundle).await,
            ClaimKind::FileReference => self.check_file(claim, &mut bundle).await,
            ClaimKind::BehavioralAssertion => {
                bundle.push(EvidenceItem::inconclusive(
                    "behavioral assertion cannot be mechanically checked",
                ));
            }
            ClaimKind::RequirementDerivation => {
                bundle.push(EvidenceItem::inconclusive(
                    "requirement derivation cannot be mechanically checked",
                ));
            }
        }

        bundle
    }

    async fn check_component(&self, claim: &Claim, bundle: &mut EvidenceBundle) {
        let scope = vec![claim.subject.clone()];
        match self.graph.query_structure(&scope).await {
            Ok(view) => {
                if let Some(node) = view.find_component(&claim.subject) {
                    bundle.push(EvidenceItem::supports(
                        CodeReference::GraphNode { name: node.name.clone() },
                        GRAPH_HIT_CONFIDENCE,
                        format!("component `{}` present in code graph", node.name),
                    ));
                } else {
                    bundle.push(EvidenceItem::not_found(format!(
                        "component `{}` not present in code graph",
                        claim.subject
                    )));
                }
            }
            Err(e) => {
                debug!(error = %e, "check_component: graph query failed");
                bundle.push(EvidenceItem::not_found(format!("structural source unavailable: {}", e)));
            }
        }
    }

    async fn check_dependency(&self, claim: &Claim, bundle: &mut EvidenceBundle) {
        let Some(target) = claim.object.as_deref() else {
            bundle.push(EvidenceItem::inconclusive("dependency claim without a target"));
            return;
        };

        match self.graph.get_dependencies(&claim.subject).await {
            Ok(deps) => {
                if deps.depends_on(target) {
                    bundle.push(EvidenceItem::supports(
                        CodeReference::GraphEdge {
                            source: claim.subject.clone(),
                            target: target.to_string(),
                        },
                        GRAPH_HIT_CONFIDENCE,
                        format!("graph records `{}` -> `{}`", claim.subject, target),
                    ));
                } else if !deps.upstream.is_empty() {
                    // The graph knows this component's dependencies and the
                    // claimed one is not among them
                    bundle.push(EvidenceItem::contradicts(
                        Some(CodeReference::GraphNode {
                            name: claim.subject.clone(),
                        }),
                        ABSENCE_CONFIDENCE,
                        format!(
                            "`{}` depends on [{}], not `{}`",
                            claim.subject,
                            deps.upstream.join(", "),
                            target
                        ),
                    ));
                } else {
                    bundle.push(EvidenceItem::not_found(format!(
                        "no dependency records for `{}`",
                        claim.subject
                    )));
                }
            }
            Err(e) => {
                debug!(error = %e, "check_dependency: graph query failed");
                bundle.push(EvidenceItem::not_found(format!("structural source unavailable: {}", e)));
            }
        }
    }

    async fn check_file(&self, claim: &Claim, bundle: &mut EvidenceBundle) {
        match self.files.read_file(&claim.subject).await {
            Ok(_) => {
                bundle.push(EvidenceItem::supports(
                    CodeReference::File {
                        path: claim.subject.clone(),
                        line: None,
                    },
                    FILE_HIT_CONFIDENCE,
                    format!("file `{}` readable in checkout", claim.subject),
                ));
                return;
            }
            Err(e) if e.is_connection() => {
                bundle.push(EvidenceItem::not_found(format!("content source unavailable: {}", e)));
                return;
            }
            Err(_) => {}
        }

        // Not at the stated path; search for the basename before concluding
        let basename = claim.subject.rsplit('/').next().unwrap_or(&claim.subject);
        match self
            .files
            .search_files(&regex::escape(basename), &format!(".:{}", basename), 3)
            .await
        {
            Ok(matches) if !matches.is_empty() => {
                bundle.push(EvidenceItem::supports(
                    CodeReference::File {
                        path: matches[0].path.clone(),
                        line: Some(matches[0].line),
                    },
                    FILE_MOVED_CONFIDENCE,
                    format!("`{}` found at `{}`, not at stated path", basename, matches[0].path),
                ));
            }
            Ok(_) => {
                bundle.push(EvidenceItem::contradicts(
                    None,
                    ABSENCE_CONFIDENCE,
                    format!("file `{}` not present in checkout", claim.subject),
                ));
            }
            Err(e) => {
                debug!(error = %e, "check_file: search failed");
                bundle.push(EvidenceItem::not_found(format!("content source unavailable: {}", e)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowledgestore::{
        ComponentNode, DependencyView, DirEntry, FileMatch, SimilarMatch, SourceError, StructureView,
    };

    /// Graph fixture: knows OrderService (depends on PaymentGateway)
    struct FixtureGraph {
        unreachable: bool,
    }

    #[async_trait]
    impl StructureSource for FixtureGraph {
        async fn query_structure(&self, scope: &[String]) -> Result<StructureView, SourceError> {
            if self.unreachable {
                return Err(SourceError::Connection("refused".to_string()));
            }
            let known = ComponentNode {
                name: "OrderService".to_string(),
                kind: "service".to_string(),
                path: "src/orders.rs".to_string(),
                description: String::new(),
                page_rank: 0.5,
            };
            let components = if scope.is_empty() || scope.iter().any(|s| s.eq_ignore_ascii_case("OrderService")) {
                vec![known]
            } else {
                vec![]
            };
            Ok(StructureView {
                components,
                relationships: vec![],
            })
        }

        async fn get_dependencies(&self, component: &str) -> Result<DependencyView, SourceError> {
            if self.unreachable {
                return Err(SourceError::Connection("refused".to_string()));
            }
            if component == "OrderService" {
                Ok(DependencyView {
                    upstream: vec!["PaymentGateway".to_string()],
                    downstream: vec![],
                })
            } else {
                Ok(DependencyView::default())
            }
        }

        async fn search_similar(&self, _text: &str, _limit: usize) -> Result<Vec<SimilarMatch>, SourceError> {
            Ok(vec![])
        }
    }

    /// Content fixture: only src/orders.rs exists
    struct FixtureContent;

    #[async_trait]
    impl ContentSource for FixtureContent {
        async fn read_file(&self, path: &str) -> Result<String, SourceError> {
            if path == "src/orders.rs" {
                Ok("pub struct OrderService;".to_string())
            } else {
                Err(SourceError::NotFound(path.to_string()))
            }
        }

        async fn list_directory(&self, _path: &str) -> Result<Vec<DirEntry>, SourceError> {
            Ok(vec![])
        }

        async fn search_files(
            &self,
            pattern: &str,
            _root: &str,
            _max: usize,
        ) -> Result<Vec<FileMatch>, SourceError> {
            if pattern.contains("orders") {
                Ok(vec![FileMatch {
                    path: "src/orders.rs".to_string(),
                    line: 1,
                    text: "pub struct OrderService;".to_string(),
                }])
            } else {
                Ok(vec![])
            }
        }
    }

    fn verifier(unreachable: bool) -> VerifierAgent {
        VerifierAgent::new(
            Arc::new(FixtureGraph { unreachable }),
            Arc::new(FixtureContent),
            VerificationConfig::default(),
        )
    }

    fn claim(kind: ClaimKind, subject: &str, object: Option<&str>) -> Claim {
        Claim {
            id: "clm-test-01".to_string(),
            kind,
            text: subject.to_string(),
            section: "test".to_string(),
            subject: subject.to_string(),
            object: object.map(|o| o.to_string()),
        }
    }

    #[tokio::test]
    async fn test_component_existence_supported() {
        let bundle = verifier(false)
            .verify_claim(&claim(ClaimKind::ComponentExistence, "OrderService", None))
            .await;

        assert!(bundle.has_support());
        assert!(bundle.aggregate_confidence(0.7) >= 0.7);
    }

    #[tokio::test]
    async fn test_component_existence_not_found() {
        let bundle = verifier(false)
            .verify_claim(&claim(ClaimKind::ComponentExistence, "GhostService", None))
            .await;

        assert!(!bundle.has_support());
        assert!(!bundle.has_contradiction());
        assert_eq!(bundle.aggregate_confidence(0.7), 0.0);
    }

    #[tokio::test]
    async fn test_dependency_supported() {
        let bundle = verifier(false)
            .verify_claim(&claim(
                ClaimKind::DependencyRelationship,
                "OrderService",
                Some("PaymentGateway"),
            ))
            .await;

        assert!(bundle.has_support());
    }

    #[tokio::test]
    async fn test_dependency_contradicted_when_graph_disagrees() {
        let bundle = verifier(false)
            .verify_claim(&claim(
                ClaimKind::DependencyRelationship,
                "OrderService",
                Some("EmailService"),
            ))
            .await;

        assert!(bundle.has_contradiction());
        assert!(bundle.aggregate_confidence(0.7) < 0.7);
    }

    #[tokio::test]
    async fn test_file_reference_supported() {
        let bundle = verifier(false)
            .verify_claim(&claim(ClaimKind::FileReference, "src/orders.rs", None))
            .await;

        assert!(bundle.has_support());
    }

    #[tokio::test]
    async fn test_missing_file_found_elsewhere_scores_lower() {
        let bundle = verifier(false)
            .verify_claim(&claim(ClaimKind::FileReference, "lib/orders.rs", None))
            .await;

        assert!(bundle.has_support());
        let confidence = bundle.aggregate_confidence(0.7);
        assert!(confidence < FILE_HIT_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_missing_file_contradicted() {
        let bundle = verifier(false)
            .verify_claim(&claim(ClaimKind::FileReference, "src/ghost.rs", None))
            .await;

        assert!(bundle.has_contradiction());
    }

    #[tokio::test]
    async fn test_behavioral_claim_inconclusive_by_design() {
        let bundle = verifier(false)
            .verify_claim(&claim(ClaimKind::BehavioralAssertion, "retries 3 times", None))
            .await;

        assert!(!bundle.has_support());
        assert!(!bundle.has_contradiction());
        let confidence = bundle.aggregate_confidence(0.7);
        assert!(confidence > 0.0 && confidence < 0.7);
    }

    #[tokio::test]
    async fn test_unreachable_graph_degrades_to_not_found() {
        let bundle = verifier(true)
            .verify_claim(&claim(ClaimKind::ComponentExistence, "OrderService", None))
            .await;

        // Never propagates the connection error
        assert!(!bundle.items.is_empty());
        assert!(!bundle.has_support());
        assert_eq!(bundle.aggregate_confidence(0.7), 0.0);
    }

    #[tokio::test]
    async fn test_verify_document_report_reproducible() {
        let mut doc = BrdDocument::new("Orders");
        doc.business_context = "Touches OrderService heavily.".to_string();
        doc.referenced_components = vec!["OrderService".to_string(), "GhostService".to_string()];
        doc.referenced_files = vec!["src/orders.rs".to_string()];
        doc.dependencies = vec!["OrderService depends on PaymentGateway".to_string()];

        let agent = verifier(false);
        let first = agent.verify_document(&doc, 1).await;
        let second = agent.verify_document(&doc, 1).await;

        let ids = |report: &VerificationReport| -> Vec<String> {
            report
                .sections
                .iter()
                .flat_map(|s| s.claims.iter().map(|c| c.claim.id.clone()))
                .collect()
        };

        assert_eq!(ids(&first), ids(&second));
        assert!((first.confidence_score - second.confidence_score).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_verify_document_counts_every_claim() {
        let mut doc = BrdDocument::new("Orders");
        doc.referenced_components = vec!["OrderService".to_string(), "GhostService".to_string()];

        let report = verifier(false).verify_document(&doc, 1).await;
        assert_eq!(report.total_claims, 2);
        assert_eq!(report.verified_claims, 1);
    }
}
