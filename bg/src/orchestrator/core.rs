//! Multi-agent orchestrator - the generate→verify→revise loop
//!
//! One request runs strictly sequentially: each draft is verified before
//! the next is considered, and only the iteration counter, the best draft
//! seen, and the revision feedback cross loop turns. The termination
//! policy is a pure function of (report, iteration, config) - no hidden
//! randomness, so a fixed sequence of verification results always
//! terminates identically.
//!
//! Cancellation: dropping the future returned by [`Orchestrator::generate`]
//! abandons in-flight evidence lookups; the knowledge source clients hold
//! no per-request state, so nothing is left to corrupt.

use eyre::{Result, bail};
use tracing::{info, warn};

use crate::config::VerificationConfig;
use crate::context::ContextAggregator;
use crate::domain::{BrdDocument, DocumentKind, Epic, validate_dependency_graph};
use crate::generate::{EpicSet, GeneratorAgent, RevisionRequest, StorySet};
use crate::verify::{HallucinationRisk, VerificationReport, VerifierAgent};

use super::messages::{AgentMessage, AgentRole, MessagePayload, MessageTrace};

/// Loop states for one generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Drafting,
    Verifying,
    Accepted,
    Revising,
    Exhausted,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Accepted | LoopState::Exhausted)
    }
}

/// Verdict of the termination policy after one verification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Revise,
    Exhaust,
}

/// Pure termination policy
///
/// Accept when the report clears the threshold with no contradicted
/// section; otherwise revise while iterations remain, exhaust at the cap.
pub fn decide(report: &VerificationReport, iteration: u32, config: &VerificationConfig) -> Decision {
    if report.is_approved {
        Decision::Accept
    } else if iteration < config.max_iterations {
        Decision::Revise
    } else {
        Decision::Exhaust
    }
}

/// Final result of one generation request
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub document: BrdDocument,

    /// Whether the returned document passed verification
    pub is_verified: bool,

    pub confidence_score: f64,
    pub hallucination_risk: HallucinationRisk,

    /// Drafting cycles executed (1-based)
    pub iterations_used: u32,

    /// Whether the returned document came from a degraded generation
    pub degraded: bool,

    /// Full evidence report, when configured via `include_evidence`
    pub evidence: Option<VerificationReport>,
}

/// Best draft seen across loop turns
struct BestDraft {
    document: BrdDocument,
    report: VerificationReport,
    degraded: bool,
}

/// Drives the generator and verifier agents for one request at a time
pub struct Orchestrator {
    aggregator: ContextAggregator,
    generator: GeneratorAgent,
    verifier: VerifierAgent,
    config: VerificationConfig,
}

impl Orchestrator {
    pub fn new(
        aggregator: ContextAggregator,
        generator: GeneratorAgent,
        verifier: VerifierAgent,
        config: VerificationConfig,
    ) -> Self {
        Self {
            aggregator,
            generator,
            verifier,
            config,
        }
    }

    /// Generate a verified BRD for a feature request
    ///
    /// The only outright failure is structurally invalid input (blank
    /// request text). Everything downstream degrades into the returned
    /// outcome instead of erroring.
    pub async fn generate(&self, request_text: &str, affected_components: &[String]) -> Result<GenerationOutcome> {
        let (outcome, _trace) = self.generate_traced(request_text, affected_components).await?;
        Ok(outcome)
    }

    /// Like [`generate`](Self::generate), also returning the message trace
    pub async fn generate_traced(
        &self,
        request_text: &str,
        affected_components: &[String],
    ) -> Result<(GenerationOutcome, Vec<AgentMessage>)> {
        if request_text.trim().is_empty() {
            bail!("request text must not be empty");
        }

        info!(request_len = request_text.len(), "generate: starting");

        // Built once per request; revisions only append advisories
        let context = self.aggregator.build_context(request_text, affected_components, true).await;

        let mut trace = MessageTrace::new();
        let mut state = LoopState::Drafting;
        let mut iteration: u32 = 1;
        let mut revision: Option<RevisionRequest> = None;
        let mut current_context = context;

        let mut current: Option<(BrdDocument, bool)> = None;
        let mut last_report: Option<VerificationReport> = None;
        let mut best: Option<BestDraft> = None;

        while !state.is_terminal() {
            match state {
                LoopState::Drafting => {
                    trace.record(
                        AgentRole::Orchestrator,
                        iteration,
                        MessagePayload::DraftRequest {
                            kind: DocumentKind::Brd,
                            is_revision: revision.is_some(),
                        },
                    );

                    let draft = self.generator.generate_brd(&current_context, revision.as_ref()).await;
                    let degraded = draft.is_degraded();
                    let document = draft.into_value();

                    if degraded {
                        trace.record(
                            AgentRole::Generator,
                            iteration,
                            MessagePayload::Failed {
                                reason: "generator degraded to minimal document".to_string(),
                            },
                        );
                    }
                    trace.record(AgentRole::Generator, iteration, MessagePayload::draft_ready(&document, degraded));

                    current = Some((document, degraded));
                    state = LoopState::Verifying;
                }

                LoopState::Verifying => {
                    let (document, degraded) = current.as_ref().expect("draft present in Verifying");

                    trace.record(
                        AgentRole::Orchestrator,
                        iteration,
                        MessagePayload::VerifyRequest {
                            document_id: document.id.clone(),
                        },
                    );

                    let report = self.verifier.verify_document(document, iteration).await;
                    trace.record(AgentRole::Verifier, iteration, MessagePayload::verification_ready(&report));

                    // Strictly-greater keeps the earliest draft on ties, so
                    // the policy stays deterministic
                    let better = best
                        .as_ref()
                        .map(|b| report.confidence_score > b.report.confidence_score)
                        .unwrap_or(true);
                    if better {
                        best = Some(BestDraft {
                            document: document.clone(),
                            report: report.clone(),
                            degraded: *degraded,
                        });
                    }

                    let decision = decide(&report, iteration, &self.config);
                    info!(
                        iteration,
                        confidence = report.confidence_score,
                        ?decision,
                        "generate: verification pass complete"
                    );

                    last_report = Some(report);
                    state = match decision {
                        Decision::Accept => LoopState::Accepted,
                        Decision::Revise => LoopState::Revising,
                        Decision::Exhaust => LoopState::Exhausted,
                    };
                }

                LoopState::Revising => {
                    let report = last_report.as_ref().expect("report present in Revising");
                    let flagged: Vec<String> = report.flagged_sections().iter().map(|s| s.section.clone()).collect();

                    trace.record(
                        AgentRole::Orchestrator,
                        iteration,
                        MessagePayload::RevisionRequested {
                            flagged_sections: flagged.clone(),
                        },
                    );

                    revision = Some(RevisionRequest {
                        feedback: report.revision_feedback(),
                        flagged_sections: flagged.clone(),
                    });
                    current_context = current_context
                        .with_advisory(format!("iteration {}: revise sections [{}]", iteration, flagged.join(", ")));

                    iteration += 1;
                    state = LoopState::Drafting;
                }

                LoopState::Accepted | LoopState::Exhausted => unreachable!("terminal states exit the loop"),
            }
        }

        let accepted = state == LoopState::Accepted;
        let outcome = if accepted {
            let (document, degraded) = current.expect("draft present at acceptance");
            let report = last_report.expect("report present at acceptance");
            self.build_outcome(document, report, degraded, iteration, true)
        } else {
            // Exhausted: return the best-scoring draft seen, tagged unverified
            warn!(iterations = iteration, "generate: iteration budget exhausted, returning best draft");
            let best = best.expect("at least one draft was verified");
            self.build_outcome(best.document, best.report, best.degraded, iteration, false)
        };

        Ok((outcome, trace.into_messages()))
    }

    fn build_outcome(
        &self,
        document: BrdDocument,
        report: VerificationReport,
        degraded: bool,
        iterations_used: u32,
        is_verified: bool,
    ) -> GenerationOutcome {
        GenerationOutcome {
            document,
            is_verified,
            confidence_score: report.confidence_score,
            hallucination_risk: report.hallucination_risk,
            iterations_used,
            degraded,
            evidence: if self.config.include_evidence { Some(report) } else { None },
        }
    }

    /// Derive epics from an approved BRD (no verification pass)
    ///
    /// The `blocked_by` graph is validated acyclic; on a cycle the edges
    /// of the cycle members are stripped and a warning recorded, keeping
    /// the artifact reviewable.
    pub async fn generate_epics(&self, document: &BrdDocument) -> Result<EpicSet> {
        let mut set = self.generator.generate_epics(document).await.into_value();

        if let Err(cycle) = validate_dependency_graph(set.epics.iter().map(|e| (e.id.as_str(), e.blocked_by.as_slice())))
        {
            warn!(?cycle, "generate_epics: dependency cycle, stripping affected edges");
            for epic in set.epics.iter_mut() {
                if cycle.contains(&epic.id) {
                    epic.blocked_by.clear();
                }
            }
            set.warnings.push(format!("dependency cycle broken: [{}]", cycle.join(" -> ")));
        }

        Ok(set)
    }

    /// Derive backlog stories from approved epics (no verification pass)
    pub async fn generate_backlogs(&self, epics: &[Epic]) -> Result<StorySet> {
        let mut set = self.generator.generate_backlogs(epics).await.into_value();

        if let Err(cycle) =
            validate_dependency_graph(set.stories.iter().map(|s| (s.id.as_str(), s.blocked_by.as_slice())))
        {
            warn!(?cycle, "generate_backlogs: dependency cycle, stripping affected edges");
            for story in set.stories.iter_mut() {
                if cycle.contains(&story.id) {
                    story.blocked_by.clear();
                }
            }
            set.warnings.push(format!("dependency cycle broken: [{}]", cycle.join(" -> ")));
        }

        Ok(set)
    }
}
