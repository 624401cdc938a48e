//! brdgen - verified planning-document generation
//!
//! brdgen turns a natural-language feature request into a chain of
//! structured planning artifacts - a Business Requirements Document,
//! epics, and backlog stories - by orchestrating a generator agent and a
//! verifier agent over read-only knowledge sources.
//!
//! # Core Concepts
//!
//! - **Verify, then accept**: every BRD draft is decomposed into atomic
//!   claims and each claim is checked against the codebase before the
//!   draft can be accepted
//! - **Degrade, don't fail**: unreachable knowledge sources and failed
//!   LLM calls produce partial context or minimal documents, never
//!   request failures - the pipeline always returns a reviewable artifact
//! - **Bounded revision**: the generate→verify→revise loop runs at most
//!   `max-iterations` cycles and then returns the best draft seen
//!
//! # Modules
//!
//! - [`context`] - context aggregation and token-budget compression
//! - [`generate`] - the generator agent (drafts, revisions, epics, stories)
//! - [`verify`] - the verifier agent (claims, evidence, scoring)
//! - [`orchestrator`] - the generate→verify→revise state machine
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod generate;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod verify;

// Re-export commonly used types
pub use config::{Config, ContextConfig, LlmConfig, SourcesConfig, VerificationConfig};
pub use context::{AggregatedContext, ContextAggregator};
pub use domain::{BrdDocument, DocumentKind, Epic, Requirement, UserStory};
pub use generate::{Generated, GeneratorAgent, RevisionRequest};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use orchestrator::{Decision, GenerationOutcome, LoopState, Orchestrator};
pub use verify::{
    Claim, ClaimKind, EvidenceBundle, EvidenceItem, EvidenceKind, HallucinationRisk, VerificationReport,
    VerificationStatus, VerifierAgent,
};
