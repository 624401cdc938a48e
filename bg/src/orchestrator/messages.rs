//! Typed messages exchanged between agents
//!
//! Every payload is a dedicated variant so the orchestrator's state
//! machine dispatches exhaustively - a new message type is a compile
//! error everywhere it isn't handled. Messages are immutable once
//! created; the orchestrator is the only component that correlates and
//! sequences them.

use serde::Serialize;

use crate::domain::{BrdDocument, DocumentKind};
use crate::verify::VerificationReport;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Generator,
    Verifier,
    Orchestrator,
}

/// A message in the generation loop's trace
#[derive(Debug, Clone, Serialize)]
pub struct AgentMessage {
    /// Sequence number assigned by the orchestrator
    pub seq: u32,

    pub sender: AgentRole,

    /// 1-based loop iteration the message belongs to
    pub iteration: u32,

    pub payload: MessagePayload,
}

/// Typed message payloads
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum MessagePayload {
    /// Orchestrator asks the generator for a draft
    DraftRequest { kind: DocumentKind, is_revision: bool },

    /// Generator delivered a draft
    DraftReady { document_id: String, degraded: bool },

    /// Orchestrator hands a draft to the verifier
    VerifyRequest { document_id: String },

    /// Verifier delivered a verdict
    VerificationReady {
        confidence: f64,
        approved: bool,
        contradicted_claims: usize,
    },

    /// Orchestrator routes failed sections back for revision
    RevisionRequested { flagged_sections: Vec<String> },

    /// A request-level failure (structurally invalid input)
    Failed { reason: String },
}

/// Collects the loop's message trace in sequence order
#[derive(Debug, Default)]
pub struct MessageTrace {
    messages: Vec<AgentMessage>,
}

impl MessageTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message, assigning the next sequence number
    pub fn record(&mut self, sender: AgentRole, iteration: u32, payload: MessagePayload) {
        let seq = self.messages.len() as u32 + 1;
        self.messages.push(AgentMessage {
            seq,
            sender,
            iteration,
            payload,
        });
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<AgentMessage> {
        self.messages
    }
}

/// Convenience constructors used by the orchestrator core
impl MessagePayload {
    pub fn draft_ready(document: &BrdDocument, degraded: bool) -> Self {
        MessagePayload::DraftReady {
            document_id: document.id.clone(),
            degraded,
        }
    }

    pub fn verification_ready(report: &VerificationReport) -> Self {
        MessagePayload::VerificationReady {
            confidence: report.confidence_score,
            approved: report.is_approved,
            contradicted_claims: report.contradicted_claims,
        }
    }
}
