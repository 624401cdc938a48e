//! Multi-agent orchestrator

mod core;
mod messages;

pub use core::{Decision, GenerationOutcome, LoopState, Orchestrator, decide};
pub use messages::{AgentMessage, AgentRole, MessagePayload, MessageTrace};
