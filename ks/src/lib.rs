//! KnowledgeStore - read-only knowledge sources for codebase facts
//!
//! Two capability interfaces over a codebase, consumed by brdgen's
//! aggregation and verification layers:
//!
//! - [`StructureSource`] - structural queries against a code-graph service
//!   (components, relationships, dependencies, similar features)
//! - [`ContentSource`] - file-level access to a repository checkout
//!   (read, list, pattern search)
//!
//! Clients are stateless apart from connection handles and are safe to
//! share across concurrent requests. They report failures as
//! [`SourceError`]; degrading a failure into an empty result is the
//! caller's decision, not the client's.

pub mod content;
pub mod error;
pub mod structure;
pub mod types;

pub use content::{ContentSource, LocalContentSource};
pub use error::SourceError;
pub use structure::{GraphClient, StructureSource};
pub use types::{
    ComponentNode, DependencyView, DirEntry, FileMatch, Relationship, SimilarMatch, StructureView,
};
