//! Verifier agent: claim extraction, evidence collection, scoring

mod claim;
mod evidence;
mod report;
mod verifier;

pub use claim::{Claim, ClaimKind, extract_claims};
pub use evidence::{CodeReference, EvidenceBundle, EvidenceItem, EvidenceKind};
pub use report::{ClaimResult, HallucinationRisk, SectionResult, VerificationReport, VerificationStatus};
pub use verifier::VerifierAgent;
