//! Section and document-level verification results
//!
//! Aggregation rules:
//! - a section is `Verified` iff all of its claims are verified,
//!   `Contradicted` if any claim is contradicted, `PartiallyVerified` on a
//!   mix without contradiction, else `Unverified`
//! - overall confidence is the mean over claims (sections weigh by claim
//!   count, not by length)
//! - hallucination risk: High when any section is contradicted or overall
//!   confidence < 0.4, Medium below the acceptance threshold, Low above

use serde::{Deserialize, Serialize};

use super::claim::Claim;
use super::evidence::{CodeReference, EvidenceBundle, EvidenceItem, EvidenceKind};

/// Verification status of a claim or section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Verified,
    PartiallyVerified,
    Unverified,
    Contradicted,
}

/// Hallucination risk classification, derived - never set directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HallucinationRisk {
    Low,
    Medium,
    High,
}

/// Confidence floor below which risk is High regardless of contradiction
const HIGH_RISK_CONFIDENCE: f64 = 0.4;

/// Verification outcome for one claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResult {
    pub claim: Claim,
    pub status: VerificationStatus,
    pub confidence: f64,
    pub evidence: Vec<EvidenceItem>,
}

impl ClaimResult {
    /// Score a claim from its evidence bundle
    pub fn from_bundle(claim: Claim, bundle: &EvidenceBundle, min_confidence: f64) -> Self {
        let confidence = bundle.aggregate_confidence(min_confidence);

        let status = if bundle.has_contradiction() {
            VerificationStatus::Contradicted
        } else if confidence >= min_confidence {
            VerificationStatus::Verified
        } else if bundle.has_support() || confidence >= min_confidence * 0.5 {
            VerificationStatus::PartiallyVerified
        } else {
            VerificationStatus::Unverified
        };

        Self {
            claim,
            status,
            confidence,
            evidence: bundle.items.clone(),
        }
    }
}

/// Per-section verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult {
    pub section: String,
    pub status: VerificationStatus,
    pub confidence: f64,
    pub claims: Vec<ClaimResult>,

    /// References from supporting evidence
    pub supporting: Vec<CodeReference>,

    /// References from contradicting evidence
    pub contradicting: Vec<CodeReference>,
}

impl SectionResult {
    fn build(section: String, claims: Vec<ClaimResult>) -> Self {
        let total = claims.len();
        let verified = claims.iter().filter(|c| c.status == VerificationStatus::Verified).count();
        let partial = claims
            .iter()
            .filter(|c| c.status == VerificationStatus::PartiallyVerified)
            .count();
        let contradicted = claims.iter().any(|c| c.status == VerificationStatus::Contradicted);

        let status = if contradicted {
            VerificationStatus::Contradicted
        } else if total > 0 && verified == total {
            VerificationStatus::Verified
        } else if verified > 0 || partial > 0 {
            VerificationStatus::PartiallyVerified
        } else {
            VerificationStatus::Unverified
        };

        let confidence = if total == 0 {
            0.0
        } else {
            claims.iter().map(|c| c.confidence).sum::<f64>() / total as f64
        };

        let mut supporting = Vec::new();
        let mut contradicting = Vec::new();
        for claim in &claims {
            for item in &claim.evidence {
                let Some(reference) = &item.reference else { continue };
                match item.kind {
                    EvidenceKind::Supports if !supporting.contains(reference) => {
                        supporting.push(reference.clone());
                    }
                    EvidenceKind::Contradicts if !contradicting.contains(reference) => {
                        contradicting.push(reference.clone());
                    }
                    _ => {}
                }
            }
        }

        Self {
            section,
            status,
            confidence,
            claims,
            supporting,
            contradicting,
        }
    }
}

/// Complete verification verdict for one document draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub sections: Vec<SectionResult>,

    /// Claim-count-weighted mean of per-claim confidences
    pub confidence_score: f64,

    pub status: VerificationStatus,
    pub hallucination_risk: HallucinationRisk,

    pub total_claims: usize,
    pub verified_claims: usize,
    pub contradicted_claims: usize,

    /// 1-based loop iteration this report belongs to
    pub iteration: u32,

    /// Acceptance verdict: confidence above threshold, no contradiction
    pub is_approved: bool,
}

impl VerificationReport {
    /// Build a report from per-claim results, grouped by source section
    ///
    /// Claim results must be in extraction order; grouping preserves it.
    pub fn build(claim_results: Vec<ClaimResult>, min_confidence: f64, iteration: u32) -> Self {
        let total_claims = claim_results.len();
        let verified_claims = claim_results
            .iter()
            .filter(|c| c.status == VerificationStatus::Verified)
            .count();
        let contradicted_claims = claim_results
            .iter()
            .filter(|c| c.status == VerificationStatus::Contradicted)
            .count();

        let confidence_score = if total_claims == 0 {
            0.0
        } else {
            claim_results.iter().map(|c| c.confidence).sum::<f64>() / total_claims as f64
        };

        // Group by section, preserving first-seen order
        let mut sections: Vec<SectionResult> = Vec::new();
        let mut grouped: Vec<(String, Vec<ClaimResult>)> = Vec::new();
        for result in claim_results {
            match grouped.iter_mut().find(|(name, _)| *name == result.claim.section) {
                Some((_, bucket)) => bucket.push(result),
                None => grouped.push((result.claim.section.clone(), vec![result])),
            }
        }
        for (name, bucket) in grouped {
            sections.push(SectionResult::build(name, bucket));
        }

        let any_contradicted = sections.iter().any(|s| s.status == VerificationStatus::Contradicted);
        let all_verified = !sections.is_empty() && sections.iter().all(|s| s.status == VerificationStatus::Verified);

        let status = if any_contradicted {
            VerificationStatus::Contradicted
        } else if all_verified {
            VerificationStatus::Verified
        } else if verified_claims > 0 {
            VerificationStatus::PartiallyVerified
        } else {
            VerificationStatus::Unverified
        };

        let hallucination_risk = if any_contradicted || confidence_score < HIGH_RISK_CONFIDENCE {
            HallucinationRisk::High
        } else if confidence_score < min_confidence {
            HallucinationRisk::Medium
        } else {
            HallucinationRisk::Low
        };

        let is_approved = confidence_score >= min_confidence && !any_contradicted;

        Self {
            sections,
            confidence_score,
            status,
            hallucination_risk,
            total_claims,
            verified_claims,
            contradicted_claims,
            iteration,
            is_approved,
        }
    }

    /// Sections that failed verification and need revision
    pub fn flagged_sections(&self) -> Vec<&SectionResult> {
        self.sections
            .iter()
            .filter(|s| s.status != VerificationStatus::Verified)
            .collect()
    }

    /// Structured feedback for the generator's revision pass
    ///
    /// References only failed sections and their non-verified claims, so a
    /// revision concentrates change on flagged regions and preserves
    /// verified content.
    pub fn revision_feedback(&self) -> String {
        let mut feedback = String::new();

        for section in self.flagged_sections() {
            feedback.push_str(&format!(
                "## Section: {}\nStatus: {:?}, confidence {:.2}\n",
                section.section, section.status, section.confidence
            ));
            for claim in &section.claims {
                if claim.status == VerificationStatus::Verified {
                    continue;
                }
                feedback.push_str(&format!("- [{}] {:?}: {}\n", claim.claim.id, claim.status, claim.claim.text));
                for item in &claim.evidence {
                    if item.kind == EvidenceKind::Contradicts || item.kind == EvidenceKind::NotFound {
                        feedback.push_str(&format!("    evidence: {}\n", item.detail));
                    }
                }
            }
            feedback.push('\n');
        }

        feedback
    }
}
