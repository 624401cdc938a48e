//! Token-budget compression of aggregated context
//!
//! Compression shrinks the implementation view until the serialized
//! context fits the budget. Architecture data and the request text are
//! never dropped. The operation is idempotent: re-compressing an
//! already-compressed context yields an identical value.

use tracing::{debug, info};

use super::model::{AggregatedContext, FileContext};

/// Content length above which a file body gets truncated
const TRUNCATE_THRESHOLD_CHARS: usize = 1_000;

/// Head/tail kept when truncating a file body
const TRUNCATE_HEAD_CHARS: usize = 500;
const TRUNCATE_TAIL_CHARS: usize = 400;

const TRUNCATION_MARKER: &str = "\n... [truncated] ...\n";

/// Compress context to fit the token budget
///
/// Applies strategies in order, rechecking the budget after each step:
/// 1. truncate file contents, lowest relevance first
/// 2. drop whole files, lowest relevance first
/// 3. trim similar-feature matches
pub fn compress(ctx: &AggregatedContext, max_tokens: usize) -> AggregatedContext {
    if ctx.estimated_tokens() <= max_tokens {
        return ctx.clone();
    }

    info!(
        estimated = ctx.estimated_tokens(),
        budget = max_tokens,
        "compress: context exceeds token budget"
    );

    let mut out = ctx.clone();

    // Ascending relevance, stable on ties so repeated runs agree
    let mut order: Vec<usize> = (0..out.implementation.key_files.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = &out.implementation.key_files[a];
        let fb = &out.implementation.key_files[b];
        fa.relevance_score.partial_cmp(&fb.relevance_score).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });

    // Strategy 1: truncate file contents
    for &idx in &order {
        if out.estimated_tokens() <= max_tokens {
            break;
        }
        truncate_file(&mut out.implementation.key_files[idx]);
    }

    // Strategy 2: drop whole files
    let mut drop_order = order.clone();
    while out.estimated_tokens() > max_tokens {
        let Some(idx) = drop_order.first().copied() else {
            break;
        };
        drop_order.remove(0);
        // Adjust remaining indices after removal
        for i in drop_order.iter_mut() {
            if *i > idx {
                *i -= 1;
            }
        }
        let dropped = out.implementation.key_files.remove(idx);
        debug!(path = %dropped.path, score = dropped.relevance_score, "compress: dropped file");
    }

    // Strategy 3: trim similar features
    while out.estimated_tokens() > max_tokens && !out.similar_features.is_empty() {
        out.similar_features.pop();
    }

    info!(estimated = out.estimated_tokens(), "compress: done");
    out
}

fn truncate_file(file: &mut FileContext) {
    let chars: Vec<char> = file.content.chars().collect();
    if chars.len() <= TRUNCATE_THRESHOLD_CHARS {
        return;
    }

    let head: String = chars[..TRUNCATE_HEAD_CHARS].iter().collect();
    let tail: String = chars[chars.len() - TRUNCATE_TAIL_CHARS..].iter().collect();
    file.content = format!("{}{}{}", head, TRUNCATION_MARKER, tail);
    file.truncated = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::model::{ArchitectureView, ComponentInfo, ImplementationView};
    use proptest::prelude::*;

    fn context_with_files(files: Vec<(f64, usize)>) -> AggregatedContext {
        AggregatedContext {
            request: "add oauth login".to_string(),
            architecture: ArchitectureView {
                components: vec![ComponentInfo {
                    name: "AuthService".to_string(),
                    kind: "service".to_string(),
                    path: "src/auth.rs".to_string(),
                    description: String::new(),
                    dependencies: vec![],
                }],
                dependencies: Default::default(),
                api_contracts: vec![],
            },
            implementation: ImplementationView {
                key_files: files
                    .into_iter()
                    .enumerate()
                    .map(|(i, (score, len))| FileContext {
                        path: format!("src/file{}.rs", i),
                        content: "x".repeat(len),
                        relevance: String::new(),
                        relevance_score: score,
                        truncated: false,
                    })
                    .collect(),
                patterns: vec![],
            },
            similar_features: vec!["existing-sso".to_string(), "session-cache".to_string()],
            advisories: vec![],
        }
    }

    #[test]
    fn test_under_budget_is_untouched() {
        let ctx = context_with_files(vec![(0.9, 100)]);
        let compressed = compress(&ctx, 1_000_000);
        assert_eq!(compressed, ctx);
    }

    #[test]
    fn test_lowest_relevance_truncated_first() {
        let ctx = context_with_files(vec![(0.9, 40_000), (0.1, 40_000)]);
        // Budget forces one truncation but not two
        let compressed = compress(&ctx, ctx.estimated_tokens() - 5_000);

        assert!(compressed.implementation.key_files[1].truncated);
        assert!(!compressed.implementation.key_files[0].truncated);
    }

    #[test]
    fn test_request_and_architecture_survive_any_budget() {
        let ctx = context_with_files(vec![(0.5, 50_000), (0.7, 50_000)]);
        let compressed = compress(&ctx, 1);

        assert_eq!(compressed.request, ctx.request);
        assert_eq!(compressed.architecture, ctx.architecture);
    }

    #[test]
    fn test_files_dropped_when_truncation_insufficient() {
        let ctx = context_with_files(vec![(0.2, 60_000), (0.8, 200)]);
        let compressed = compress(&ctx, 100);

        // The low-relevance file goes entirely before the high-relevance one
        assert!(
            compressed.implementation.key_files.is_empty()
                || compressed.implementation.key_files[0].relevance_score > 0.5
        );
    }

    #[test]
    fn test_compress_idempotent_at_tight_budget() {
        let ctx = context_with_files(vec![(0.3, 30_000), (0.6, 30_000), (0.9, 30_000)]);
        let once = compress(&ctx, 2_000);
        let twice = compress(&once, 2_000);
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn prop_compress_idempotent(
            scores in proptest::collection::vec((0.0f64..1.0, 0usize..5_000), 0..6),
            budget in 1usize..10_000,
        ) {
            let ctx = context_with_files(scores);
            let once = compress(&ctx, budget);
            let twice = compress(&once, budget);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_compress_never_drops_request(
            scores in proptest::collection::vec((0.0f64..1.0, 0usize..5_000), 0..6),
            budget in 1usize..10_000,
        ) {
            let ctx = context_with_files(scores);
            let compressed = compress(&ctx, budget);
            prop_assert_eq!(compressed.request, ctx.request);
            prop_assert_eq!(compressed.architecture, ctx.architecture);
        }
    }
}
