//! Context aggregation from the structural and content knowledge sources
//!
//! `build_context` is infallible by contract: an unreachable source
//! degrades that section of the context to empty/partial instead of
//! failing the request. The generation pipeline always gets a well-formed
//! `AggregatedContext` to work with.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use knowledgestore::{ContentSource, StructureSource, StructureView};

use super::compress::compress;
use super::model::{AggregatedContext, ApiContract, ArchitectureView, ComponentInfo, FileContext, ImplementationView};
use crate::config::ContextConfig;

/// Weight of keyword relevance vs structural importance in file ranking
const KEYWORD_WEIGHT: f64 = 0.7;
const PAGERANK_WEIGHT: f64 = 0.3;

/// Aggregates request-relevant context from both knowledge sources
pub struct ContextAggregator {
    graph: Arc<dyn StructureSource>,
    files: Arc<dyn ContentSource>,
    config: ContextConfig,
}

impl ContextAggregator {
    /// Create an aggregator over injected knowledge source clients
    pub fn new(graph: Arc<dyn StructureSource>, files: Arc<dyn ContentSource>, config: ContextConfig) -> Self {
        Self { graph, files, config }
    }

    /// Build aggregated context for one generation request
    ///
    /// Never fails: every knowledge source error is logged and the
    /// affected section left empty or partial.
    pub async fn build_context(
        &self,
        request: &str,
        affected_components: &[String],
        include_similar: bool,
    ) -> AggregatedContext {
        info!(request_len = request.len(), scoped = !affected_components.is_empty(), "build_context: called");

        let keywords = if affected_components.is_empty() {
            extract_keywords(request)
        } else {
            affected_components.to_vec()
        };

        let architecture = self.build_architecture(affected_components, &keywords).await;
        let implementation = self.build_implementation(&architecture, &keywords).await;

        let similar_features = if include_similar && self.config.include_similar {
            self.find_similar(request).await
        } else {
            vec![]
        };

        let ctx = AggregatedContext {
            request: request.to_string(),
            architecture,
            implementation,
            similar_features,
            advisories: vec![],
        };

        if ctx.estimated_tokens() > self.config.max_tokens {
            warn!(
                estimated = ctx.estimated_tokens(),
                budget = self.config.max_tokens,
                "build_context: compressing oversized context"
            );
            return compress(&ctx, self.config.max_tokens);
        }

        ctx
    }

    /// Query the structural graph, scoped to the affected components
    async fn build_architecture(&self, scope: &[String], keywords: &[String]) -> ArchitectureView {
        let view = match self.graph.query_structure(scope).await {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, "build_architecture: structural query failed, degrading to empty view");
                StructureView::default()
            }
        };

        let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
        for rel in &view.relationships {
            let entry = dependencies.entry(rel.source.clone()).or_default();
            if !entry.contains(&rel.target) {
                entry.push(rel.target.clone());
            }
        }

        let mut components = Vec::new();
        let mut api_contracts = Vec::new();

        for node in &view.components {
            if is_endpoint_kind(&node.kind) {
                api_contracts.push(parse_api_contract(node.name.as_str(), node.path.as_str()));
                continue;
            }
            components.push(ComponentInfo {
                name: node.name.clone(),
                kind: node.kind.clone(),
                path: node.path.clone(),
                description: node.description.clone(),
                dependencies: dependencies.get(&node.name).cloned().unwrap_or_default(),
            });
        }

        // Rank by combined keyword relevance and structural importance so
        // the implementation view reads the most relevant files first
        components.sort_by(|a, b| {
            let score_a = component_relevance(a, keywords, &view);
            let score_b = component_relevance(b, keywords, &view);
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            components = components.len(),
            contracts = api_contracts.len(),
            "build_architecture: done"
        );

        ArchitectureView {
            components,
            dependencies,
            api_contracts,
        }
    }

    /// Read source files for the highest-relevance components
    async fn build_implementation(&self, architecture: &ArchitectureView, keywords: &[String]) -> ImplementationView {
        let mut key_files = Vec::new();
        let mut seen_paths = Vec::new();

        for component in &architecture.components {
            if key_files.len() >= self.config.max_files {
                break;
            }
            if component.path.is_empty() || seen_paths.contains(&component.path) {
                continue;
            }

            match self.files.read_file(&component.path).await {
                Ok(content) => {
                    let truncated = content.chars().count() > self.config.max_file_chars;
                    let content: String = content.chars().take(self.config.max_file_chars).collect();
                    seen_paths.push(component.path.clone());
                    key_files.push(FileContext {
                        path: component.path.clone(),
                        content,
                        relevance: format!("Source for {}", component.name),
                        relevance_score: keyword_score(&component.name, keywords),
                        truncated,
                    });
                }
                Err(e) => {
                    debug!(path = %component.path, error = %e, "build_implementation: could not read file");
                }
            }
        }

        // Structural patterns observed in the architecture view
        let mut patterns = Vec::new();
        let mut kinds: Vec<&str> = architecture.components.iter().map(|c| c.kind.as_str()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        for kind in kinds {
            patterns.push(format!("{} components present", kind));
        }

        info!(files = key_files.len(), "build_implementation: done");

        ImplementationView { key_files, patterns }
    }

    /// Similarity search; failures degrade to an empty list
    async fn find_similar(&self, request: &str) -> Vec<String> {
        match self.graph.search_similar(request, self.config.similar_limit).await {
            Ok(matches) => matches.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                warn!(error = %e, "find_similar: similarity search failed, degrading to empty");
                vec![]
            }
        }
    }
}

/// Extract search keywords from free text (stopword-filtered, deduped)
pub fn extract_keywords(text: &str) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "with", "from", "that", "this", "have", "will", "should", "would", "could", "need", "want", "when", "then",
        "them", "they", "their", "into", "must", "each", "also",
    ];

    let mut keywords = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.len() > 3 && !STOPWORDS.contains(&word.as_str()) && !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords.truncate(10);
    keywords
}

fn keyword_score(name: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.5;
    }
    let name_lower = name.to_lowercase();
    let hits = keywords.iter().filter(|k| name_lower.contains(k.as_str())).count();
    hits as f64 / keywords.len() as f64
}

fn component_relevance(component: &ComponentInfo, keywords: &[String], view: &StructureView) -> f64 {
    let page_rank = view
        .find_component(&component.name)
        .map(|n| n.page_rank.clamp(0.0, 1.0))
        .unwrap_or(0.0);
    KEYWORD_WEIGHT * keyword_score(&component.name, keywords) + PAGERANK_WEIGHT * page_rank
}

fn is_endpoint_kind(kind: &str) -> bool {
    let kind = kind.to_lowercase();
    kind.contains("endpoint") || kind.contains("route")
}

/// Parse "GET /orders" style endpoint names into a contract
fn parse_api_contract(name: &str, service: &str) -> ApiContract {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or("");
    let verbs = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

    if verbs.contains(&first.to_uppercase().as_str()) {
        ApiContract {
            method: first.to_uppercase(),
            endpoint: parts.collect::<Vec<_>>().join(" "),
            service: service.to_string(),
        }
    } else {
        ApiContract {
            method: "GET".to_string(),
            endpoint: name.to_string(),
            service: service.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowledgestore::{
        ComponentNode, DependencyView, DirEntry, FileMatch, Relationship, SimilarMatch, SourceError,
    };

    struct StubGraph {
        fail: bool,
    }

    #[async_trait]
    impl StructureSource for StubGraph {
        async fn query_structure(&self, _scope: &[String]) -> Result<StructureView, SourceError> {
            if self.fail {
                return Err(SourceError::Connection("refused".to_string()));
            }
            Ok(StructureView {
                components: vec![
                    ComponentNode {
                        name: "OrderService".to_string(),
                        kind: "service".to_string(),
                        path: "src/orders.rs".to_string(),
                        description: "order handling".to_string(),
                        page_rank: 0.8,
                    },
                    ComponentNode {
                        name: "GET /orders".to_string(),
                        kind: "endpoint".to_string(),
                        path: "OrderService".to_string(),
                        description: String::new(),
                        page_rank: 0.2,
                    },
                ],
                relationships: vec![Relationship {
                    source: "OrderService".to_string(),
                    kind: "DEPENDS_ON".to_string(),
                    target: "PaymentGateway".to_string(),
                }],
            })
        }

        async fn get_dependencies(&self, _component: &str) -> Result<DependencyView, SourceError> {
            Ok(DependencyView::default())
        }

        async fn search_similar(&self, _text: &str, _limit: usize) -> Result<Vec<SimilarMatch>, SourceError> {
            if self.fail {
                return Err(SourceError::Connection("refused".to_string()));
            }
            Ok(vec![SimilarMatch {
                name: "order-export".to_string(),
                score: 0.9,
            }])
        }
    }

    struct StubContent {
        fail: bool,
    }

    #[async_trait]
    impl ContentSource for StubContent {
        async fn read_file(&self, path: &str) -> Result<String, SourceError> {
            if self.fail {
                return Err(SourceError::Connection("offline".to_string()));
            }
            Ok(format!("// contents of {}\npub struct OrderService;\n", path))
        }

        async fn list_directory(&self, _path: &str) -> Result<Vec<DirEntry>, SourceError> {
            Ok(vec![])
        }

        async fn search_files(
            &self,
            _pattern: &str,
            _root: &str,
            _max: usize,
        ) -> Result<Vec<FileMatch>, SourceError> {
            Ok(vec![])
        }
    }

    fn aggregator(graph_fail: bool, content_fail: bool) -> ContextAggregator {
        ContextAggregator::new(
            Arc::new(StubGraph { fail: graph_fail }),
            Arc::new(StubContent { fail: content_fail }),
            ContextConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_build_context_happy_path() {
        let ctx = aggregator(false, false)
            .build_context("improve order processing", &[], true)
            .await;

        assert_eq!(ctx.request, "improve order processing");
        assert_eq!(ctx.architecture.components.len(), 1);
        assert_eq!(ctx.architecture.api_contracts.len(), 1);
        assert_eq!(ctx.architecture.api_contracts[0].method, "GET");
        assert_eq!(ctx.architecture.api_contracts[0].endpoint, "/orders");
        assert_eq!(ctx.implementation.key_files.len(), 1);
        assert_eq!(ctx.similar_features, vec!["order-export".to_string()]);
    }

    #[tokio::test]
    async fn test_graph_failure_degrades_to_empty_architecture() {
        let ctx = aggregator(true, false)
            .build_context("improve order processing", &[], true)
            .await;

        // Still a well-formed context; affected sections are just empty
        assert_eq!(ctx.request, "improve order processing");
        assert!(ctx.architecture.components.is_empty());
        assert!(ctx.implementation.key_files.is_empty());
        assert!(ctx.similar_features.is_empty());
    }

    #[tokio::test]
    async fn test_content_failure_degrades_to_empty_files() {
        let ctx = aggregator(false, true)
            .build_context("improve order processing", &[], false)
            .await;

        assert_eq!(ctx.architecture.components.len(), 1);
        assert!(ctx.implementation.key_files.is_empty());
    }

    #[tokio::test]
    async fn test_component_dependencies_attached() {
        let ctx = aggregator(false, false).build_context("orders", &[], false).await;

        let order_service = &ctx.architecture.components[0];
        assert_eq!(order_service.dependencies, vec!["PaymentGateway".to_string()]);
    }

    #[test]
    fn test_extract_keywords() {
        let keywords = extract_keywords("Add OAuth login with session caching");
        assert!(keywords.contains(&"oauth".to_string()));
        assert!(keywords.contains(&"login".to_string()));
        assert!(keywords.contains(&"session".to_string()));
        // stopword filtered
        assert!(!keywords.contains(&"with".to_string()));
        // short word filtered
        assert!(!keywords.contains(&"add".to_string()));
    }

    #[test]
    fn test_extract_keywords_dedupes() {
        let keywords = extract_keywords("cache cache CACHE caching");
        assert_eq!(keywords.iter().filter(|k| *k == "cache").count(), 1);
    }

    #[test]
    fn test_parse_api_contract_with_verb() {
        let contract = parse_api_contract("POST /api/orders", "OrderService");
        assert_eq!(contract.method, "POST");
        assert_eq!(contract.endpoint, "/api/orders");
        assert_eq!(contract.service, "OrderService");
    }

    #[test]
    fn test_parse_api_contract_bare_path() {
        let contract = parse_api_contract("/health", "Monitor");
        assert_eq!(contract.method, "GET");
        assert_eq!(contract.endpoint, "/health");
    }
}
