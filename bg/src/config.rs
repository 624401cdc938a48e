//! brdgen configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main brdgen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Verification loop policy
    pub verification: VerificationConfig,

    /// Context aggregation limits
    pub context: ContextConfig,

    /// Knowledge source endpoints
    pub sources: SourcesConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        self.verification.validate()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .brdgen.yml
        let local_config = PathBuf::from(".brdgen.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/brdgen/brdgen.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("brdgen").join("brdgen.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("{} not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

/// Verification loop policy
///
/// Supplied once per generation request and immutable for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum overall confidence for a draft to be accepted
    #[serde(rename = "min-confidence")]
    pub min_confidence: f64,

    /// Maximum drafting cycles before returning the best draft unverified
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// Include the full evidence report in the outcome
    #[serde(rename = "include-evidence")]
    pub include_evidence: bool,

    /// Cap on claims extracted per document section
    #[serde(rename = "max-claims-per-section")]
    pub max_claims_per_section: usize,

    /// Concurrency limit for evidence lookups within one verification pass
    #[serde(rename = "max-evidence-lookups")]
    pub max_evidence_lookups: usize,
}

impl VerificationConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(eyre::eyre!(
                "min-confidence must be in [0,1], got {}",
                self.min_confidence
            ));
        }
        if self.max_iterations == 0 {
            return Err(eyre::eyre!("max-iterations must be at least 1"));
        }
        if self.max_evidence_lookups == 0 {
            return Err(eyre::eyre!("max-evidence-lookups must be at least 1"));
        }
        Ok(())
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_iterations: 3,
            include_evidence: false,
            max_claims_per_section: 10,
            max_evidence_lookups: 8,
        }
    }
}

/// Context aggregation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Token budget for the aggregated context
    #[serde(rename = "max-tokens")]
    pub max_tokens: usize,

    /// Maximum source files read into the implementation view
    #[serde(rename = "max-files")]
    pub max_files: usize,

    /// Per-file content cap in characters
    #[serde(rename = "max-file-chars")]
    pub max_file_chars: usize,

    /// Whether to search for similar prior features
    #[serde(rename = "include-similar")]
    pub include_similar: bool,

    /// Cap on similar-feature matches
    #[serde(rename = "similar-limit")]
    pub similar_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 100_000,
            max_files: 10,
            max_file_chars: 8_000,
            include_similar: true,
            similar_limit: 5,
        }
    }
}

/// Knowledge source endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Code-graph service URL
    #[serde(rename = "graph-url")]
    pub graph_url: String,

    /// Repository checkout root for the content source
    #[serde(rename = "files-root")]
    pub files_root: PathBuf,

    /// Per-call timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            graph_url: "http://localhost:3006".to_string(),
            files_root: PathBuf::from("."),
            timeout_ms: 30_000,
        }
    }
}
