//! Prompt loading and rendering
//!
//! Templates resolve from an optional override directory
//! (`.brdgen/prompts/{name}.pmt`) falling back to the embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Template parameters for agent prompts
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    /// The original feature request (BRD generation)
    pub request: String,

    /// Pre-rendered codebase context summary
    pub context: String,

    /// Serialized upstream document (epic/backlog generation)
    pub document: String,

    /// Whether this is a revision of a failed draft
    pub is_revision: bool,

    /// Verifier feedback for the revision
    pub revision_feedback: String,

    /// Comma-joined names of sections needing revision
    pub flagged_sections: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader with overrides resolved under `root/.brdgen/prompts/`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let override_dir = root.as_ref().join(".brdgen").join("prompts");
        Self {
            hbs: Handlebars::new(),
            override_dir: if override_dir.exists() { Some(override_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self {
            hbs: Handlebars::new(),
            override_dir: None,
        }
    }

    /// Load a template by name, override file first, embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!("Loading prompt from override: {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Load a system prompt verbatim (no substitution)
    pub fn system(&self, template_name: &str) -> Result<String> {
        self.load_template(template_name)
    }
}
