//! Generator agent - drafts BRDs, epics, and backlog stories
//!
//! Structured output is obtained through a forced tool call; the model
//! submits a typed payload instead of free markdown. Every failure mode
//! (transport error, timeout, malformed payload) degrades to a
//! deterministic minimal artifact - visible in the return type, never an
//! error the pipeline has to catch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::context::AggregatedContext;
use crate::domain::{BrdDocument, Epic, EffortSize, Priority, Requirement, UserStory, generate_id};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolDefinition};
use crate::prompts::{PromptContext, PromptLoader};

/// An agent product, flagged when the generator had to fall back
///
/// `Degraded` carries a structurally valid minimal artifact; callers
/// distinguish it via the flag, not via an error.
#[derive(Debug, Clone)]
pub enum Generated<T> {
    Full(T),
    Degraded(T),
}

impl<T> Generated<T> {
    pub fn value(&self) -> &T {
        match self {
            Generated::Full(v) | Generated::Degraded(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Generated::Full(v) | Generated::Degraded(v) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Generated::Degraded(_))
    }
}

/// Feedback passed into a revision draft
#[derive(Debug, Clone)]
pub struct RevisionRequest {
    /// Rendered verifier feedback (failed sections and claims only)
    pub feedback: String,

    /// Names of the sections that failed verification
    pub flagged_sections: Vec<String>,
}

/// Epics plus resolution warnings (unknown blocked_by references)
#[derive(Debug, Clone)]
pub struct EpicSet {
    pub epics: Vec<Epic>,
    pub warnings: Vec<String>,
}

/// Stories plus resolution warnings
#[derive(Debug, Clone)]
pub struct StorySet {
    pub stories: Vec<UserStory>,
    pub warnings: Vec<String>,
}

/// The generator agent
pub struct GeneratorAgent {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl GeneratorAgent {
    /// Create a generator over an injected LLM client
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    /// Draft (or revise) a BRD from aggregated context
    ///
    /// A revision is not a fresh generation: the prompt embeds the
    /// verifier's feedback and instructs the model to preserve sections
    /// that already verified.
    pub async fn generate_brd(
        &self,
        context: &AggregatedContext,
        revision: Option<&RevisionRequest>,
    ) -> Generated<BrdDocument> {
        let prompt_context = PromptContext {
            request: context.request.clone(),
            context: render_context(context),
            is_revision: revision.is_some(),
            revision_feedback: revision.map(|r| r.feedback.clone()).unwrap_or_default(),
            flagged_sections: revision.map(|r| r.flagged_sections.join(", ")).unwrap_or_default(),
            ..Default::default()
        };

        let request = match self.build_request("brd-system", "brd-generate", &prompt_context, brd_tool()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "generate_brd: prompt rendering failed, degrading");
                return Generated::Degraded(BrdDocument::minimal(&context.request, None));
            }
        };

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "generate_brd: LLM call failed, degrading to minimal document");
                return Generated::Degraded(BrdDocument::minimal(&context.request, None));
            }
        };

        let raw = response.content.clone();
        match response
            .tool_call("submit_brd")
            .and_then(|tc| serde_json::from_value::<BrdSubmission>(tc.input.clone()).ok())
        {
            Some(submission) => {
                info!(title = %submission.title, revision = revision.is_some(), "generate_brd: draft produced");
                Generated::Full(submission.into_document())
            }
            None => {
                warn!("generate_brd: malformed output, degrading with raw text preserved");
                Generated::Degraded(BrdDocument::minimal(&context.request, raw))
            }
        }
    }

    /// Decompose an approved BRD into epics
    ///
    /// Epics reference each other by title in `blocked_by`; titles are
    /// resolved to generated ids in a second pass. Unknown references
    /// become warnings, not errors.
    pub async fn generate_epics(&self, brd: &BrdDocument) -> Generated<EpicSet> {
        let prompt_context = PromptContext {
            document: brd.to_markdown(),
            ..Default::default()
        };

        let fallback = |reason: &str| {
            warn!(reason, "generate_epics: degrading to single epic");
            Generated::Degraded(EpicSet {
                epics: vec![minimal_epic(brd)],
                warnings: vec![format!("generator degraded: {}", reason)],
            })
        };

        let request = match self.build_request("epics-system", "epics-generate", &prompt_context, epics_tool()) {
            Ok(request) => request,
            Err(e) => return fallback(&e.to_string()),
        };

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => return fallback(&e.to_string()),
        };

        match response
            .tool_call("submit_epics")
            .and_then(|tc| serde_json::from_value::<EpicsSubmission>(tc.input.clone()).ok())
        {
            Some(submission) if !submission.epics.is_empty() => {
                Generated::Full(submission.into_epics())
            }
            Some(_) => fallback("empty epic list"),
            None => fallback("malformed epic output"),
        }
    }

    /// Expand approved epics into backlog stories
    pub async fn generate_backlogs(&self, epics: &[Epic]) -> Generated<StorySet> {
        let document = serde_json::to_string_pretty(epics).unwrap_or_default();
        let prompt_context = PromptContext {
            document,
            ..Default::default()
        };

        let fallback = |reason: &str| {
            warn!(reason, "generate_backlogs: degrading to one story per epic");
            Generated::Degraded(StorySet {
                stories: epics.iter().map(minimal_story).collect(),
                warnings: vec![format!("generator degraded: {}", reason)],
            })
        };

        let request = match self.build_request(
            "backlogs-system",
            "backlogs-generate",
            &prompt_context,
            backlogs_tool(),
        ) {
            Ok(request) => request,
            Err(e) => return fallback(&e.to_string()),
        };

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => return fallback(&e.to_string()),
        };

        match response
            .tool_call("submit_backlogs")
            .and_then(|tc| serde_json::from_value::<BacklogsSubmission>(tc.input.clone()).ok())
        {
            Some(submission) if !submission.stories.is_empty() => {
                Generated::Full(submission.into_stories(epics))
            }
            Some(_) => fallback("empty story list"),
            None => fallback("malformed backlog output"),
        }
    }

    fn build_request(
        &self,
        system_name: &str,
        template_name: &str,
        context: &PromptContext,
        tool: ToolDefinition,
    ) -> eyre::Result<CompletionRequest> {
        let system_prompt = self.prompts.system(system_name)?;
        let user_prompt = self.prompts.render(template_name, context)?;
        debug!(template = template_name, prompt_len = user_prompt.len(), "build_request: done");

        Ok(CompletionRequest {
            system_prompt,
            messages: vec![Message::user(user_prompt)],
            tools: vec![tool],
            max_tokens: self.max_tokens,
        })
    }
}

/// Render the aggregated context into prompt text
fn render_context(ctx: &AggregatedContext) -> String {
    let mut out = String::new();

    out.push_str("### Components\n");
    for component in &ctx.architecture.components {
        out.push_str(&format!("- {} ({})", component.name, component.kind));
        if !component.path.is_empty() {
            out.push_str(&format!(" at {}", component.path));
        }
        if !component.dependencies.is_empty() {
            out.push_str(&format!(" depends on: {}", component.dependencies.join(", ")));
        }
        out.push('\n');
    }

    if !ctx.architecture.api_contracts.is_empty() {
        out.push_str("\n### API Contracts\n");
        for contract in &ctx.architecture.api_contracts {
            out.push_str(&format!("- {} {} ({})\n", contract.method, contract.endpoint, contract.service));
        }
    }

    if !ctx.implementation.key_files.is_empty() {
        out.push_str("\n### Key Files\n");
        for file in &ctx.implementation.key_files {
            out.push_str(&format!("#### {} ({})\n```\n{}\n```\n", file.path, file.relevance, file.content));
        }
    }

    if !ctx.similar_features.is_empty() {
        out.push_str("\n### Similar Prior Features\n");
        for feature in &ctx.similar_features {
            out.push_str(&format!("- {}\n", feature));
        }
    }

    if !ctx.advisories.is_empty() {
        out.push_str("\n### Advisories From Earlier Iterations\n");
        for advisory in &ctx.advisories {
            out.push_str(&format!("- {}\n", advisory));
        }
    }

    out
}

fn minimal_epic(brd: &BrdDocument) -> Epic {
    Epic {
        id: generate_id("epic", &brd.title),
        title: format!("Implement: {}", brd.title),
        description: brd.business_context.clone(),
        components: brd.referenced_components.clone(),
        effort: EffortSize::Medium,
        priority: Priority::Medium,
        blocked_by: vec![],
        blocks: vec![],
    }
}

fn minimal_story(epic: &Epic) -> UserStory {
    UserStory {
        id: generate_id("story", &epic.title),
        epic_id: epic.id.clone(),
        title: epic.title.clone(),
        as_a: "user".to_string(),
        i_want: epic.title.to_lowercase(),
        so_that: "the epic's outcome is delivered".to_string(),
        description: epic.description.clone(),
        acceptance_criteria: vec![],
        files_to_modify: vec![],
        files_to_create: vec![],
        estimated_points: None,
        priority: epic.priority,
        blocked_by: vec![],
    }
}

// LLM submission payloads

#[derive(Debug, Deserialize)]
struct RequirementSubmission {
    #[serde(default)]
    id: String,
    title: String,
    description: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BrdSubmission {
    title: String,
    business_context: String,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    functional_requirements: Vec<RequirementSubmission>,
    #[serde(default)]
    technical_requirements: Vec<RequirementSubmission>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    referenced_components: Vec<String>,
    #[serde(default)]
    referenced_files: Vec<String>,
}

impl BrdSubmission {
    fn into_document(self) -> BrdDocument {
        let requirements = |prefix: &str, items: Vec<RequirementSubmission>| -> Vec<Requirement> {
            items
                .into_iter()
                .enumerate()
                .map(|(i, r)| Requirement {
                    id: if r.id.is_empty() { format!("{}-{}", prefix, i + 1) } else { r.id },
                    title: r.title,
                    description: r.description,
                    priority: r.priority,
                    acceptance_criteria: r.acceptance_criteria,
                })
                .collect()
        };

        let mut doc = BrdDocument::new(&self.title);
        doc.business_context = self.business_context;
        doc.objectives = self.objectives;
        doc.functional_requirements = requirements("FR", self.functional_requirements);
        doc.technical_requirements = requirements("TR", self.technical_requirements);
        doc.dependencies = self.dependencies;
        doc.risks = self.risks;
        doc.referenced_components = self.referenced_components;
        doc.referenced_files = self.referenced_files;
        doc
    }
}

#[derive(Debug, Deserialize)]
struct EpicSubmission {
    title: String,
    description: String,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    effort: EffortSize,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    blocked_by: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EpicsSubmission {
    epics: Vec<EpicSubmission>,
}

impl EpicsSubmission {
    /// Two-pass conversion: create epics with ids, then resolve
    /// title-based blocked_by references
    fn into_epics(self) -> EpicSet {
        let mut warnings = Vec::new();

        let mut epics: Vec<Epic> = self
            .epics
            .iter()
            .map(|e| Epic {
                id: generate_id("epic", &e.title),
                title: e.title.clone(),
                description: e.description.clone(),
                components: e.components.clone(),
                effort: e.effort,
                priority: e.priority,
                blocked_by: vec![],
                blocks: vec![],
            })
            .collect();

        let title_to_id: HashMap<String, String> =
            epics.iter().map(|e| (e.title.clone(), e.id.clone())).collect();

        for (idx, submission) in self.epics.iter().enumerate() {
            for dep_title in &submission.blocked_by {
                match title_to_id.get(dep_title) {
                    Some(dep_id) if *dep_id != epics[idx].id => {
                        let dep_id = dep_id.clone();
                        epics[idx].blocked_by.push(dep_id);
                    }
                    Some(_) => {
                        warnings.push(format!("Epic '{}' depends on itself, reference dropped", submission.title));
                    }
                    None => {
                        warnings.push(format!(
                            "Epic '{}' depends on unknown epic '{}'",
                            submission.title, dep_title
                        ));
                    }
                }
            }
        }

        // Fill reverse edges
        let pairs: Vec<(String, String)> = epics
            .iter()
            .flat_map(|e| e.blocked_by.iter().map(|dep| (dep.clone(), e.id.clone())))
            .collect();
        for (blocker, blocked) in pairs {
            if let Some(epic) = epics.iter_mut().find(|e| e.id == blocker) {
                epic.blocks.push(blocked);
            }
        }

        EpicSet { epics, warnings }
    }
}

#[derive(Debug, Deserialize)]
struct StorySubmission {
    epic: String,
    title: String,
    as_a: String,
    i_want: String,
    so_that: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default)]
    files_to_modify: Vec<String>,
    #[serde(default)]
    files_to_create: Vec<String>,
    #[serde(default)]
    estimated_points: Option<u32>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    blocked_by: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BacklogsSubmission {
    stories: Vec<StorySubmission>,
}

impl BacklogsSubmission {
    fn into_stories(self, epics: &[Epic]) -> StorySet {
        let mut warnings = Vec::new();
        let mut stories = Vec::new();

        for submission in &self.stories {
            let epic = epics
                .iter()
                .find(|e| e.id == submission.epic || e.title == submission.epic);
            let Some(epic) = epic else {
                warnings.push(format!(
                    "Story '{}' references unknown epic '{}', dropped",
                    submission.title, submission.epic
                ));
                continue;
            };

            stories.push(UserStory {
                id: generate_id("story", &submission.title),
                epic_id: epic.id.clone(),
                title: submission.title.clone(),
                as_a: submission.as_a.clone(),
                i_want: submission.i_want.clone(),
                so_that: submission.so_that.clone(),
                description: submission.description.clone(),
                acceptance_criteria: submission.acceptance_criteria.clone(),
                files_to_modify: submission.files_to_modify.clone(),
                files_to_create: submission.files_to_create.clone(),
                estimated_points: submission.estimated_points,
                priority: submission.priority,
                blocked_by: vec![],
            });
        }

        // Resolve story blocked_by titles to ids
        let title_to_id: HashMap<String, String> =
            stories.iter().map(|s| (s.title.clone(), s.id.clone())).collect();
        for (story, submission) in stories.iter_mut().zip(
            self.stories
                .iter()
                .filter(|s| epics.iter().any(|e| e.id == s.epic || e.title == s.epic)),
        ) {
            for dep_title in &submission.blocked_by {
                match title_to_id.get(dep_title) {
                    Some(dep_id) if *dep_id != story.id => story.blocked_by.push(dep_id.clone()),
                    Some(_) => warnings.push(format!("Story '{}' depends on itself, reference dropped", story.title)),
                    None => warnings.push(format!(
                        "Story '{}' depends on unknown story '{}'",
                        story.title, dep_title
                    )),
                }
            }
        }

        StorySet { stories, warnings }
    }
}

/// Tool schema for BRD submission
fn brd_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_brd",
        "Submit the complete Business Requirements Document. Call exactly once.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "business_context": { "type": "string" },
                "objectives": { "type": "array", "items": { "type": "string" } },
                "functional_requirements": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "priority": { "type": "string", "enum": ["high", "medium", "low"] },
                            "acceptance_criteria": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["title", "description"]
                    }
                },
                "technical_requirements": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "priority": { "type": "string", "enum": ["high", "medium", "low"] }
                        },
                        "required": ["title", "description"]
                    }
                },
                "dependencies": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Statements of the form 'X depends on Y'"
                },
                "risks": { "type": "array", "items": { "type": "string" } },
                "referenced_components": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Component names from the provided context"
                },
                "referenced_files": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Source file paths from the provided context"
                }
            },
            "required": ["title", "business_context"]
        }),
    )
}

/// Tool schema for epic submission
fn epics_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_epics",
        "Submit the epic decomposition. Call exactly once with all epics.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "epics": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "components": { "type": "array", "items": { "type": "string" } },
                            "effort": { "type": "string", "enum": ["small", "medium", "large"] },
                            "priority": { "type": "string", "enum": ["high", "medium", "low"] },
                            "blocked_by": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Titles of epics that must complete first; no cycles"
                            }
                        },
                        "required": ["title", "description"]
                    }
                }
            },
            "required": ["epics"]
        }),
    )
}

/// Tool schema for backlog submission
fn backlogs_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_backlogs",
        "Submit the backlog stories. Call exactly once with all stories.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "stories": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "epic": { "type": "string", "description": "Epic id or title" },
                            "title": { "type": "string" },
                            "as_a": { "type": "string" },
                            "i_want": { "type": "string" },
                            "so_that": { "type": "string" },
                            "description": { "type": "string" },
                            "acceptance_criteria": { "type": "array", "items": { "type": "string" } },
                            "files_to_modify": { "type": "array", "items": { "type": "string" } },
                            "files_to_create": { "type": "array", "items": { "type": "string" } },
                            "estimated_points": { "type": "integer" },
                            "priority": { "type": "string", "enum": ["high", "medium", "low"] },
                            "blocked_by": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["epic", "title", "as_a", "i_want", "so_that"]
                    }
                }
            },
            "required": ["stories"]
        }),
    )
}
