//! Planner agent: task + context -> ordered implementation steps.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::plan::parse_plan;
use crate::core::types::Step;
use crate::io::llm::TextGenerator;
use crate::io::prompt::PromptEngine;

/// Planner agent wrapper that owns its prompt template.
#[derive(Default)]
pub struct PlannerAgent {
    prompts: PromptEngine,
}

impl PlannerAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the generator for a plan and parse one step per line.
    ///
    /// Generation failures propagate; there is no retry at this layer.
    #[instrument(skip_all)]
    pub fn run<G: TextGenerator>(
        &self,
        generator: &G,
        task: &str,
        context: &str,
    ) -> Result<Vec<Step>> {
        let prompt = self.prompts.render_plan(task, context)?;
        let text = generator.complete(&prompt).context("generate plan")?;
        let steps = parse_plan(&text);
        debug!(raw_bytes = text.len(), "plan generated");
        info!(steps = steps.len(), "plan parsed");
        Ok(steps)
    }
}
