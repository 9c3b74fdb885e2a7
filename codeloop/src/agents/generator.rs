//! Generator agent: produces file sets for a step and the single fix pass.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::file_blocks::parse_file_blocks;
use crate::core::types::FileEdits;
use crate::io::llm::TextGenerator;
use crate::io::prompt::PromptEngine;

/// Generator agent wrapper that owns its prompt templates.
#[derive(Default)]
pub struct GeneratorAgent {
    prompts: PromptEngine,
}

impl GeneratorAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the implementation and test files for `step`.
    ///
    /// No path filtering happens here; callers pass every edit through the
    /// path guard before writing.
    #[instrument(skip_all)]
    pub fn generate<G: TextGenerator>(
        &self,
        generator: &G,
        step: &str,
        context: &str,
    ) -> Result<FileEdits> {
        let prompt = self.prompts.render_generate(step, context)?;
        let text = generator.complete(&prompt).context("generate files")?;
        let files = parse_file_blocks(&text);
        log_parsed(&text, &files);
        Ok(files)
    }

    /// Ask for corrected files given the current files and the failure detail.
    #[instrument(skip_all, fields(current_files = files.len()))]
    pub fn fix<G: TextGenerator>(
        &self,
        generator: &G,
        step: &str,
        context: &str,
        files: &FileEdits,
        failure: &str,
    ) -> Result<FileEdits> {
        let prompt = self.prompts.render_fix(step, context, files, failure)?;
        let text = generator.complete(&prompt).context("generate fix")?;
        let fixed = parse_file_blocks(&text);
        log_parsed(&text, &fixed);
        Ok(fixed)
    }
}

fn log_parsed(text: &str, files: &FileEdits) {
    if files.is_empty() {
        warn!(raw_bytes = text.len(), "generator output contained no complete file blocks");
        return;
    }
    debug!(paths = ?files.keys().collect::<Vec<_>>(), "parsed file blocks");
    info!(files = files.len(), "files generated");
}
