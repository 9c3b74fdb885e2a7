//! Prompt rendering for the planner, generator, fixer, summarizer and advisor.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::file_blocks::render_file_blocks;
use crate::core::types::FileEdits;

const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");
const FIX_TEMPLATE: &str = include_str!("prompts/fix.md");
const SUMMARIZE_TEMPLATE: &str = include_str!("prompts/summarize.md");
const ASK_TEMPLATE: &str = include_str!("prompts/ask.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("plan", PLAN_TEMPLATE)
            .expect("plan template should be valid");
        env.add_template("generate", GENERATE_TEMPLATE)
            .expect("generate template should be valid");
        env.add_template("fix", FIX_TEMPLATE)
            .expect("fix template should be valid");
        env.add_template("summarize", SUMMARIZE_TEMPLATE)
            .expect("summarize template should be valid");
        env.add_template("ask", ASK_TEMPLATE)
            .expect("ask template should be valid");
        Self { env }
    }

    pub fn render_plan(&self, task: &str, context: &str) -> Result<String> {
        let template = self.env.get_template("plan")?;
        Ok(template.render(context! {
            task => task.trim(),
            context => non_empty(context),
        })?)
    }

    pub fn render_generate(&self, step: &str, context: &str) -> Result<String> {
        let template = self.env.get_template("generate")?;
        Ok(template.render(context! {
            step => step.trim(),
            context => non_empty(context),
        })?)
    }

    pub fn render_fix(
        &self,
        step: &str,
        context: &str,
        files: &FileEdits,
        failure: &str,
    ) -> Result<String> {
        let template = self.env.get_template("fix")?;
        Ok(template.render(context! {
            step => step.trim(),
            context => non_empty(context),
            files => render_file_blocks(files),
            failure => failure.trim(),
        })?)
    }

    pub fn render_summarize(&self, title: &str, content: &str) -> Result<String> {
        let template = self.env.get_template("summarize")?;
        Ok(template.render(context! {
            title => title.trim(),
            content => content.trim(),
        })?)
    }

    pub fn render_ask(&self, question: &str, context: &str) -> Result<String> {
        let template = self.env.get_template("ask")?;
        Ok(template.render(context! {
            question => question.trim(),
            context => non_empty(context),
        })?)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
