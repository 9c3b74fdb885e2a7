//! Advisor agent: answers free-form questions from the knowledge store.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::context::render_context;
use crate::io::knowledge::Retriever;
use crate::io::llm::TextGenerator;
use crate::io::prompt::PromptEngine;

/// Answer text plus the documents it was grounded on, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<AnswerSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSource {
    pub id: String,
    pub title: String,
    pub source: String,
}

#[derive(Default)]
pub struct AdvisorAgent {
    prompts: PromptEngine,
}

impl AdvisorAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve up to `k` documents for `question` and answer from them.
    ///
    /// An empty store still produces an answer; the prompt then carries no
    /// context section.
    #[instrument(skip_all, fields(k = k))]
    pub fn answer<G, K>(
        &self,
        generator: &G,
        retriever: &K,
        question: &str,
        k: usize,
    ) -> Result<Answer>
    where
        G: TextGenerator,
        K: Retriever,
    {
        let question = question.trim();
        if question.is_empty() {
            bail!("question must not be empty");
        }
        let docs = retriever
            .search(question, k)
            .context("retrieve knowledge")?;
        let prompt = self.prompts.render_ask(question, &render_context(&docs))?;
        let answer = generator.complete(&prompt).context("generate answer")?;
        info!(documents = docs.len(), "question answered");
        Ok(Answer {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            sources: docs
                .into_iter()
                .map(|doc| AnswerSource {
                    id: doc.id,
                    title: doc.title,
                    source: doc.source,
                })
                .collect(),
        })
    }
}
