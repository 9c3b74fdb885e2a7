//! Analyst agent: summarizes requirement documents into the knowledge store.

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use crate::core::types::KnowledgeDoc;
use crate::io::knowledge::{KnowledgeStore, document_id};
use crate::io::llm::TextGenerator;
use crate::io::prompt::PromptEngine;

/// A requirement document to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest<'a> {
    pub title: &'a str,
    pub source: &'a str,
    pub content: &'a str,
}

#[derive(Default)]
pub struct AnalystAgent {
    prompts: PromptEngine,
}

impl AnalystAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarize the document, store it, and return its id.
    ///
    /// The summary is what search ranks on; the full content is what tasks
    /// receive as context.
    #[instrument(skip_all, fields(title = request.title, source = request.source))]
    pub fn ingest<G: TextGenerator>(
        &self,
        generator: &G,
        store: &mut KnowledgeStore,
        request: &IngestRequest<'_>,
    ) -> Result<String> {
        if request.content.trim().is_empty() {
            bail!("document '{}' is empty", request.title);
        }
        let prompt = self
            .prompts
            .render_summarize(request.title, request.content)?;
        let summary = generator.complete(&prompt).context("summarize document")?;
        let id = document_id(request.source, request.title, request.content);
        store.upsert(KnowledgeDoc {
            id: id.clone(),
            title: request.title.to_string(),
            source: request.source.to_string(),
            summary: summary.trim().to_string(),
            full_content: request.content.to_string(),
        })?;
        info!(id = %id, "document ingested");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::knowledge::Retriever;
    use crate::test_support::ScriptedGenerator;

    #[test]
    fn ingest_stores_summary_and_full_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = KnowledgeStore::open(temp.path().join("kb.json")).expect("open");
        let generator = ScriptedGenerator::new(["## Health\n- expose /health\n"]);
        let id = AnalystAgent::new()
            .ingest(
                &generator,
                &mut store,
                &IngestRequest {
                    title: "Ops requirements",
                    source: "confluence",
                    content: "Every service exposes a health endpoint.",
                },
            )
            .expect("ingest");

        let stored = store.get(&id).expect("stored");
        assert_eq!(stored.doc.summary, "## Health\n- expose /health");
        assert_eq!(stored.doc.full_content, "Every service exposes a health endpoint.");
        let hits = store.search("health endpoint", 3).expect("search");
        assert_eq!(hits[0].id, id);
    }

    #[test]
    fn empty_document_is_rejected_without_calling_generator() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = KnowledgeStore::open(temp.path().join("kb.json")).expect("open");
        let generator = ScriptedGenerator::new(["unused"]);
        let err = AnalystAgent::new()
            .ingest(
                &generator,
                &mut store,
                &IngestRequest {
                    title: "Empty",
                    source: "jira",
                    content: "  \n",
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert_eq!(generator.calls(), 0);
        assert!(store.is_empty());
    }
}
