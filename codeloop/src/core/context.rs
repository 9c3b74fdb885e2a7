//! Rendering of retrieved knowledge into the planner/generator context blob.

use crate::core::types::KnowledgeDoc;

/// Concatenate titled excerpts in retrieval order, separated by a blank line.
pub fn render_context(docs: &[KnowledgeDoc]) -> String {
    docs.iter()
        .map(|doc| format!("Source: {}\nContent:\n{}", doc.title, doc.full_content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
