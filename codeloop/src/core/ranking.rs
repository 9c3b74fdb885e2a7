//! Term-overlap relevance ranking for the knowledge store.
//!
//! Each distinct query term found in a document field adds that field's weight.
//! Titles weigh most, then summaries, then full content. Like a nearest-neighbour
//! lookup, ranking always returns up to `k` documents, relevant or not.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::KnowledgeDoc;

const TITLE_WEIGHT: u32 = 3;
const SUMMARY_WEIGHT: u32 = 2;
const CONTENT_WEIGHT: u32 = 1;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}_]+").expect("token regex should be valid"));

/// Lower-cased distinct word tokens of at least two characters.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| token.chars().count() >= 2)
        .collect()
}

/// Relevance score of `doc` for the given query terms.
pub fn score(terms: &BTreeSet<String>, doc: &KnowledgeDoc) -> u32 {
    let title = tokenize(&doc.title);
    let summary = tokenize(&doc.summary);
    let content = tokenize(&doc.full_content);
    terms
        .iter()
        .map(|term| {
            let mut s = 0;
            if title.contains(term) {
                s += TITLE_WEIGHT;
            }
            if summary.contains(term) {
                s += SUMMARY_WEIGHT;
            }
            if content.contains(term) {
                s += CONTENT_WEIGHT;
            }
            s
        })
        .sum()
}

/// Return the `k` most relevant documents, best first.
///
/// Ties keep the input (ingestion) order.
pub fn rank<'a, I>(query: &str, docs: I, k: usize) -> Vec<&'a KnowledgeDoc>
where
    I: IntoIterator<Item = &'a KnowledgeDoc>,
{
    let terms = tokenize(query);
    let mut scored: Vec<(u32, &KnowledgeDoc)> = docs
        .into_iter()
        .map(|doc| (score(&terms, doc), doc))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(k).map(|(_, doc)| doc).collect()
}
