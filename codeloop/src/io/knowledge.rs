//! Retrieval capability and its JSON-file-backed knowledge store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::core::ranking::rank;
use crate::core::types::KnowledgeDoc;
use crate::io::atomic::write_atomic;

/// Given text, return the nearest documents, best first.
pub trait Retriever {
    fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeDoc>>;
}

/// A document plus ingestion bookkeeping, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDoc {
    #[serde(flatten)]
    pub doc: KnowledgeDoc,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    documents: Vec<StoredDoc>,
}

/// Knowledge documents persisted as pretty JSON.
///
/// Documents keep their ingestion order; re-ingesting a document with the same
/// id replaces it in place.
#[derive(Debug)]
pub struct KnowledgeStore {
    path: PathBuf,
    docs: Vec<StoredDoc>,
}

impl KnowledgeStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let docs = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read knowledge store {}", path.display()))?;
            let file: StoreFile = serde_json::from_str(&contents)
                .with_context(|| format!("parse knowledge store {}", path.display()))?;
            file.documents
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), documents = docs.len(), "knowledge store opened");
        Ok(Self { path, docs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&StoredDoc> {
        self.docs.iter().find(|stored| stored.doc.id == id)
    }

    /// Insert or replace a document and persist the store.
    #[instrument(skip_all, fields(id = %doc.id, title = %doc.title))]
    pub fn upsert(&mut self, doc: KnowledgeDoc) -> Result<()> {
        let stored = StoredDoc {
            doc,
            ingested_at: Utc::now(),
        };
        match self
            .docs
            .iter_mut()
            .find(|existing| existing.doc.id == stored.doc.id)
        {
            Some(existing) => {
                debug!("replacing existing document");
                *existing = stored;
            }
            None => self.docs.push(stored),
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        let file = StoreFile {
            documents: self.docs.clone(),
        };
        let mut buf = serde_json::to_string_pretty(&file).context("serialize knowledge store")?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

impl Retriever for KnowledgeStore {
    #[instrument(skip_all, fields(k))]
    fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeDoc>> {
        let ranked = rank(query, self.docs.iter().map(|stored| &stored.doc), k);
        debug!(hits = ranked.len(), "knowledge search");
        Ok(ranked.into_iter().cloned().collect())
    }
}

/// Stable document id: first 16 hex chars of SHA-256 over source, title and content.
pub fn document_id(source: &str, title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [source, title, content] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
