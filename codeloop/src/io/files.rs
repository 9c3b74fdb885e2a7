//! Guarded writes of file edits into the working copy.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, error, instrument};

use crate::core::types::{FileEdits, WriteSummary};
use crate::io::path_guard::is_safe;

/// Write every edit that passes the path guard, creating parent directories.
///
/// Rejected edits are logged and skipped; they never abort the batch. Any I/O
/// failure on an accepted path is returned as an error.
#[instrument(skip_all, fields(root = %root.display(), edits = edits.len()))]
pub fn write_edits(root: &Path, edits: &FileEdits) -> Result<WriteSummary> {
    let mut summary = WriteSummary::default();
    for (path, content) in edits {
        if !is_safe(path, root) {
            error!(path = %path, "refusing to write unsafe path");
            summary.rejected.push(path.clone());
            continue;
        }
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&full_path, content)
            .with_context(|| format!("write {}", full_path.display()))?;
        debug!(path = %path, bytes = content.len(), "wrote file");
        summary.written.push(path.clone());
    }
    Ok(summary)
}
