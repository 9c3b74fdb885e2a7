//! Workspace registry: cloned working copies keyed by id.
//!
//! The registry is an owned value rather than process-wide state. Callers load
//! it from a workspaces directory, pass it to whatever needs it, and it
//! persists itself to `<dir>/workspaces.json` after every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::io::atomic::write_atomic;
use crate::io::git::Git;

const REGISTRY_FILE: &str = "workspaces.json";

/// A cloned repository a task can run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub repo_url: String,
    pub repo_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Keyed store of workspaces under one directory.
#[derive(Debug)]
pub struct WorkspaceRegistry {
    dir: PathBuf,
    workspaces: BTreeMap<String, Workspace>,
}

impl WorkspaceRegistry {
    /// Load the registry under `dir`; a missing registry file is empty.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let path = dir.join(REGISTRY_FILE);
        let workspaces = if path.exists() {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { dir, workspaces })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.get(id)
    }

    /// Workspaces in id order.
    pub fn list(&self) -> Vec<&Workspace> {
        self.workspaces.values().collect()
    }

    /// Clone `repo_url` into `<dir>/<id>/repo` and record the workspace.
    #[instrument(skip_all, fields(name, repo_url))]
    pub fn create(&mut self, name: &str, repo_url: &str) -> Result<Workspace> {
        if name.trim().is_empty() {
            bail!("workspace name must not be empty");
        }
        let id = build_workspace_id(name, &generate_timestamp(), &generate_short_id());
        let repo_path = self.dir.join(&id).join("repo");
        if repo_path.exists() {
            warn!(path = %repo_path.display(), "removing stale workspace directory");
            fs::remove_dir_all(&repo_path)
                .with_context(|| format!("remove {}", repo_path.display()))?;
        }
        if let Some(parent) = repo_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create workspace dir {}", parent.display()))?;
        }
        Git::clone_into(repo_url, &repo_path)?;

        let workspace = Workspace {
            id: id.clone(),
            name: name.trim().to_string(),
            repo_url: repo_url.to_string(),
            repo_path,
            created_at: Utc::now(),
        };
        self.workspaces.insert(id, workspace.clone());
        self.save()?;
        info!(id = %workspace.id, "workspace created");
        Ok(workspace)
    }

    /// Resolve a workspace id to its repository path.
    pub fn repo_path(&self, id: &str) -> Result<PathBuf> {
        self.get(id)
            .map(|ws| ws.repo_path.clone())
            .ok_or_else(|| anyhow!("unknown workspace '{id}'"))
    }

    fn save(&self) -> Result<()> {
        let mut buf =
            serde_json::to_string_pretty(&self.workspaces).context("serialize workspaces")?;
        buf.push('\n');
        write_atomic(&self.dir.join(REGISTRY_FILE), &buf)?;
        debug!(count = self.workspaces.len(), "workspace registry saved");
        Ok(())
    }
}

pub fn build_workspace_id(name: &str, timestamp: &str, short_id: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "workspace" } else { slug };
    format!("{slug}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn workspace_id_uses_expected_format() {
        assert_eq!(
            build_workspace_id("Trading Engine", "20260118_120000", "abc123"),
            "trading-engine_20260118_120000_abc123"
        );
        assert_eq!(
            build_workspace_id("  ", "20260118_120000", "abc123"),
            "workspace_20260118_120000_abc123"
        );
    }

    #[test]
    fn create_clones_and_persists() {
        let origin = TestRepo::new().expect("origin");
        let temp = tempfile::tempdir().expect("tempdir");
        let mut registry = WorkspaceRegistry::load(temp.path()).expect("load");
        let url = origin.path().to_str().expect("utf8").to_string();

        let ws = registry.create("demo", &url).expect("create");
        assert!(ws.repo_path.join("README.md").exists());
        assert!(ws.repo_path.ends_with("repo"));

        let reloaded = WorkspaceRegistry::load(temp.path()).expect("reload");
        assert_eq!(reloaded.get(&ws.id), Some(&ws));
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.repo_path(&ws.id).expect("path"), ws.repo_path);
    }

    #[test]
    fn registries_in_different_dirs_are_isolated() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");
        let origin = TestRepo::new().expect("origin");
        let url = origin.path().to_str().expect("utf8").to_string();

        let mut first = WorkspaceRegistry::load(a.path()).expect("load");
        first.create("one", &url).expect("create");
        let second = WorkspaceRegistry::load(b.path()).expect("load");
        assert!(second.list().is_empty());
    }

    #[test]
    fn unknown_workspace_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let registry = WorkspaceRegistry::load(temp.path()).expect("load");
        let err = registry.repo_path("nope").unwrap_err();
        assert!(err.to_string().contains("unknown workspace"));
    }

    #[test]
    fn clone_failure_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut registry = WorkspaceRegistry::load(temp.path()).expect("load");
        let missing = temp.path().join("no-such-repo");
        let err = registry
            .create("demo", missing.to_str().expect("utf8"))
            .unwrap_err();
        assert!(err.to_string().contains("git clone"));
        assert!(registry.list().is_empty());
    }
}
