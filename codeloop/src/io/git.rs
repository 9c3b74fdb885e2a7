//! Git adapter for task finalization and workspace cloning.
//!
//! Tasks finish by branching and committing the working copy, so we keep a
//! small, explicit wrapper around `git` subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

/// Version-control capability consumed by the task finalizer.
pub trait VersionControl {
    /// Create (or switch to, if it already exists) `branch` in `repo`.
    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Stage every change in `repo` and commit it.
    ///
    /// Returns `Ok(false)` when there was nothing to commit.
    fn commit_all(&self, repo: &Path, message: &str) -> Result<bool>;
}

/// `VersionControl` backed by the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl VersionControl for GitCli {
    #[instrument(skip_all, fields(branch))]
    fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        let git = Git::new(repo);
        if git.branch_exists(branch)? {
            warn!(branch, "branch already exists, checking it out");
            return git.checkout_branch(branch);
        }
        git.checkout_new_branch(branch)
    }

    fn commit_all(&self, repo: &Path, message: &str) -> Result<bool> {
        let git = Git::new(repo);
        git.add_all()?;
        git.commit_staged(message)
    }
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Clone `url` into `target` and return a wrapper for the new working copy.
    #[instrument(skip_all, fields(url, target = %target.display()))]
    pub fn clone_into(url: &str, target: &Path) -> Result<Self> {
        info!("cloning repository");
        let output = Command::new("git")
            .arg("clone")
            .arg(url)
            .arg(target)
            .output()
            .context("spawn git clone")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git clone {url} failed: {}", stderr.trim()));
        }
        Ok(Self::new(target))
    }

    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD"));
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// True if there are no staged, unstaged or untracked changes.
    pub fn is_clean(&self) -> Result<bool> {
        let out = self.run_capture(&["status", "--porcelain", "-uall"])?;
        Ok(out.trim().is_empty())
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let status = self
            .run(&[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{branch}"),
            ])?
            .status;
        Ok(status.success())
    }

    /// Create and checkout a new branch at current HEAD.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Checkout an existing branch.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "checking out branch");
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Subject line of the most recent commit.
    pub fn last_commit_subject(&self) -> Result<String> {
        let out = self.run_capture(&["log", "-1", "--format=%s"])?;
        Ok(out.trim().to_string())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}
