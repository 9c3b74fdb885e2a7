//! Configuration stored in `codeloop.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::atomic::write_atomic;

pub const DEFAULT_CONFIG_FILE: &str = "codeloop.toml";

/// Top-level configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// values that work against a local OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub verification: VerificationConfig,
    pub git: GitConfig,
    /// Directory holding cloned workspaces and the workspace registry.
    pub workspaces_dir: PathBuf,
}

/// Which text-generation backend to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions over HTTP.
    Http,
    /// Pipe the prompt to a local command and read the completion from stdout.
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// Full chat-completions URL (`LLM_API_URL` overrides).
    pub endpoint: String,
    /// API key (`LLM_API_KEY` overrides). Prefer the environment variable.
    pub api_key: Option<String>,
    /// Model name (`LLM_MODEL` overrides).
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Command for the `command` backend, e.g. `["codex", "exec", "-"]`.
    pub command: Vec<String>,
    /// Truncate command-backend stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Http,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            command: Vec::new(),
            output_limit_bytes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// JSON file backing the knowledge store.
    pub store_path: PathBuf,
    /// Number of documents retrieved as task context.
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("workspaces/knowledge.json"),
            k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerificationConfig {
    /// Command prefix; the verification file path is appended as the last argument.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Truncate verification stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "python3".to_string(),
                "-m".to_string(),
                "unittest".to_string(),
            ],
            timeout_secs: 5 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Prefix for task branches.
    pub branch_prefix: String,
    /// Base URL used to render a pull-request link, e.g. `https://github.com/org/repo`.
    pub pr_url_base: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            branch_prefix: "feature/".to_string(),
            pr_url_base: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            verification: VerificationConfig::default(),
            git: GitConfig::default(),
            workspaces_dir: PathBuf::from("workspaces"),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(anyhow!("llm.timeout_secs must be > 0"));
        }
        if self.llm.output_limit_bytes == 0 {
            return Err(anyhow!("llm.output_limit_bytes must be > 0"));
        }
        match self.llm.backend {
            LlmBackend::Http => {
                if self.llm.endpoint.trim().is_empty() {
                    return Err(anyhow!("llm.endpoint must be set for the http backend"));
                }
                if self.llm.model.trim().is_empty() {
                    return Err(anyhow!("llm.model must be set for the http backend"));
                }
            }
            LlmBackend::Command => {
                if self.llm.command.is_empty() || self.llm.command[0].trim().is_empty() {
                    return Err(anyhow!(
                        "llm.command must be a non-empty array for the command backend"
                    ));
                }
            }
        }
        if self.retrieval.k == 0 {
            return Err(anyhow!("retrieval.k must be > 0"));
        }
        if self.verification.command.is_empty() || self.verification.command[0].trim().is_empty()
        {
            return Err(anyhow!("verification.command must be a non-empty array"));
        }
        if self.verification.timeout_secs == 0 {
            return Err(anyhow!("verification.timeout_secs must be > 0"));
        }
        if self.verification.output_limit_bytes == 0 {
            return Err(anyhow!("verification.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Apply `LLM_API_URL`, `LLM_API_KEY` and `LLM_MODEL` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty("LLM_API_URL") {
            self.llm.endpoint = url;
        }
        if let Some(key) = non_empty("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm.model = model;
        }
    }
}

/// Load config from a TOML file, then apply process environment overrides.
///
/// If the file is missing, starts from `AppConfig::default()`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut cfg = read_config_file(path)?;
    cfg.apply_env_overrides(|key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
