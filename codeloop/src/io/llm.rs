//! Text-generation capability.
//!
//! The [`TextGenerator`] trait decouples planning and code generation from the
//! actual model backend. Two backends exist: an OpenAI-compatible HTTP client
//! and a local command that reads the prompt on stdin. Tests use scripted
//! generators that return predetermined completions.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::io::config::{LlmBackend, LlmConfig};
use crate::io::process::run_command_with_timeout;

/// Synchronous prompt -> completion.
pub trait TextGenerator {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

/// Build the generator selected by `config.backend`.
pub fn generator_from_config(config: &LlmConfig) -> Result<Box<dyn TextGenerator>> {
    match config.backend {
        LlmBackend::Http => Ok(Box::new(HttpTextGenerator::new(config)?)),
        LlmBackend::Command => Ok(Box::new(CommandTextGenerator::new(config)?)),
    }
}

/// Failures of the HTTP backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid header: {0}")]
    Header(String),
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug)]
pub struct HttpTextGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl HttpTextGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn headers(&self) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| GenerationError::Header(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_else(|_| "(no body)".into());
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::InvalidResponse(format!("parse response: {e}")))?;
        extract_content(parsed)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::InvalidResponse("no message content".to_string()))
}

impl TextGenerator for HttpTextGenerator {
    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        info!(endpoint = %self.endpoint, "requesting completion");
        let text = self.request(prompt)?;
        debug!(completion_bytes = text.len(), "completion received");
        Ok(text)
    }
}

/// Generator that pipes the prompt to a local command and reads stdout.
#[derive(Debug, Clone)]
pub struct CommandTextGenerator {
    argv: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandTextGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.command.is_empty() {
            return Err(anyhow!("llm.command is empty"));
        }
        Ok(Self {
            argv: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
        })
    }
}

impl TextGenerator for CommandTextGenerator {
    #[instrument(skip_all, fields(program = %self.argv[0], prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .with_context(|| format!("run {}", self.argv.join(" ")))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "generator command timed out");
            return Err(anyhow!(
                "{} timed out after {:?}",
                self.argv[0],
                self.timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "generator command failed");
            return Err(anyhow!(
                "{} failed with status {:?}: {}",
                self.argv[0],
                output.status.code(),
                output.stderr_lossy().trim()
            ));
        }
        Ok(output.stdout_lossy())
    }
}
