//! Retrieval-augmented coding task executor.
//!
//! Ingests requirement documents into a local knowledge store, then turns a
//! natural-language task into planned, generated, verified and committed
//! changes in a git working copy.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use codeloop::agents::advisor::AdvisorAgent;
use codeloop::agents::analyst::{AnalystAgent, IngestRequest};
use codeloop::exit_codes;
use codeloop::io::command::ProcessRunner;
use codeloop::io::config::{AppConfig, DEFAULT_CONFIG_FILE, load_config, write_config};
use codeloop::io::git::GitCli;
use codeloop::io::knowledge::{KnowledgeStore, Retriever};
use codeloop::io::llm::generator_from_config;
use codeloop::io::workspace::WorkspaceRegistry;
use codeloop::logging;
use codeloop::task::{Capabilities, TaskConfig, run_task};

#[derive(Parser)]
#[command(
    name = "codeloop",
    version,
    about = "Plan, generate, verify and commit coding tasks"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Summarize a requirement document and add it to the knowledge store.
    Ingest {
        #[arg(long)]
        title: String,
        /// Where the document came from (ticket key, URL, file name).
        #[arg(long, default_value = "manual")]
        source: String,
        /// Document file, or `-` for stdin.
        path: PathBuf,
    },
    /// Print the most relevant knowledge documents for a query.
    Search {
        query: String,
        /// Number of documents (defaults to `retrieval.k`).
        #[arg(short)]
        k: Option<usize>,
    },
    /// Answer a question from the knowledge store.
    Ask {
        question: String,
        /// Number of documents used as context (defaults to `retrieval.k`).
        #[arg(short)]
        k: Option<usize>,
    },
    /// Execute a coding task against a repository or workspace.
    Run {
        task: String,
        #[command(flatten)]
        target: Target,
    },
    /// Manage cloned workspaces.
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Path of an existing git working copy.
    #[arg(long)]
    repo: Option<PathBuf>,
    /// Id of a workspace created with `workspace create`.
    #[arg(long)]
    workspace: Option<String>,
}

#[derive(Subcommand)]
enum WorkspaceCommand {
    /// Clone a repository into a new workspace.
    Create { name: String, repo_url: String },
    /// List known workspaces.
    List,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Command::Init { force } = cli.command {
        exit_on_error(cmd_init(&cli.config, force), exit_codes::FAILED);
        return;
    }

    let cfg = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("invalid config: {err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    };
    exit_on_error(run(cli.command, &cfg), exit_codes::FAILED);
}

fn exit_on_error(result: Result<()>, code: i32) {
    if let Err(err) = result {
        eprintln!("{err:#}");
        std::process::exit(code);
    }
}

fn run(command: Command, cfg: &AppConfig) -> Result<()> {
    match command {
        Command::Init { .. } => Ok(()),
        Command::Ingest {
            title,
            source,
            path,
        } => cmd_ingest(cfg, &title, &source, &path),
        Command::Search { query, k } => cmd_search(cfg, &query, k.unwrap_or(cfg.retrieval.k)),
        Command::Ask { question, k } => cmd_ask(cfg, &question, k.unwrap_or(cfg.retrieval.k)),
        Command::Run { task, target } => cmd_run(cfg, &task, target),
        Command::Workspace(WorkspaceCommand::Create { name, repo_url }) => {
            let mut registry = WorkspaceRegistry::load(&cfg.workspaces_dir)?;
            let workspace = registry.create(&name, &repo_url)?;
            print_json(&workspace)
        }
        Command::Workspace(WorkspaceCommand::List) => {
            let registry = WorkspaceRegistry::load(&cfg.workspaces_dir)?;
            print_json(&registry.list())
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AppConfig::default())?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_ingest(cfg: &AppConfig, title: &str, source: &str, path: &Path) -> Result<()> {
    let content = read_document(path)?;
    let generator = generator_from_config(&cfg.llm)?;
    let mut store = KnowledgeStore::open(&cfg.retrieval.store_path)?;
    let id = AnalystAgent::new().ingest(
        &generator,
        &mut store,
        &IngestRequest {
            title,
            source,
            content: &content,
        },
    )?;
    print_json(&json!({ "id": id, "store": store.path() }))
}

fn cmd_search(cfg: &AppConfig, query: &str, k: usize) -> Result<()> {
    let store = KnowledgeStore::open(&cfg.retrieval.store_path)?;
    let docs = store.search(query, k)?;
    print_json(&docs)
}

fn cmd_ask(cfg: &AppConfig, question: &str, k: usize) -> Result<()> {
    let generator = generator_from_config(&cfg.llm)?;
    let store = KnowledgeStore::open(&cfg.retrieval.store_path)?;
    let answer = AdvisorAgent::new().answer(&generator, &store, question, k)?;
    print_json(&answer)
}

fn cmd_run(cfg: &AppConfig, task: &str, target: Target) -> Result<()> {
    let repo = match (target.repo, target.workspace) {
        (Some(repo), _) => repo,
        (None, Some(id)) => WorkspaceRegistry::load(&cfg.workspaces_dir)?.repo_path(&id)?,
        (None, None) => bail!("either --repo or --workspace is required"),
    };
    debug!(repo = %repo.display(), "resolved task target");

    let generator = generator_from_config(&cfg.llm)?;
    let store = KnowledgeStore::open(&cfg.retrieval.store_path)?;
    let runner = ProcessRunner::new(
        cfg.verification.timeout(),
        cfg.verification.output_limit_bytes,
    );
    let caps = Capabilities {
        generator: &generator,
        retriever: &store,
        runner: &runner,
        vcs: &GitCli,
    };
    let outcome = run_task(&caps, &TaskConfig::from_app(cfg), &repo, task)?;
    print_json(&outcome)
}

fn read_document(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read document from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_repo() {
        let cli = Cli::parse_from(["codeloop", "run", "Add health check", "--repo", "."]);
        match cli.command {
            Command::Run { task, target } => {
                assert_eq!(task, "Add health check");
                assert_eq!(target.repo, Some(PathBuf::from(".")));
                assert!(target.workspace.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["codeloop", "run", "task"]).is_err());
        assert!(
            Cli::try_parse_from([
                "codeloop",
                "run",
                "task",
                "--repo",
                ".",
                "--workspace",
                "ws"
            ])
            .is_err()
        );
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["codeloop", "search", "health", "-k", "5", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Search { k: Some(5), .. }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_ask_with_k() {
        let cli = Cli::parse_from(["codeloop", "ask", "Which port?", "-k", "2"]);
        match cli.command {
            Command::Ask { question, k } => {
                assert_eq!(question, "Which port?");
                assert_eq!(k, Some(2));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn parse_workspace_create() {
        let cli = Cli::parse_from(["codeloop", "workspace", "create", "demo", "https://x/y.git"]);
        assert!(matches!(
            cli.command,
            Command::Workspace(WorkspaceCommand::Create { .. })
        ));
    }
}
