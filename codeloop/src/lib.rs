//! Retrieval-augmented coding task executor.
//!
//! A task is planned into steps with the help of a knowledge store; each step
//! generates files, writes them through a path guard, runs the generated tests
//! and gets one fix pass on failure. The finished working copy is branched and
//! committed.
//!
//! - **[`core`]**: Pure, deterministic logic (file-block format, plan parsing,
//!   ranking, naming, step phases). No I/O.
//! - **[`io`]**: Side-effecting capabilities (text generation, processes, git,
//!   filesystem, knowledge store, workspaces, config).
//! - **[`agents`]**: Prompt-driven stages built on the text generator.
//!
//! Orchestration modules ([`task`], [`step`], [`verify`]) wire them together for
//! the CLI.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod step;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
