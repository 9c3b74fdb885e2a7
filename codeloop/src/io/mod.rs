//! I/O adapters for the coding-task core.

pub mod atomic;
pub mod command;
pub mod config;
pub mod files;
pub mod git;
pub mod knowledge;
pub mod llm;
pub mod path_guard;
pub mod process;
pub mod prompt;
pub mod workspace;
