//! Deterministic, pure logic shared by the coding-task core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (generator text, plans, documents) and return deterministic outputs
//! suitable for tests.

pub mod context;
pub mod file_blocks;
pub mod naming;
pub mod plan;
pub mod ranking;
pub mod types;
