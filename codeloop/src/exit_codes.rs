//! Stable exit codes for codeloop CLI commands.

/// Command succeeded. A task whose steps failed verification still exits `OK`;
/// the per-step outcome is in the printed report.
pub const OK: i32 = 0;
/// Command failed: generation, retrieval, filesystem or git error.
pub const FAILED: i32 = 1;
/// Invalid configuration or arguments (clap uses the same code for usage errors).
pub const INVALID: i32 = 2;
