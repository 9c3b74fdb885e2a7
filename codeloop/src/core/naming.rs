//! Deterministic names derived from task text.

/// Branch name for a task: `<prefix><task lower-cased, spaces -> '-'>`.
pub fn branch_name(prefix: &str, task: &str) -> String {
    format!("{prefix}{}", task.to_lowercase().replace(' ', "-"))
}

/// Commit message for a finished task.
pub fn commit_message(task: &str) -> String {
    format!("Implemented task: {task}")
}

/// Simulated pull-request URL for a pushed branch.
pub fn pr_url(base: &str, branch: &str) -> String {
    format!("{}/pull/new/{branch}", base.trim_end_matches('/'))
}
