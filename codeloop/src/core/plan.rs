//! Plan parsing and step classification.

use crate::core::types::Step;

const COMMENT_MARKER: char = '#';
const VERIFICATION_MARKER: &str = "test";

/// Split planner output into steps, one per non-empty, non-comment line.
///
/// Order is preserved; no other validation of step content happens here.
pub fn parse_plan(text: &str) -> Vec<Step> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(str::to_string)
        .collect()
}

/// True if `path` names a verification file (any name or directory segment
/// containing `test`).
pub fn is_verification_file(path: &str) -> bool {
    path.contains(VERIFICATION_MARKER)
}

/// Select verification files from written paths, keeping input order.
pub fn verification_files<'a, I>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    paths
        .into_iter()
        .filter(|path| is_verification_file(path))
        .cloned()
        .collect()
}
