//! File-block wire format exchanged with the text generator.
//!
//! ```text
//! FILE: <relative/path>
//! <raw file content, any number of lines>
//! END_FILE
//! ```

use crate::core::types::FileEdits;

pub const FILE_MARKER: &str = "FILE: ";
pub const END_MARKER: &str = "END_FILE";

/// Parse generator output into file edits.
///
/// A `FILE: ` line flushes any file in progress and starts a new one; an
/// `END_FILE` line flushes the current file. Lines outside a block are
/// discarded, and a block that never sees `END_FILE` before the next `FILE: `
/// or end of input is flushed only in the former case: trailing content without
/// an end marker is dropped.
pub fn parse_file_blocks(text: &str) -> FileEdits {
    let mut files = FileEdits::new();
    let mut current: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(FILE_MARKER) {
            if let Some(path) = current.take() {
                files.insert(path, trim_blank_lines(&buffer));
            }
            buffer.clear();
            let path = rest.trim();
            current = (!path.is_empty()).then(|| path.to_string());
        } else if line.starts_with(END_MARKER) {
            if let Some(path) = current.take() {
                files.insert(path, trim_blank_lines(&buffer));
            }
            buffer.clear();
        } else if current.is_some() {
            buffer.push(line);
        }
    }

    files
}

/// Render edits back into the file-block format (used to show the current
/// files to the fixer).
pub fn render_file_blocks(files: &FileEdits) -> String {
    let mut buf = String::new();
    for (path, content) in files {
        buf.push_str(FILE_MARKER);
        buf.push_str(path);
        buf.push('\n');
        if !content.is_empty() {
            buf.push_str(content);
            buf.push('\n');
        }
        buf.push_str(END_MARKER);
        buf.push_str("\n\n");
    }
    buf.trim_end().to_string()
}

/// Join lines, dropping leading and trailing whitespace-only lines.
///
/// Indentation inside the kept lines is preserved.
fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |idx| idx + 1);
    lines[start..end].join("\n")
}
