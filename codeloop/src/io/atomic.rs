//! Whole-file replacement through a sibling temp file.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Write `contents` to `<path>.tmp`, then rename it over `path`.
///
/// Missing parent directories are created. Readers see either the old file or
/// the new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = tmp_sibling(path);
    fs::write(&tmp_path, contents).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state/nested/kb.json");

        write_atomic(&path, "[]\n").expect("first write");
        write_atomic(&path, "[1]\n").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "[1]\n");
        let entries: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![OsString::from("kb.json")]);
    }

    #[test]
    fn temp_file_keeps_the_full_name() {
        assert_eq!(
            tmp_sibling(Path::new("dir/codeloop.toml")),
            PathBuf::from("dir/codeloop.toml.tmp")
        );
        assert_eq!(tmp_sibling(Path::new("kb")), PathBuf::from("kb.tmp"));
    }

    #[test]
    fn directory_in_the_way_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("taken");
        fs::create_dir(&path).expect("mkdir");
        let err = write_atomic(&path, "x").unwrap_err();
        assert!(format!("{err:#}").contains("replace"));
    }
}
