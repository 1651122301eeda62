//! Reading and writing diagram files.

use crate::error::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a diagram, appending `.json` when the path has no such extension.
/// Returns the path actually written.
pub fn save_diagram(path: impl AsRef<Path>, text: &str) -> Result<PathBuf, StoreError> {
    let mut path = path.as_ref().to_path_buf();
    if path.extension().is_none_or(|ext| ext != "json") {
        let mut name = path.as_os_str().to_os_string();
        name.push(".json");
        path = PathBuf::from(name);
    }
    fs::write(&path, text)?;
    log::info!("saved diagram to {}", path.display());
    Ok(path)
}

pub fn load_diagram(path: impl AsRef<Path>) -> Result<String, StoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    log::info!("loaded diagram from {}", path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        let written = save_diagram(dir.path().join("board"), "{}").unwrap();
        assert_eq!(written, dir.path().join("board.json"));
        assert_eq!(load_diagram(&written).unwrap(), "{}");

        let kept = save_diagram(dir.path().join("other.json"), "{}").unwrap();
        assert_eq!(kept, dir.path().join("other.json"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_diagram(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
