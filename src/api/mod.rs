//! 对外接口：图像裁剪与视频关键帧

pub mod image;
pub mod video;

use crate::core::error::{Result, ThumbError};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file of a directory batch. Exactly one of `data` / `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem<T> {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> BatchItem<T> {
    pub fn from_result(path: PathBuf, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                path,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                path,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub(crate) fn validate_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ThumbError::InputValidation(format!(
            "file not found: {}",
            path.display()
        )));
    }
    Ok(())
}

pub(crate) fn validate_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(ThumbError::InputValidation(format!(
            "directory not found: {}",
            path.display()
        )));
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Files under `dir` (recursively) whose extension is in `extensions`,
/// case-insensitive, sorted by path.
pub(crate) fn collect_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    validate_dir(dir)?;
    let mut pending = vec![dir.to_path_buf()];
    let mut files = Vec::new();
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_extension(&path, extensions) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.JPG", "a.png", "notes.txt", "nested/c.jpeg", "noext"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let exts = vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()];
        let files = collect_files(dir.path(), &exts).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "nested/c.jpeg"]);
    }

    #[test]
    fn test_missing_paths_rejected() {
        let err = validate_file(Path::new("/no/such/file.jpg")).unwrap_err();
        assert!(matches!(err, ThumbError::InputValidation(_)));
        let err = collect_files(Path::new("/no/such/dir"), &[]).unwrap_err();
        assert!(matches!(err, ThumbError::InputValidation(_)));
    }

    #[test]
    fn test_batch_item_serialization() {
        let ok = BatchItem::from_result(PathBuf::from("a.jpg"), Ok(3u32));
        assert!(ok.is_ok());
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"path":"a.jpg","data":3}"#
        );
        let failed: BatchItem<u32> = BatchItem::from_result(
            PathBuf::from("b.jpg"),
            Err(ThumbError::InputValidation("bad".into())),
        );
        assert!(!failed.is_ok());
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"path":"b.jpg","error":"Invalid input: bad"}"#
        );
    }
}
