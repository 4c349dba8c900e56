//! Filesystem copy primitive used by the rename flows.

use crate::error::{ClearfileError, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Place a rendered file name inside `destination`.
///
/// The name must be exactly one plain path component. Absolute paths,
/// separators and `..` would let extracted values point the copy outside
/// the destination, so they fail with [`ClearfileError::FileOperation`].
pub fn target_path(destination: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(destination.join(name)),
        _ => Err(ClearfileError::FileOperation(format!(
            "Rendered name is not a plain file name: {}",
            name
        ))),
    }
}

/// Copy `src` to `dst`, creating missing parent directories of `dst`.
///
/// Returns the number of bytes copied. Every failure is reported as
/// [`ClearfileError::FileOperation`], including a `dst` that resolves to
/// `src` itself.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    if !src.is_file() {
        return Err(ClearfileError::FileOperation(format!(
            "Source file does not exist: {}",
            src.display()
        )));
    }

    // Copying onto the source truncates it before reading.
    if let (Ok(from), Ok(to)) = (src.canonicalize(), dst.canonicalize()) {
        if from == to {
            return Err(ClearfileError::FileOperation(format!(
                "Source and destination are the same file: {}",
                src.display()
            )));
        }
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| describe(e, "create directory", parent))?;
        }
    }

    std::fs::copy(src, dst).map_err(|e| describe(e, "copy to", dst))
}

fn describe(err: std::io::Error, action: &str, path: &Path) -> ClearfileError {
    let message = match err.kind() {
        ErrorKind::PermissionDenied => format!("Permission denied: cannot {} {}", action, path.display()),
        ErrorKind::NotFound => format!("Path not found: cannot {} {}", action, path.display()),
        _ => format!("Cannot {} {}: {}", action, path.display(), err),
    };
    ClearfileError::FileOperation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_into_new_directories() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        std::fs::write(&src, b"hello").unwrap();

        let dst = tmp.path().join("out").join("nested").join("b.txt");
        assert_eq!(copy_file(&src, &dst).unwrap(), 5);
        assert_eq!(std::fs::read(&dst).unwrap(), b"hello");
        assert!(src.exists());
    }

    #[test]
    fn copying_onto_itself_leaves_the_source_alone() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        std::fs::write(&src, b"precious data").unwrap();

        let same = tmp.path().join(".").join("a.txt");
        let err = copy_file(&src, &same).unwrap_err();
        assert!(matches!(err, ClearfileError::FileOperation(ref m) if m.contains("same file")));
        assert_eq!(std::fs::read(&src).unwrap(), b"precious data");
    }

    #[test]
    fn target_path_accepts_only_plain_names() {
        let dest = Path::new("/out");
        assert_eq!(target_path(dest, "2021_report.pdf").unwrap(), dest.join("2021_report.pdf"));
        assert_eq!(target_path(dest, "...pdf").unwrap(), dest.join("...pdf"));

        for name in ["/tmp/src/a.pdf", "../a.pdf", "..", "sub/a.pdf", "./a.pdf", "a.pdf/", ""] {
            let err = target_path(dest, name).unwrap_err();
            assert!(
                matches!(err, ClearfileError::FileOperation(ref m) if m.contains("plain file name")),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn missing_source_is_a_file_operation_error() {
        let tmp = TempDir::new().unwrap();
        let err = copy_file(&tmp.path().join("absent.txt"), &tmp.path().join("b.txt")).unwrap_err();
        assert!(matches!(err, ClearfileError::FileOperation(ref m) if m.contains("does not exist")));
    }
}
