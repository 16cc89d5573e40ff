use crate::error::{Result, UpdraftError};
use std::path::Path;

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => UpdraftError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => UpdraftError::from(e),
        })?;
    }
    Ok(())
}

pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => UpdraftError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => UpdraftError::from(e),
        })?;
    }
    Ok(())
}

pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        ensure_dir_exists(parent)?;
    }

    std::fs::copy(from, to)?;
    Ok(())
}

/// Characters that never belong in a server-supplied file name, on any
/// platform updraft runs on.
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', ';'];

/// Whether a file name resolved from a response header or URL is safe to
/// create inside the download directory. Names are rejected, never repaired.
pub fn is_valid_file_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }

    !name
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_file_names() {
        assert!(is_valid_file_name("thing-1.0.zip"));
        assert!(is_valid_file_name("plugin_2.3.1.tar.gz"));
        assert!(is_valid_file_name("UPPER.case.Zip"));
    }

    #[test]
    fn test_invalid_file_names() {
        assert!(!is_valid_file_name(""));
        assert!(!is_valid_file_name("."));
        assert!(!is_valid_file_name(".."));
        assert!(!is_valid_file_name("../escape.zip"));
        assert!(!is_valid_file_name("dir/file.zip"));
        assert!(!is_valid_file_name("back\\slash.zip"));
        assert!(!is_valid_file_name("query?.zip"));
        assert!(!is_valid_file_name("nul\0byte"));
    }
}
