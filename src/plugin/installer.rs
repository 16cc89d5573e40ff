use crate::error::{Result, UpdraftError};
use crate::utils::{archive, fs as fs_utils};
use std::fs;
use std::path::{Path, PathBuf};

/// Places downloaded artifacts into the local installation
pub trait Installer: Send + Sync {
    /// Install a downloaded artifact and return the path it now lives at.
    /// With `overwrite` set, colliding targets are replaced.
    fn install(&self, artifact: &Path, display_name: &str, overwrite: bool) -> Result<PathBuf>;
}

/// Installs plugins into a flat directory: archives are unpacked, plain
/// files copied as-is
pub struct DirInstaller {
    plugins_dir: PathBuf,
}

impl DirInstaller {
    pub fn new(plugins_dir: &Path) -> Self {
        Self {
            plugins_dir: plugins_dir.to_path_buf(),
        }
    }

    /// Unpack into a staging directory beside the final location, then move
    /// the top-level entries over. A failed extraction leaves the plugins
    /// directory untouched.
    fn install_archive(&self, artifact: &Path, overwrite: bool) -> Result<PathBuf> {
        let staging = tempfile::Builder::new()
            .prefix(".staging")
            .tempdir_in(&self.plugins_dir)?;
        archive::extract_archive(artifact, staging.path())?;

        let mut installed = Vec::new();
        for entry in fs::read_dir(staging.path())? {
            let entry = entry?;
            let target = self.plugins_dir.join(entry.file_name());
            clear_target(&target, overwrite)?;
            fs::rename(entry.path(), &target)?;
            installed.push(target);
        }

        match installed.len() {
            0 => Err(UpdraftError::InstallFailed {
                message: format!("install failed: {} contained no files", artifact.display()),
            }),
            1 => Ok(installed.remove(0)),
            _ => Ok(self.plugins_dir.clone()),
        }
    }

    fn install_file(&self, artifact: &Path, overwrite: bool) -> Result<PathBuf> {
        let name = artifact
            .file_name()
            .ok_or_else(|| UpdraftError::InvalidFileName {
                name: artifact.display().to_string(),
            })?;

        let target = self.plugins_dir.join(name);
        clear_target(&target, overwrite)?;
        fs_utils::copy_file(artifact, &target)?;
        Ok(target)
    }
}

impl Installer for DirInstaller {
    fn install(&self, artifact: &Path, display_name: &str, overwrite: bool) -> Result<PathBuf> {
        fs_utils::ensure_dir_exists(&self.plugins_dir)?;
        log::info!("installing {} from {}", display_name, artifact.display());

        if archive::is_archive(artifact) {
            self.install_archive(artifact, overwrite)
        } else {
            self.install_file(artifact, overwrite)
        }
    }
}

fn clear_target(target: &Path, overwrite: bool) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }

    if !overwrite {
        return Err(UpdraftError::AlreadyExists {
            path: target.to_path_buf(),
        });
    }

    if target.is_dir() {
        fs_utils::remove_dir_recursive(target)
    } else {
        fs::remove_file(target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, contents) in entries {
            if name.ends_with('/') {
                writer.add_directory(name.trim_end_matches('/'), options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_install_archive_with_single_dir() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("sample.zip");
        write_zip(
            &package,
            &[
                ("sample-tool/", ""),
                ("sample-tool/plugin.toml", "[plugin]\nid = \"s\"\nname = \"S\"\nversion = \"1.0\"\n"),
                ("sample-tool/plugin.wasm", "\0asm"),
            ],
        );

        let plugins_dir = dir.path().join("plugins");
        let installer = DirInstaller::new(&plugins_dir);
        let installed = installer.install(&package, "Sample", false).unwrap();

        assert_eq!(installed, plugins_dir.join("sample-tool"));
        assert!(installed.join("plugin.toml").exists());
        assert!(installed.join("plugin.wasm").exists());
    }

    #[test]
    fn test_install_plain_file_copies() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("helper.wasm");
        fs::write(&artifact, b"\0asm").unwrap();

        let plugins_dir = dir.path().join("plugins");
        let installer = DirInstaller::new(&plugins_dir);
        let installed = installer.install(&artifact, "Helper", false).unwrap();

        assert_eq!(installed, plugins_dir.join("helper.wasm"));
        assert!(installed.exists());
        // Source stays where it was; callers decide when to clean it up
        assert!(artifact.exists());
    }

    #[test]
    fn test_install_refuses_collision_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("sample.zip");
        write_zip(&package, &[("sample-tool/", ""), ("sample-tool/a.txt", "new")]);

        let plugins_dir = dir.path().join("plugins");
        fs::create_dir_all(plugins_dir.join("sample-tool")).unwrap();
        fs::write(plugins_dir.join("sample-tool/a.txt"), "old").unwrap();

        let installer = DirInstaller::new(&plugins_dir);
        let result = installer.install(&package, "Sample", false);
        assert!(matches!(result, Err(UpdraftError::AlreadyExists { .. })));
        // The collision was detected before anything was replaced
        let kept = fs::read_to_string(plugins_dir.join("sample-tool/a.txt")).unwrap();
        assert_eq!(kept, "old");
    }

    #[test]
    fn test_install_overwrite_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("sample.zip");
        write_zip(&package, &[("sample-tool/", ""), ("sample-tool/a.txt", "new")]);

        let plugins_dir = dir.path().join("plugins");
        fs::create_dir_all(plugins_dir.join("sample-tool")).unwrap();
        fs::write(plugins_dir.join("sample-tool/a.txt"), "old").unwrap();
        fs::write(plugins_dir.join("sample-tool/stale.txt"), "stale").unwrap();

        let installer = DirInstaller::new(&plugins_dir);
        let installed = installer.install(&package, "Sample", true).unwrap();

        let replaced = fs::read_to_string(installed.join("a.txt")).unwrap();
        assert_eq!(replaced, "new");
        assert!(!installed.join("stale.txt").exists());
    }

    #[test]
    fn test_install_rejects_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("empty.zip");
        write_zip(&package, &[]);

        let installer = DirInstaller::new(&dir.path().join("plugins"));
        let result = installer.install(&package, "Empty", false);
        assert!(matches!(result, Err(UpdraftError::InstallFailed { .. })));
    }
}
