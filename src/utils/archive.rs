use crate::error::{Result, UpdraftError};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::Archive;
use zip::ZipArchive;

/// Whether a plugin artifact should be unpacked rather than copied verbatim.
pub fn is_archive(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => {
            name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
        }
        None => false,
    }
}

/// Unpack a `.zip`, `.tar.gz` or `.tgz` archive into `destination`,
/// creating the directory if needed.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<()> {
    std::fs::create_dir_all(destination)?;

    let file_name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UpdraftError::UnsupportedArchive {
            name: archive_path.display().to_string(),
        })?;

    if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
        extract_tar_gz(archive_path, destination)
    } else if file_name.ends_with(".zip") {
        extract_zip(archive_path, destination)
    } else {
        Err(UpdraftError::UnsupportedArchive {
            name: file_name.to_string(),
        })
    }
}

fn extract_tar_gz(archive_path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    archive.unpack(destination)?;
    Ok(())
}

fn extract_zip(archive_path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let outpath = match file.enclosed_name() {
            Some(path) => destination.join(path),
            None => continue,
        };

        if file.name().ends_with('/') {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent() {
                if !p.exists() {
                    std::fs::create_dir_all(p)?;
                }
            }
            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
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
    fn test_is_archive() {
        assert!(is_archive(Path::new("a/plugin.zip")));
        assert!(is_archive(Path::new("plugin.tar.gz")));
        assert!(is_archive(Path::new("plugin.tgz")));
        assert!(!is_archive(Path::new("plugin.wasm")));
        assert!(!is_archive(Path::new("plugin")));
    }

    #[test]
    fn test_extract_zip_preserves_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.zip");
        write_zip(
            &archive,
            &[
                ("pkg/", ""),
                ("pkg/plugin.toml", "[plugin]\nid = \"x\"\nname = \"X\"\nversion = \"1.0\"\n"),
                ("pkg/payload.bin", "data"),
            ],
        );

        let out = dir.path().join("out");
        extract_archive(&archive, &out).unwrap();

        assert!(out.join("pkg/plugin.toml").is_file());
        assert!(out.join("pkg/payload.bin").is_file());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("pkg.rar");
        std::fs::write(&bogus, b"not an archive").unwrap();

        let err = extract_archive(&bogus, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, UpdraftError::UnsupportedArchive { .. }));
    }
}
