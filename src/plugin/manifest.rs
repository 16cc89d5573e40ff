use crate::error::{Result, UpdraftError};
use crate::utils::archive;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Plugin manifest structure matching plugin.toml format
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    pub plugin: PluginMetadata,
    #[serde(default)]
    pub compatibility: BuildCompatibility,
    #[serde(default)]
    pub dependencies: PluginDependencies,
}

/// Core plugin metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Host build range the plugin declares itself compatible with.
/// `until_build` may end in `*` to cover a whole release line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildCompatibility {
    pub since_build: Option<String>,
    pub until_build: Option<String>,
}

/// Dependencies on other plugins
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginDependencies {
    #[serde(flatten)]
    pub plugins: std::collections::HashMap<String, String>,
}

impl PluginManifest {
    /// Parse a plugin manifest from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: PluginManifest =
            toml::from_str(content).map_err(|e| UpdraftError::manifest_error(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Name shown to users; falls back to the id when empty
    pub fn display_name(&self) -> &str {
        if self.plugin.name.is_empty() {
            &self.plugin.id
        } else {
            &self.plugin.name
        }
    }

    /// Validate the manifest has all required fields
    pub fn validate(&self) -> Result<()> {
        if self.plugin.id.is_empty() {
            return Err(UpdraftError::manifest_error("plugin id is required"));
        }

        if self.plugin.version.is_empty() {
            return Err(UpdraftError::manifest_error("plugin version is required"));
        }

        // Validate id format (alphanumeric, dots, hyphens, underscores)
        if !self
            .plugin
            .id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            return Err(UpdraftError::manifest_error(
                "plugin id can only contain alphanumeric characters, dots, hyphens, and underscores",
            ));
        }

        Ok(())
    }
}

/// Read the manifest directly out of an installed plugin directory or a
/// packaged zip. Returns `None` when the location carries no manifest or
/// the manifest does not parse; a corrupt archive is a hard error.
pub fn read_manifest(path: &Path) -> Result<Option<PluginManifest>> {
    if path.is_dir() {
        let manifest_path = path.join("plugin.toml");
        if !manifest_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&manifest_path)?;
        return Ok(parse_lenient(&content, &manifest_path));
    }

    let is_zip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if !is_zip {
        return Ok(None);
    }

    let file = fs::File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut entry = match zip.by_name("plugin.toml") {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(parse_lenient(&content, path))
}

/// Pull the manifest out of a freshly downloaded artifact. Tries a direct
/// read first, then unpacks archives into a scratch directory and accepts
/// the manifest only when the archive has exactly one top-level entry.
pub fn extract_descriptor(file: &Path) -> Result<Option<PluginManifest>> {
    if let Some(manifest) = read_manifest(file)? {
        return Ok(Some(manifest));
    }

    if !archive::is_archive(file) {
        return Ok(None);
    }

    let scratch = tempfile::tempdir()?;
    archive::extract_archive(file, scratch.path())?;

    let mut entries: Vec<_> = fs::read_dir(scratch.path())?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if entries.len() != 1 {
        log::debug!(
            "archive {} has {} top-level entries, skipping descriptor probe",
            file.display(),
            entries.len()
        );
        return Ok(None);
    }

    let entry = entries.remove(0);
    read_manifest(&entry.path())
}

fn parse_lenient(content: &str, origin: &Path) -> Option<PluginManifest> {
    match PluginManifest::parse(content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            log::warn!("ignoring malformed manifest at {}: {}", origin.display(), e);
            None
        }
    }
}
