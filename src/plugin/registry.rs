use crate::core::version::compare_versions;
use crate::error::Result;
use crate::plugin::manifest::{self, PluginManifest};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A plugin found in the local installation
#[derive(Debug, Clone)]
pub struct InstalledPlugin {
    pub manifest: PluginManifest,
    pub path: PathBuf,
}

/// What the update machinery needs to know about the local installation
pub trait Registry: Send + Sync {
    /// Currently installed plugin with this id, if any
    fn installed(&self, id: &str) -> Option<InstalledPlugin>;

    /// True when this exact id/version pair is flagged as broken
    fn is_known_broken(&self, manifest: &PluginManifest) -> bool;

    /// True when this plugin was already updated during the current session
    fn was_updated(&self, id: &str) -> bool;

    /// Record a completed update so later plans skip the same plugin
    fn mark_updated(&self, id: &str);

    fn is_installed(&self, id: &str) -> bool {
        self.installed(id).is_some()
    }
}

/// Registry backed by a flat plugins directory. Each child is either a
/// plugin directory carrying a plugin.toml or a packaged zip; entries
/// without a readable manifest are ignored.
pub struct DirRegistry {
    plugins_dir: PathBuf,
    broken: HashMap<String, HashSet<String>>,
    session: Mutex<HashSet<String>>,
}

impl DirRegistry {
    pub fn open(plugins_dir: &Path, broken_list: &Path) -> Result<Self> {
        let broken = load_broken_list(broken_list)?;
        Ok(Self {
            plugins_dir: plugins_dir.to_path_buf(),
            broken,
            session: Mutex::new(HashSet::new()),
        })
    }

    /// Every plugin under the plugins directory, newest version per id,
    /// sorted by id for stable output
    pub fn plugins(&self) -> Result<Vec<InstalledPlugin>> {
        let mut best: HashMap<String, InstalledPlugin> = HashMap::new();

        if !self.plugins_dir.exists() {
            return Ok(Vec::new());
        }

        for entry in fs::read_dir(&self.plugins_dir)? {
            let path = entry?.path();
            let found = match manifest::read_manifest(&path) {
                Ok(Some(found)) => found,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let id = found.plugin.id.clone();
            let candidate = InstalledPlugin {
                manifest: found,
                path,
            };
            let newer = match best.get(&id) {
                Some(current) => {
                    compare_versions(
                        &candidate.manifest.plugin.version,
                        &current.manifest.plugin.version,
                    ) == Ordering::Greater
                }
                None => true,
            };
            if newer {
                best.insert(id, candidate);
            }
        }

        let mut plugins: Vec<_> = best.into_values().collect();
        plugins.sort_by(|a, b| a.manifest.plugin.id.cmp(&b.manifest.plugin.id));
        Ok(plugins)
    }
}

impl Registry for DirRegistry {
    fn installed(&self, id: &str) -> Option<InstalledPlugin> {
        match self.plugins() {
            Ok(plugins) => plugins.into_iter().find(|p| p.manifest.plugin.id == id),
            Err(e) => {
                log::warn!("failed to scan {}: {}", self.plugins_dir.display(), e);
                None
            }
        }
    }

    fn is_known_broken(&self, manifest: &PluginManifest) -> bool {
        self.broken
            .get(&manifest.plugin.id)
            .map(|versions| versions.contains(&manifest.plugin.version))
            .unwrap_or(false)
    }

    fn was_updated(&self, id: &str) -> bool {
        self.session
            .lock()
            .map(|session| session.contains(id))
            .unwrap_or(false)
    }

    fn mark_updated(&self, id: &str) {
        if let Ok(mut session) = self.session.lock() {
            session.insert(id.to_string());
        }
    }
}

/// Parse the broken-plugins list: one `<id> <version>` pair per line,
/// `#` starts a comment
fn load_broken_list(path: &Path) -> Result<HashMap<String, HashSet<String>>> {
    let mut broken: HashMap<String, HashSet<String>> = HashMap::new();

    if !path.exists() {
        return Ok(broken);
    }

    let content = fs::read_to_string(path)?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(id), Some(version)) => {
                broken
                    .entry(id.to_string())
                    .or_default()
                    .insert(version.to_string());
            }
            _ => log::warn!("skipping malformed broken-plugins line: '{}'", line),
        }
    }

    Ok(broken)
}
