use crate::core::actions::ActionLog;
use crate::core::compatibility::is_build_compatible;
use crate::core::download::{CancelToken, Downloader};
use crate::core::version::compare_skip_broken;
use crate::error::Result;
use crate::plugin::installer::Installer;
use crate::plugin::manifest::{self, PluginManifest};
use crate::plugin::registry::Registry;
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Collaborators an update plan works against. Handles are passed in
/// explicitly so plans can be exercised against fakes.
pub struct UpdateContext {
    pub registry: Arc<dyn Registry>,
    pub installer: Arc<dyn Installer>,
    pub actions: Arc<dyn ActionLog>,
    pub downloader: Downloader,
    pub download_dir: PathBuf,
    pub host_build: Option<String>,
    pub first_launch: bool,
}

/// Why a plan concluded there is nothing to install. Rejections are
/// ordinary outcomes, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The candidate version is not newer than what is installed
    AlreadyCurrent { installed: String },
    /// Another plan already updated this plugin during the session
    AlreadyUpdated,
    /// The descriptor declares a build range excluding the running host
    Incompatible {
        since: Option<String>,
        until: Option<String>,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::AlreadyCurrent { installed } => {
                write!(f, "installed version {} is already current", installed)
            }
            Rejection::AlreadyUpdated => {
                write!(f, "already updated during this session")
            }
            Rejection::Incompatible { since, until } => write!(
                f,
                "incompatible with the running build (since {}, until {})",
                since.as_deref().unwrap_or("any"),
                until.as_deref().unwrap_or("any")
            ),
        }
    }
}

/// Outcome of a `prepare` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStatus {
    /// An artifact is staged under this path, ready to commit
    Staged(PathBuf),
    /// Nothing to install
    Rejected(Rejection),
}

/// Downloaded file with scoped cleanup: unless ownership is taken over,
/// the file is removed when the value drops.
#[derive(Debug)]
struct DownloadedArtifact {
    path: PathBuf,
    keep: bool,
}

impl DownloadedArtifact {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn into_path(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for DownloadedArtifact {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_file(&self.path);
        }
    }
}

enum PlanState {
    Fresh,
    Staged(StagedUpdate),
    Rejected(Rejection),
}

/// A single plugin update, driven from a URL through fetch and inspection
/// to a staged artifact. A plan concludes exactly once; committing the
/// result happens on the `StagedUpdate` taken out of it.
pub struct UpdatePlan {
    id: String,
    url: String,
    display_name: String,
    version_hint: Option<String>,
    build_override: Option<String>,
    force_secure: bool,
    state: PlanState,
}

impl UpdatePlan {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            display_name: id.to_string(),
            version_hint: None,
            build_override: None,
            force_secure: false,
            state: PlanState::Fresh,
        }
    }

    /// Plan an update announced by a repository descriptor; its version
    /// becomes the hint that lets `prepare` skip a pointless download
    pub fn from_descriptor(descriptor: &PluginManifest, url: &str) -> Self {
        let mut plan = Self::new(&descriptor.plugin.id, url);
        plan.display_name = descriptor.display_name().to_string();
        plan.version_hint = Some(descriptor.plugin.version.clone());
        plan
    }

    pub fn with_version_hint(mut self, version: &str) -> Self {
        self.version_hint = Some(version.to_string());
        self
    }

    /// Check compatibility against this build instead of the one the
    /// context reports, e.g. when preparing plugins for another install
    pub fn with_host_build(mut self, build: &str) -> Self {
        self.build_override = Some(build.to_string());
        self
    }

    pub fn with_force_secure(mut self, force_secure: bool) -> Self {
        self.force_secure = force_secure;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Drive the plan to a conclusion. Calling again after a conclusion
    /// returns the same outcome without touching the network; an error
    /// leaves the plan fresh so the caller may start over.
    pub fn prepare(&mut self, ctx: &UpdateContext, cancel: &CancelToken) -> Result<PlanStatus> {
        match &self.state {
            PlanState::Staged(staged) => {
                return Ok(PlanStatus::Staged(staged.artifact.path().to_path_buf()))
            }
            PlanState::Rejected(rejection) => {
                return Ok(PlanStatus::Rejected(rejection.clone()))
            }
            PlanState::Fresh => {}
        }

        // Snapshot what this update would replace. On a first launch the
        // previous installation is ignored wholesale.
        let installed = if ctx.first_launch {
            None
        } else {
            ctx.registry.installed(&self.id)
        };

        // A conclusive version hint lets us skip the download entirely
        if let (Some(current), Some(hint)) = (installed.as_ref(), self.version_hint.as_deref()) {
            let broken = ctx.registry.is_known_broken(&current.manifest);
            if compare_skip_broken(hint, &current.manifest.plugin.version, broken)
                != Ordering::Greater
            {
                return Ok(self.reject(Rejection::AlreadyCurrent {
                    installed: current.manifest.plugin.version.clone(),
                }));
            }
        }

        let file = ctx.downloader.download_file(
            &self.url,
            &ctx.download_dir,
            self.force_secure,
            cancel,
        )?;
        let artifact = DownloadedArtifact::new(file);

        let descriptor = manifest::extract_descriptor(artifact.path())?;
        if let Some(descriptor) = &descriptor {
            if ctx.registry.was_updated(&descriptor.plugin.id) {
                return Ok(self.reject(Rejection::AlreadyUpdated));
            }

            if let Some(current) = installed.as_ref() {
                let broken = ctx.registry.is_known_broken(&current.manifest);
                if compare_skip_broken(
                    &descriptor.plugin.version,
                    &current.manifest.plugin.version,
                    broken,
                ) != Ordering::Greater
                {
                    return Ok(self.reject(Rejection::AlreadyCurrent {
                        installed: current.manifest.plugin.version.clone(),
                    }));
                }
            }

            let build = self.build_override.as_deref().or(ctx.host_build.as_deref());
            if let Some(build) = build {
                let since = descriptor.compatibility.since_build.as_deref();
                let until = descriptor.compatibility.until_build.as_deref();
                if !is_build_compatible(build, since, until) {
                    return Ok(self.reject(Rejection::Incompatible {
                        since: descriptor.compatibility.since_build.clone(),
                        until: descriptor.compatibility.until_build.clone(),
                    }));
                }
            }

            self.display_name = descriptor.display_name().to_string();
        } else {
            // Artifacts without a readable descriptor are accepted as-is,
            // skipping version and compatibility refinement
            log::warn!(
                "no descriptor found in {}, accepting artifact as-is",
                artifact.path().display()
            );
        }

        let staged = StagedUpdate {
            id: descriptor
                .as_ref()
                .map(|d| d.plugin.id.clone())
                .unwrap_or_else(|| self.id.clone()),
            display_name: self.display_name.clone(),
            artifact,
            descriptor,
            replaces: installed.map(|current| current.path),
        };
        let status = PlanStatus::Staged(staged.artifact.path().to_path_buf());
        self.state = PlanState::Staged(staged);
        Ok(status)
    }

    /// Take the staged update out of a concluded plan
    pub fn into_staged(self) -> Option<StagedUpdate> {
        match self.state {
            PlanState::Staged(staged) => Some(staged),
            _ => None,
        }
    }

    fn reject(&mut self, rejection: Rejection) -> PlanStatus {
        log::info!("skipping {}: {}", self.display_name, rejection);
        self.state = PlanState::Rejected(rejection.clone());
        PlanStatus::Rejected(rejection)
    }
}

/// A fetched artifact ready to install. Dropping it without committing
/// removes the staged file again.
pub struct StagedUpdate {
    id: String,
    display_name: String,
    artifact: DownloadedArtifact,
    descriptor: Option<PluginManifest>,
    replaces: Option<PathBuf>,
}

impl StagedUpdate {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn file(&self) -> &Path {
        self.artifact.path()
    }

    pub fn descriptor(&self) -> Option<&PluginManifest> {
        self.descriptor.as_ref()
    }

    pub fn replaces(&self) -> Option<&Path> {
        self.replaces.as_deref()
    }

    /// Install the staged artifact. Superseded files are queued for
    /// deletion at the next startup, never removed while possibly still
    /// in use; the staged file itself is cleaned up once installed.
    pub fn commit(self, ctx: &UpdateContext) -> Result<PathBuf> {
        if let Some(old) = &self.replaces {
            ctx.actions.append_delete(old)?;
        }

        let installed = ctx
            .installer
            .install(self.artifact.path(), &self.display_name, true)?;
        ctx.registry.mark_updated(&self.id);

        log::info!("installed {} at {}", self.display_name, installed.display());
        Ok(installed)
    }

    /// Give up on committing but keep the staged file on disk, handing
    /// its path to the caller
    pub fn into_file(self) -> PathBuf {
        self.artifact.into_path()
    }
}
