use crate::core::actions::ActionJournal;
use crate::core::config::Config;
use crate::core::download::{CancelToken, Downloader};
use crate::core::plan::{PlanStatus, UpdateContext, UpdatePlan};
use crate::core::repository;
use crate::error::{Result, UpdraftError};
use crate::plugin::installer::DirInstaller;
use crate::plugin::registry::DirRegistry;
use std::sync::Arc;

pub fn update_plugin(
    id: &str,
    url: Option<&str>,
    version_hint: Option<&str>,
    require_https: bool,
    stage_only: bool,
) -> Result<()> {
    let config = Config::load()?;
    let url = resolve_url(&config, id, url)?;
    let ctx = build_context(&config)?;

    let mut plan =
        UpdatePlan::new(id, &url).with_force_secure(require_https || config.force_https);
    if let Some(hint) = version_hint {
        plan = plan.with_version_hint(hint);
    }

    println!("Checking {id} for updates...");

    let cancel = CancelToken::new();
    let status = match plan.prepare(&ctx, &cancel) {
        Ok(status) => status,
        Err(e) if e.is_fetch_failure() => {
            return Err(UpdraftError::InstallFailed {
                message: format!("plugin '{}' was not installed: {e}", plan.display_name()),
            });
        }
        Err(e) => return Err(e),
    };

    if let PlanStatus::Rejected(rejection) = status {
        println!("Nothing to do: {rejection}");
        return Ok(());
    }

    // prepare concluded with a staged artifact
    let staged = match plan.into_staged() {
        Some(staged) => staged,
        None => return Ok(()),
    };

    if stage_only {
        let name = staged.display_name().to_string();
        let file = staged.into_file();
        println!("📦 Staged {} at {}", name, file.display());
        println!("Run again without --stage-only to install it.");
        return Ok(());
    }

    let name = staged.display_name().to_string();
    let replaced = staged.replaces().is_some();
    let installed = staged.commit(&ctx)?;

    println!("✅ Installed {} at {}", name, installed.display());
    if replaced {
        println!("The superseded version will be removed at the next start.");
    }

    Ok(())
}

/// An explicit URL wins; otherwise the configured repository serves the
/// artifact through its download endpoint
fn resolve_url(config: &Config, id: &str, explicit: Option<&str>) -> Result<String> {
    if let Some(url) = explicit {
        return repository::resolve_source_url(url, config.repository_url.as_deref());
    }

    match config.repository_url.as_deref() {
        Some(base) => repository::download_url(
            base,
            id,
            config.host_build.as_deref(),
            &config.installation_id,
        ),
        None => Err(UpdraftError::NoUpdateSource { id: id.to_string() }),
    }
}

fn build_context(config: &Config) -> Result<UpdateContext> {
    let registry = DirRegistry::open(&config.plugins_dir(), &config.broken_list_path())?;

    Ok(UpdateContext {
        registry: Arc::new(registry),
        installer: Arc::new(DirInstaller::new(&config.plugins_dir())),
        actions: Arc::new(ActionJournal::new(&config.actions_path())),
        downloader: Downloader::new(),
        download_dir: config.download_dir(),
        host_build: config.host_build.clone(),
        first_launch: std::env::var_os("UPDRAFT_FIRST_LAUNCH").is_some(),
    })
}
