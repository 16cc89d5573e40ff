use crate::core::config::Config;
use crate::error::Result;
use crate::plugin::registry::{DirRegistry, Registry};

pub fn list_plugins() -> Result<()> {
    let config = Config::load()?;
    let registry = DirRegistry::open(&config.plugins_dir(), &config.broken_list_path())?;

    let plugins = registry.plugins()?;

    if plugins.is_empty() {
        println!("No plugins installed.");
        println!();
        println!("To install one, run:");
        println!("  updraft update <id> --url <archive-url>");
        return Ok(());
    }

    println!("Installed plugins:");
    println!();

    for plugin in &plugins {
        let status = if registry.is_known_broken(&plugin.manifest) {
            "❌ (known broken)"
        } else {
            ""
        };

        println!(
            "  {} {} {}",
            plugin.manifest.plugin.id, plugin.manifest.plugin.version, status
        );

        if let Some(description) = &plugin.manifest.plugin.description {
            println!("    {description}");
        }

        let compatibility = &plugin.manifest.compatibility;
        if compatibility.since_build.is_some() || compatibility.until_build.is_some() {
            println!(
                "    builds {} to {}",
                compatibility.since_build.as_deref().unwrap_or("any"),
                compatibility.until_build.as_deref().unwrap_or("any")
            );
        }
    }

    Ok(())
}
