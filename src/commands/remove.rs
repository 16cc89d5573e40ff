use crate::core::actions::{ActionJournal, ActionLog};
use crate::core::config::Config;
use crate::error::{Result, UpdraftError};
use crate::plugin::registry::{DirRegistry, Registry};
use std::io::{self, Write};

pub fn remove_plugin(id: &str, yes: bool) -> Result<()> {
    let config = Config::load()?;
    let registry = DirRegistry::open(&config.plugins_dir(), &config.broken_list_path())?;

    let installed = match registry.installed(id) {
        Some(installed) => installed,
        None => {
            return Err(UpdraftError::PluginNotInstalled {
                id: id.to_string(),
            })
        }
    };

    println!(
        "Removing {} {} from {}",
        installed.manifest.plugin.id,
        installed.manifest.plugin.version,
        installed.path.display()
    );

    if !yes {
        print!("Are you sure you want to remove {id}? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Remove cancelled.");
            return Ok(());
        }
    }

    // The host may still have these files open; deletion waits for the
    // next start like any superseded install.
    let journal = ActionJournal::new(&config.actions_path());
    journal.append_delete(&installed.path)?;

    println!("✅ {id} will be removed at the next start.");

    Ok(())
}
