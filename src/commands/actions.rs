use crate::core::actions::{run_startup_actions, ActionJournal};
use crate::core::config::Config;
use crate::error::Result;

pub fn show_actions(run: bool) -> Result<()> {
    let config = Config::load()?;
    let path = config.actions_path();

    if run {
        run_startup_actions(&path)?;
        println!("✅ Pending startup actions executed.");
        return Ok(());
    }

    let journal = ActionJournal::new(&path);
    let pending = journal.pending()?;

    if pending.is_empty() {
        println!("No pending startup actions.");
        return Ok(());
    }

    println!("Actions that will run at the next start:");
    println!();

    for entry in &pending {
        println!(
            "  {} (recorded {})",
            entry.command,
            entry.recorded_at.format("%Y-%m-%d %H:%M UTC")
        );
    }

    Ok(())
}
