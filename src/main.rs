use anyhow::Result;
use clap::{Parser, Subcommand};

// Use the library modules
use updraft::{commands, core};

#[derive(Parser)]
#[clap(name = "updraft")]
#[clap(about = "Plugin update and install manager")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install the newest version of a plugin
    Update {
        /// Plugin id to update (e.g., sample.tool)
        id: String,
        /// Download from this URL instead of the configured repository
        #[clap(long)]
        url: Option<String>,
        /// Version announced by the repository; skips the download when it
        /// is not newer than the installed one
        #[clap(long)]
        version_hint: Option<String>,
        /// Refuse plain-http transport for this download
        #[clap(long)]
        require_https: bool,
        /// Fetch and inspect the artifact but do not install it
        #[clap(long)]
        stage_only: bool,
    },
    /// List installed plugins
    List,
    /// Remove an installed plugin
    Remove {
        /// Plugin id to remove
        id: String,
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },
    /// Show or run deferred startup actions
    Actions {
        /// Execute the pending actions now instead of listing them
        #[clap(long)]
        run: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Deferred deletes from earlier sessions run before anything touches
    // the plugins directory. The actions command manages the journal
    // itself and is exempt.
    if !matches!(cli.command, Commands::Actions { .. }) {
        if let Err(e) = replay_startup_actions() {
            eprintln!("Warning: startup actions failed: {e}");
        }
    }

    let result = match cli.command {
        Commands::Update {
            id,
            url,
            version_hint,
            require_https,
            stage_only,
        } => commands::update::update_plugin(
            &id,
            url.as_deref(),
            version_hint.as_deref(),
            require_https,
            stage_only,
        )
        .map_err(|e| anyhow::anyhow!(e)),
        Commands::List => commands::list::list_plugins().map_err(|e| anyhow::anyhow!(e)),
        Commands::Remove { id, yes } => {
            commands::remove::remove_plugin(&id, yes).map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Actions { run } => {
            commands::actions::show_actions(run).map_err(|e| anyhow::anyhow!(e))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

fn replay_startup_actions() -> updraft::error::Result<()> {
    let config = core::config::Config::load()?;
    core::actions::run_startup_actions(&config.actions_path())
}
