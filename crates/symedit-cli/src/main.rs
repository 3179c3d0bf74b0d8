mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("SymEdit CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let settings = config::load_settings(cli.config.as_deref(), &cli.set_values)?;
    debug!("Resolved engine settings: {:?}", &settings);

    let command_result = match cli.command {
        Commands::Groups => {
            info!("Dispatching to 'groups' command.");
            commands::groups::run_list()
        }
        Commands::Ops(args) => {
            info!("Dispatching to 'ops' command.");
            commands::groups::run_ops(args)
        }
        Commands::Site(args) => {
            info!("Dispatching to 'site' command.");
            commands::site::run_site(args, &settings.engine)
        }
        Commands::Orbit(args) => {
            info!("Dispatching to 'orbit' command.");
            commands::site::run_orbit(args, &settings.engine)
        }
        Commands::Pathway(args) => {
            info!("Dispatching to 'pathway' command.");
            let editor = settings.editor()?;
            commands::pathway::run(args, &editor)
        }
        Commands::Drag(args) => {
            info!("Dispatching to 'drag' command.");
            let mut editor = settings.editor()?;
            commands::drag::run(args, &mut editor)
        }
    };

    match &command_result {
        Ok(_) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
