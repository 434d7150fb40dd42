mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sabiana_core::Coordinator;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // A broken config file is reported by `run`, not here
    let cfg = config::load_config().map_err(CliError::from);

    // Setup tracing based on verbosity; a profile with `debug = true`
    // raises it to debug
    let profile_debug = cfg.as_ref().ok().is_some_and(|c| {
        c.profiles
            .get(&config::active_profile_name(&cli.global, c))
            .is_some_and(|p| p.debug)
    });
    let verbosity = if profile_debug {
        cli.global.verbose.max(2)
    } else {
        cli.global.verbose
    };
    init_tracing(verbosity, cli.global.quiet);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli, cfg).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, cfg: Result<Config, CliError>) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the cloud
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, cfg),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "sabiana", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to Sabiana Cloud
        cmd => {
            let cfg = cfg?;
            let interval = match &cmd {
                Command::Watch(args) => args.interval,
                _ => None,
            };
            let session = config::resolve_session(&cli.global, &cfg, interval)?;
            let coordinator = Coordinator::new(session.coordinator.clone())?;
            let timeout_secs = session.coordinator.timeout.as_secs();
            let profile = session.profile_name.clone();

            tracing::debug!(command = ?cmd, profile = %profile, "dispatching command");
            commands::dispatch(cmd, &coordinator, &session, &cli.global)
                .await
                .map_err(|e| e.for_profile(&profile).with_timeout(timeout_secs))
        }
    }
}
