//! awstools - operational helpers for AWS
//!
//! This is the main entry point for the awstools CLI.

mod cli;

use awstools::config::Settings;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("awstools v{}", VERSION);
    }

    // Load settings
    let settings = Settings::load(cli.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("WARNING: Failed to load settings: {}", e);
        Settings::default()
    });

    // Create command context
    let mut ctx = CommandContext::new(&cli, settings);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::Resolve(args) => args.execute(&mut ctx).await,
        Commands::Env(args) => args.execute(&mut ctx).await,
        Commands::Inspect(args) => args.execute(&mut ctx).await,
        Commands::Whoami(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            1
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries resolved output
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
