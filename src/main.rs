//! volctl entry point.
//!
//! ```text
//! parse flags
//!     → prepare (config registration, load, level resolution)
//!     → install logging at the resolved level
//!     → install signal handlers
//!     → Lifecycle::run (known_hosts, diagnostics, dispatcher, teardown)
//!     → exit status
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use volctl::config::effective::keys;
use volctl::config::{Environment, FileConfigStore};
use volctl::lifecycle::{self, AppContext, ExitSignals, Lifecycle, Outcome};
use volctl::observability::{logging, LogFormat};

#[derive(Parser, Debug, Clone)]
#[command(name = "volctl")]
#[command(about = "Storage volume management CLI", version)]
struct Cli {
    /// Address of the storage service
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Storage service name
    #[arg(short, long, global = true)]
    service: Option<String>,

    /// Log level (error, warn, info, debug)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Override any configuration key
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    overrides: Vec<(String, String)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print the effective configuration with the source of each key
    Config,
    /// Print the environment handed to subprocesses
    Env,
    /// Print resolved filesystem locations
    Paths,
    /// Print version information
    Version,
}

impl Cli {
    /// Flag values as config overrides, applied above every other source.
    fn config_overrides(&self) -> Vec<(String, String)> {
        let named = [
            (keys::HOST, &self.host),
            (keys::SERVICE, &self.service),
            (keys::LOG_LEVEL, &self.log_level),
        ];
        named
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
            .chain(self.overrides.iter().cloned())
            .collect()
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Run one subcommand against the prepared context.
fn dispatch(command: Command, ctx: &AppContext) -> u8 {
    let rendered = match command {
        Command::Config => serde_json::to_string_pretty(&ctx.config),
        Command::Paths => serde_json::to_string_pretty(&ctx.paths),
        Command::Version => serde_json::to_string_pretty(&json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "run_id": ctx.run_id,
        })),
        Command::Env => {
            for (key, value) in ctx.child_env() {
                println!("{key}={value}");
            }
            return 0;
        }
    };

    match rendered {
        Ok(text) => {
            println!("{text}");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to render output");
            1
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = Environment::from_process();

    let overrides = cli.config_overrides();
    let ctx = match lifecycle::prepare(env, &mut FileConfigStore::new(), overrides) {
        Ok(ctx) => ctx,
        Err(e) => {
            // Logging is not installed yet.
            eprintln!("volctl: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log = match logging::init(ctx.verbosity(), LogFormat::from_env(&ctx.env)) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("volctl: {e}");
            return ExitCode::FAILURE;
        }
    };
    ctx.resolution.report();

    let signals = ExitSignals::install();
    let command = cli.command;
    let app = Lifecycle::new(ctx, log);

    match app.run(signals.recv(), move |ctx: &AppContext| dispatch(command, ctx)).await {
        Ok(Outcome::Completed(code)) => ExitCode::from(code),
        // The dispatcher thread may still be blocked; do not wait for it.
        Ok(outcome @ Outcome::Interrupted(_)) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::parse_from([
            "volctl",
            "-H",
            "tcp://10.0.0.1:7979",
            "--set",
            "storage.region=eu-1",
            "-l",
            "debug",
            "config",
        ]);

        let overrides = cli.config_overrides();
        assert!(overrides.contains(&(keys::HOST.to_string(), "tcp://10.0.0.1:7979".to_string())));
        assert!(overrides.contains(&(keys::LOG_LEVEL.to_string(), "debug".to_string())));
        assert!(overrides.contains(&("storage.region".to_string(), "eu-1".to_string())));
        assert!(!overrides.iter().any(|(k, _)| k == keys::SERVICE));
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("a.b=c=d"),
            Ok(("a.b".to_string(), "c=d".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
