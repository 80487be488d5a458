mod auth_commands;
mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    meetbridge_config::MeetbridgeConfig,
    meetbridge_health::HealthState,
    meetbridge_server::Runtime,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "meetbridge", version, about = "Calendar and video meeting tools for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, global = true, env = "MEETBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tools over stdio (default when no subcommand is provided).
    Serve,
    /// Run the browser authorization flow now and store the token.
    Auth,
    /// Revoke the stored credential and delete the token file.
    Revoke,
    /// Run one health check and print the report as JSON.
    Health,
    /// Validate the configuration and the credential environment.
    CheckConfig,
}

/// Logs go to stderr; stdout carries the tool protocol.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<MeetbridgeConfig> {
    match &cli.config {
        Some(path) => {
            let mut config = meetbridge_config::load_config(path)?;
            meetbridge_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(meetbridge_config::discover_and_load()),
    }
}

fn build_runtime(config: MeetbridgeConfig) -> anyhow::Result<Runtime> {
    let report = meetbridge_config::validate(&config);
    if report.has_errors() {
        for d in &report.diagnostics {
            tracing::error!(path = %d.path, "{}", d.message);
        }
        anyhow::bail!("invalid configuration; run `meetbridge check-config` for details");
    }
    let source = meetbridge_config::resolve_credential_source()?;
    Runtime::build(config, source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "meetbridge starting");
    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Serve) => build_runtime(config)?.serve().await,
        Some(Commands::Auth) => auth_commands::authorize(&config).await,
        Some(Commands::Revoke) => auth_commands::revoke(&config).await,
        Some(Commands::Health) => {
            let runtime = build_runtime(config)?;
            let report = runtime.health.check().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.status == HealthState::Unhealthy {
                std::process::exit(1);
            }
            Ok(())
        },
        Some(Commands::CheckConfig) => config_commands::check(&config),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{ffi::OsStr, io::Write},
    };

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["meetbridge"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");

        let cli = Cli::try_parse_from(["meetbridge", "check-config", "--json-logs"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert!(cli.json_logs);
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nenable_preview = true\n\n[server]\nport = 9999").unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("meetbridge"),
            OsStr::new("--config"),
            file.path().as_os_str(),
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert!(config.api.enable_preview);
        assert_eq!(config.server.port, 9999);
    }
}
