//! Headless API server entrypoint.

use textflag_core::config::env_flag_enabled;
use textflag_core::constants::{DEFAULT_MAX_IMPORT_ROWS, DEFAULT_PORT};
use textflag_server::{serve_router, AppState, Config, Database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    version: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            "--version" | "-V" => flags.version = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textflag=info,textflag_server=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;
    if cli_flags.help {
        print_help();
        return Ok(());
    }
    if cli_flags.version {
        println!("textflag {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_env();
    let database = Database::new(&config.db_path)?;
    let state = AppState::new(config.clone(), database);

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = textflag_server::resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!(db_path = %config.db_path, "textflag running at http://{}", actual_addr);

    serve_router(listener, state, allow_public, shutdown_signal()).await?;
    Ok(())
}

fn print_help() {
    println!("textflag server\n");
    println!("Usage: textflag [OPTIONS]\n");
    println!("Options:");
    println!("  -h, --help        Show this help message");
    println!("  -V, --version     Show the version");
    println!("\nEnvironment variables:");
    println!("  DB_PATH           Database directory (default: ~/.cache/textflag/db)");
    println!("  PORT              Server port (default: {})", DEFAULT_PORT);
    println!("  MAX_DOCUMENT_SIZE Maximum document/request size in bytes (default: 10MB)");
    println!(
        "  MAX_IMPORT_ROWS   Maximum rows per CSV import (default: {})",
        DEFAULT_MAX_IMPORT_ROWS
    );
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin and non-loopback binds");
    println!(
        "  BIND              Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::{parse_cli_flags, CliFlags};

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("textflag")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parse_cli_flags_rejects_unknown_and_positional_arguments() {
        let cases = [
            (args(&["--halp"]), "Unknown option"),
            (args(&["serve"]), "Unexpected positional argument"),
        ];
        for (argv, expected_fragment) in cases {
            let err = parse_cli_flags(&argv).expect_err("invalid args should be rejected");
            assert!(err.to_string().contains(expected_fragment));
        }
    }

    #[test]
    fn parse_cli_flags_accepts_supported_options() {
        assert_eq!(parse_cli_flags(&args(&[])).expect("no args"), CliFlags::default());
        assert_eq!(
            parse_cli_flags(&args(&["-h", "--version"])).expect("flags"),
            CliFlags {
                help: true,
                version: true
            }
        );
    }
}
