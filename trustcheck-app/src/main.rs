use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use trustcheck_common::observability::{LogFormat, init_logging};
use trustcheck_config::{DEFAULT_CONFIG_FILE, TrustCheckConfig, TrustCheckConfigLoader};
mod wiring;

/// Content trust scoring service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file. Without this flag `trustcheck.yaml` is read
    /// when present.
    #[arg(long, env = "TRUSTCHECK_CONFIG")]
    config: Option<PathBuf>,
    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,
    /// Log encoding (`text` or `json`), overriding `logging.format`.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn load_config(args: &Args) -> Result<TrustCheckConfig> {
    let loader = match &args.config {
        Some(path) => TrustCheckConfigLoader::new().with_file(path),
        None => TrustCheckConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("failed to load configuration")?;

    // Flags win over file and environment.
    if let Some(bind) = &args.bind {
        cfg.server.bind = bind.clone();
    }
    if let Some(format) = args.log_format {
        cfg.logging.format = format;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = load_config(&args)?;

    let log_path = init_logging(cfg.logging.log_config("trustcheck"))?;
    tracing::info!(log_file = %log_path.display(), "trustcheck.start");

    let addr: SocketAddr = cfg
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind `{}`", cfg.server.bind))?;
    let analyzer = wiring::build_analyzer(&cfg)?;
    let app = trustcheck_server::router(analyzer, cfg.server.body_limit_bytes());

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("trustcheck.ctrl_c");
                    shutdown.cancel();
                }
                Err(e) => tracing::error!(error = %e, "trustcheck.signal_handler_failed"),
            }
        }
    });

    trustcheck_server::serve(addr, app, shutdown).await
}
