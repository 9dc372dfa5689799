use std::net::SocketAddr;
use std::path::PathBuf;

use actibourse_server::{Api, Session};
use actibourse_types::config::Config;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Optional YAML configuration; defaults cover the standard activity.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level: tracing::Level = args.log_level.parse().context("invalid log level")?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            serde_yaml::from_str(&raw).context("could not parse config file")?
        }
        None => Config::default(),
    };
    info!(
        teams = config.teams.len(),
        stocks = config.stocks.len(),
        "session configured"
    );

    let session = Session::new(config);
    let api = Api::new(session);
    let app = api.router();

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
