mod aggregate;
mod cache;
mod catalog;
mod config;
mod radar;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cosmocache")]
#[command(about = "Aggregates public catalog APIs behind a small JSON service")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./cosmocache.yaml or $XDG_CONFIG_HOME/cosmocache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Port to listen on (overrides PORT and the config file)
  #[arg(short, long)]
  port: Option<u16>,

  /// Directory for cache files
  #[arg(short, long)]
  data_dir: Option<PathBuf>,
}

/// Install the global subscriber. The returned guards flush on drop.
fn init_tracing(config: &config::Config) -> Vec<WorkerGuard> {
  let mut guards = Vec::new();

  let (stdout, guard) = tracing_appender::non_blocking(std::io::stdout());
  guards.push(guard);

  let file_layer = config.log_dir.as_ref().map(|dir| {
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
      dir,
      "cosmocache.log",
    ));
    guards.push(guard);
    tracing_subscriber::fmt::layer()
      .with_ansi(false)
      .with_writer(writer)
  });

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer().with_writer(stdout))
    .with(file_layer)
    .init();

  guards
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override data directory if specified on command line
  let config = if let Some(data_dir) = args.data_dir {
    config::Config { data_dir, ..config }
  } else {
    config
  };

  let _guards = init_tracing(&config);

  let port = config.resolve_port(args.port);
  let state = server::AppState::from_config(&config).await?;
  server::serve(state, port).await
}
