use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zencache::config::ServerConfig;
use zencache::server::Server;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "zencached", about = "ZenCache server", version)]
struct Args {
  /// Port to listen on
  #[arg(long, default_value_t = 6379)]
  port: u16,
  /// Maximum number of items in the cache before LRU eviction
  #[arg(long, default_value_t = 10_000)]
  capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = ServerConfig {
    port: args.port,
    capacity: args.capacity,
    ..ServerConfig::default()
  };

  tracing::info!(
    "ZenCache v{} starting: port={}, capacity={} items",
    env!("CARGO_PKG_VERSION"),
    config.port,
    config.capacity
  );
  tracing::info!(
    "Commands: SET, GET, DEL, PING, SUBSCRIBE, UNSUBSCRIBE, PUBLISH, SAVE, REPLICAOF, INFO, QUIT"
  );

  let server = Arc::new(Server::new(config));

  tokio::select! {
    result = server.clone().run() => result,
    _ = shutdown_signal() => {
      server.replication().close();
      tracing::info!("Shutdown complete");
      Ok(())
    }
  }
}

async fn shutdown_signal() {
  let ctrl_c = async {
    tokio::signal::ctrl_c()
      .await
      .expect("Failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
      .expect("Failed to install SIGTERM handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("Received SIGINT"),
    _ = terminate => tracing::info!("Received SIGTERM"),
  }
}
