use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use sketchsync_server::room::{AppState, RelayConfig};
use sketchsync_server::router;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 3030)]
    port: u16,
    /// Bounded retry count for outbound socket sends.
    #[arg(long, default_value_t = 3)]
    retry_limit: u32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchsync_server=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let state = Arc::new(AppState::new(RelayConfig {
        retry_limit: args.retry_limit,
    }));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("SketchSync relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:{}/ws", args.port);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
