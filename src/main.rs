use clap::Parser;
use duet::config::Config;
use duet::signaling::SignalingServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let bind_addr = config.bind_addr();

    println!("   Duet Signaling Server");
    println!("   Binding to ws://{}", bind_addr);
    println!("   Press Ctrl+C to stop\n");

    let server = SignalingServer::new(config.server_config());

    tokio::select! {
        result = server.run(&bind_addr) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
