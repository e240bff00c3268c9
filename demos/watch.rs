//! Live watch over the configured UDP endpoint.
//!
//! Binds the default endpoint (`127.0.0.1:61393`, override via config.toml),
//! pumps status messages in the background, and prints a one-line summary per
//! poll window. Feed it from another terminal with e.g.:
//!
//! ```sh
//! echo '{"sender_node_id": 7, "spl": 61.2}' | nc -u -w1 127.0.0.1 61393
//! ```
//!
//! Run with: `cargo run --example watch`

use nodeline::sink::poll_summary;
use nodeline::{BackgroundPump, Config, Normalizer, UdpTransport};

#[tokio::main]
async fn main() -> nodeline::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(_) => Config::default(),
    };

    let reader = config.open_udp_reader().await?;
    let mut pump = BackgroundPump::with_config(reader, config.pump.to_pump_config());
    pump.open();

    let result = watch_loop(&pump, &config).await;

    // Close on every exit path so the producer never outlives the loop.
    pump.close().await?;
    result
}

async fn watch_loop(pump: &BackgroundPump<UdpTransport>, config: &Config) -> nodeline::Result<()> {
    let normalizer = Normalizer::standard();
    let interval = config.pump.poll_interval();
    let batch = config.pump.batch_count;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n--- done ---");
                return Ok(());
            }
            // Gather up to one poll window; a full batch reports early.
            _ = async { let _ = pump.wait(Some(interval), batch).await; } => {
                let records = normalizer.normalize_batch(pump.drain());
                println!("{}", poll_summary(&records));
            }
        }
    }
}
