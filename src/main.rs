//! Handshake Bench Entry Point
//!
//! Opens the configured number of WebSocket connections in sequence and
//! reports cost, per-connection mean and throughput.

use ws_handshake_bench::{Config, LoadDriver};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Starting handshake bench");

    // Load configuration
    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    config.log_config();

    let mut driver = match LoadDriver::new(&config) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match driver.run().await {
        Ok(summary) => summary.log_summary(),
        Err(e) => {
            log::error!("Failed to write report: {}", e);
            std::process::exit(1);
        }
    }
}
