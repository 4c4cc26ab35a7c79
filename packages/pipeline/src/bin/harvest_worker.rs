use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use heritage_pipeline::config::WorkerConfig;
use heritage_pipeline::worker::run_harvest_worker;

const HEALTH_ADDR: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    tokio::spawn(serve_health());

    if let Err(e) = run_harvest_worker(config).await {
        tracing::error!(error = %e, "harvest worker exited with error");
        std::process::exit(1);
    }
}

/// Answer every connection with `200 OK` for liveness probes.
async fn serve_health() {
    let listener = match tokio::net::TcpListener::bind(HEALTH_ADDR).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = HEALTH_ADDR, "failed to bind health endpoint");
            return;
        }
    };
    tracing::info!(addr = HEALTH_ADDR, "health endpoint listening");

    loop {
        if let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nOK")
                .await;
        }
    }
}
