//! Probes the NodeManager sockets of one base station and prints what each
//! daemon reports.
//!
//! ```text
//! node-probe [HOST]
//! ```
//!
//! `HOST` defaults to 127.0.0.1. Set `RUST_LOG=nodemanager=trace` to see
//! every request and reply.

use nodemanager::prelude::*;

/// Rewrites a default `ws://127.0.0.1:PORT` address to point at `host`.
fn address_for(service: Service, host: &str) -> String {
    service.default_address().replacen("127.0.0.1", host, 1)
}

fn config_for(service: Service, host: Option<&str>) -> ClientConfig {
    let config = ClientConfig::for_service(service);
    match host {
        Some(host) => config.with_address(address_for(service, host)),
        None => config,
    }
}

async fn probe_radio(config: &ClientConfig) -> Result<(), ClientError> {
    let radio = RadioController::connect(config).await?;
    println!("{}: {}", Service::RadioController, radio.get_version().await?);

    let report = radio.monitor().await?;
    let report = report.data.unwrap_or(serde_json::Value::Null);
    println!("  monitor: {report}");

    radio.shutdown().await
}

async fn probe_queue(config: &ClientConfig) -> Result<(), ClientError> {
    let queue = MessageQueue::connect(config).await?;
    println!("{}: {}", Service::MessageQueue, queue.get_version().await?);
    queue.shutdown().await
}

async fn probe_directory(config: &ClientConfig) -> Result<(), ClientError> {
    let directory = SubscriberDirectory::connect(config).await?;
    println!("{}: {}", Service::SubscriberDirectory, directory.get_version().await?);

    let subscribers = directory.get_subscribers(None).await?;
    println!("  {} subscribers", subscribers.len());
    for subscriber in &subscribers {
        println!(
            "  {} {}:{} {:?}",
            subscriber.name,
            subscriber.ipaddr.as_deref().unwrap_or("-"),
            subscriber.port.as_deref().unwrap_or("-"),
            subscriber.numbers,
        );
    }

    directory.shutdown().await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let host = std::env::args().nth(1);
    let host = host.as_deref();

    let results = [
        (
            Service::RadioController,
            probe_radio(&config_for(Service::RadioController, host)).await,
        ),
        (
            Service::MessageQueue,
            probe_queue(&config_for(Service::MessageQueue, host)).await,
        ),
        (
            Service::SubscriberDirectory,
            probe_directory(&config_for(Service::SubscriberDirectory, host)).await,
        ),
    ];

    let mut failed = false;
    for (service, result) in results {
        if let Err(e) = result {
            tracing::error!(%service, error = %e, "probe failed");
            failed = true;
        }
    }
    if failed {
        std::process::exit(1);
    }
}
