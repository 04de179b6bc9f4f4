use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use formrelay_ingest_service::config::Config;
use formrelay_ingest_service::receiver::run_receiver;
use formrelay_ingest_service::store::MessageStore;
use formrelay_ingest_service::transport::{MessageListener, MessageSender};
use formrelay_ingest_service::{SERVICE_NAME, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .init();

    let store = MessageStore::open(&config.store_path);
    store.bootstrap().await?;

    let listener = MessageListener::bind(config.ingest_addr).await?;
    let sender = MessageSender::connect(config.ingest_addr, config.max_datagram_bytes).await?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let receiver_task = tokio::spawn(run_receiver(listener, store, shutdown_rx));

    let http_listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        service = SERVICE_NAME,
        bind_addr = %config.bind_addr,
        ingest_addr = %config.ingest_addr,
        store_path = %config.store_path.display(),
        "listening",
    );
    axum::serve(http_listener, build_router(config, sender))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // HTTP is down; let the receiver drain whatever the link already accepted.
    let _ = shutdown_tx.send(());
    receiver_task.await?;
    info!("shutdown complete");
    Ok(())
}
