use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::store::{Message, MessageStore};
use crate::transport::MessageListener;

/// Runs the ingest loop until `shutdown` fires: block on the listener, decode
/// each datagram as a JSON message, hand it to the store.
///
/// A datagram that fails to decode is logged and dropped; a failed append is
/// logged and the loop continues. Neither ever terminates the receiver. On
/// shutdown the socket is drained of already-queued datagrams before the loop
/// returns, so submissions accepted by the transport are not abandoned.
pub async fn run_receiver(
    listener: MessageListener,
    store: MessageStore,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                drain(&listener, &store).await;
                tracing::info!(target: "formrelay.receiver", "ingest receiver stopped");
                return;
            }
            received = listener.recv() => {
                match received {
                    Ok((payload, from)) => handle_datagram(&store, &payload, from).await,
                    Err(error) => {
                        tracing::warn!(
                            target: "formrelay.receiver",
                            error = %error,
                            "datagram receive failed",
                        );
                    }
                }
            }
        }
    }
}

async fn drain(listener: &MessageListener, store: &MessageStore) {
    loop {
        match listener.try_recv() {
            Ok(Some((payload, from))) => handle_datagram(store, &payload, from).await,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(
                    target: "formrelay.receiver",
                    error = %error,
                    "datagram receive failed during drain",
                );
                return;
            }
        }
    }
}

async fn handle_datagram(store: &MessageStore, payload: &[u8], from: SocketAddr) {
    let message: Message = match serde_json::from_slice(payload) {
        Ok(message) => message,
        Err(error) => {
            tracing::warn!(
                target: "formrelay.receiver",
                from = %from,
                bytes = payload.len(),
                error = %error,
                "dropping undecodable datagram",
            );
            return;
        }
    };

    match store.append(message).await {
        Ok(key) => {
            tracing::info!(
                target: "formrelay.receiver",
                from = %from,
                key = %key,
                "message stored",
            );
        }
        Err(error) => {
            tracing::error!(
                target: "formrelay.receiver",
                from = %from,
                error = %error,
                "failed to persist message",
            );
        }
    }
}
