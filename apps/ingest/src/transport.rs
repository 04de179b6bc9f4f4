use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::store::Message;

/// Largest payload a single UDP datagram can carry.
pub const MAX_RECV_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("encoded payload is {len} bytes, over the {max} byte datagram limit")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("failed to encode message payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("datagram send failed: {0}")]
    Send(#[source] io::Error),
}

/// Sending half of the ingest link: an ephemeral-port UDP socket connected to
/// the fixed loopback ingest endpoint.
///
/// Sends are best-effort. Nothing confirms delivery; a send only fails on
/// local resource exhaustion, an oversized payload, or connection-refused
/// feedback from an unbound endpoint.
pub struct MessageSender {
    socket: UdpSocket,
    max_payload_bytes: usize,
}

impl MessageSender {
    pub async fn connect(endpoint: SocketAddr, max_payload_bytes: usize) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(endpoint).await?;
        Ok(Self {
            socket,
            max_payload_bytes,
        })
    }

    pub async fn send(&self, message: &Message) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(message).map_err(TransportError::Encode)?;
        if payload.len() > self.max_payload_bytes {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload_bytes,
            });
        }
        self.socket
            .send(&payload)
            .await
            .map_err(TransportError::Send)?;
        tracing::trace!(
            target: "formrelay.transport",
            bytes = payload.len(),
            "datagram sent",
        );
        Ok(())
    }
}

/// Receiving half of the ingest link. Exactly one listener binds the ingest
/// endpoint; datagrams from any number of senders arrive unordered and
/// unacknowledged.
pub struct MessageListener {
    socket: UdpSocket,
}

impl MessageListener {
    pub async fn bind(endpoint: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(endpoint).await?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Waits for the next datagram and returns its payload and sender address.
    pub async fn recv(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_RECV_BYTES];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, from))
    }

    /// Pops an already-queued datagram without waiting, or `None` when the
    /// socket buffer is empty. Used to drain the link during shutdown.
    pub fn try_recv(&self) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buf = vec![0u8; MAX_RECV_BYTES];
        match self.socket.try_recv_from(&mut buf) {
            Ok((len, from)) => {
                buf.truncate(len);
                Ok(Some((buf, from)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}
