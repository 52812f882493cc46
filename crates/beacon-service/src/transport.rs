//! Outbound reply transport.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Narrow seam over the asynchronous send facility.
///
/// The dispatch core posts at most one datagram per inbound query through
/// this interface. Failures are logged by the dispatcher and never reach
/// handlers; multicast advertisement is fire-and-forget.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    /// Sends one complete reply datagram.
    async fn send(&self, datagram: Bytes) -> io::Result<()>;
}

/// Sends replies to the mDNS multicast group over the shared socket.
///
/// Replies deliberately go to the group, not to the unicast source of the
/// query; the per-question unicast-response bit is not honored.
pub struct MulticastTransport {
    socket: Arc<UdpSocket>,
    destination: SocketAddr,
}

impl MulticastTransport {
    /// Creates a transport sending to the given group address and port.
    pub fn new(socket: Arc<UdpSocket>, destination: SocketAddr) -> Self {
        Self {
            socket,
            destination,
        }
    }

    /// Returns the destination address replies are sent to.
    #[inline]
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

#[async_trait]
impl ReplyTransport for MulticastTransport {
    async fn send(&self, datagram: Bytes) -> io::Result<()> {
        self.socket.send_to(&datagram, self.destination).await?;
        Ok(())
    }
}
