//! mDNS service lifecycle.
//!
//! The service owns the multicast listen socket and the handler chain for
//! its runtime duration. `init` creates and joins; `run` is the
//! persistent receive loop; `finish` is a no-op for the core.

use crate::dispatch::Dispatcher;
use crate::handler::MdnsHandler;
use crate::transport::MulticastTransport;
use crate::{NetworkAdapter, Result, ServiceError, MDNS_GROUP_V4, MDNS_HOP_LIMIT};
use beacon_proto::MDNS_PORT;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{error, info};

/// Receive buffer size. mDNS datagrams are bounded by the interface MTU
/// and in practice stay well under this.
const RECV_BUFFER_SIZE: usize = 4096;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// UDP port to bind and reply to (5353 unless testing).
    pub port: u16,

    /// IPv4 multicast group to join.
    pub group: Ipv4Addr,

    /// Port advertised in outbound SRV records.
    pub srv_port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: MDNS_PORT,
            group: MDNS_GROUP_V4,
            srv_port: 80,
        }
    }
}

/// The mDNS service.
///
/// Owns the listen socket and the handler list. Handlers are registered
/// before [`MdnsService::init`] and never removed; they run in
/// registration order on every dispatch.
pub struct MdnsService {
    config: ServiceConfig,
    adapter: Arc<NetworkAdapter>,
    handlers: Vec<Arc<dyn MdnsHandler>>,
    socket: Option<Arc<UdpSocket>>,
}

impl MdnsService {
    /// Creates a service bound to the given interface view.
    pub fn new(config: ServiceConfig, adapter: Arc<NetworkAdapter>) -> Self {
        Self {
            config,
            adapter,
            handlers: Vec::new(),
            socket: None,
        }
    }

    /// Registers a handler at the end of the chain.
    pub fn add_handler(&mut self, handler: Arc<dyn MdnsHandler>) {
        self.handlers.push(handler);
    }

    /// The interface view this service advertises on.
    #[inline]
    pub fn adapter(&self) -> &Arc<NetworkAdapter> {
        &self.adapter
    }

    /// Creates the multicast socket and joins the group on the configured
    /// interface.
    ///
    /// On failure no receive is registered and the typed error is
    /// returned to the caller.
    pub fn init(&mut self) -> Result<()> {
        let interface_ip = self
            .adapter
            .interface_ip4()
            .ok_or_else(|| ServiceError::NoInterfaceAddress(self.adapter.name().to_string()))?;

        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(ServiceError::Socket)?;
        socket.set_reuse_address(true).map_err(ServiceError::Socket)?;
        #[cfg(unix)]
        socket.set_reuse_port(true).map_err(ServiceError::Socket)?;
        socket.set_nonblocking(true).map_err(ServiceError::Socket)?;

        socket
            .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port)).into())
            .map_err(ServiceError::Socket)?;
        socket
            .join_multicast_v4(&self.config.group, &interface_ip)
            .map_err(ServiceError::Socket)?;
        socket
            .set_multicast_ttl_v4(MDNS_HOP_LIMIT)
            .map_err(ServiceError::Socket)?;
        // Best-effort DSCP
        socket.set_tos(0).map_err(ServiceError::Socket)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(ServiceError::Socket)?;

        info!(
            port = self.config.port,
            group = %self.config.group,
            interface = self.adapter.name(),
            interface_ip = %interface_ip,
            "mdns listening"
        );

        self.socket = Some(Arc::new(socket));
        Ok(())
    }

    /// Persistent receive loop.
    ///
    /// Every datagram goes to the dispatcher and the receive is
    /// resubmitted; per-datagram failures are logged and never stop the
    /// loop.
    pub async fn run(&self) -> Result<()> {
        let socket = self.socket.clone().ok_or(ServiceError::NotInitialized)?;

        let destination =
            SocketAddr::V4(SocketAddrV4::new(self.config.group, self.config.port));
        let transport = Arc::new(MulticastTransport::new(socket.clone(), destination));
        let dispatcher = Dispatcher::new(self.handlers.clone(), transport, self.config.srv_port);

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, src)) => dispatcher.dispatch(&buf[..len], src),
                Err(e) => error!(error = %e, "error receiving mdns datagram"),
            }
        }
    }

    /// No-op for the core; the socket drops with the service.
    pub fn finish(&self) {}
}
