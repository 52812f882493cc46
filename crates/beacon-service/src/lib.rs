//! # Beacon mDNS Service
//!
//! The service core: joins the mDNS multicast group on a chosen
//! interface, receives datagrams from peers, parses each as a DNS
//! message, fans questions and answers across an ordered handler chain,
//! and emits a single consolidated multicast reply when handlers produce
//! answers.
//!
//! ## Architecture
//!
//! ```text
//! socket -> Dispatcher -> codec decode -> handler chain -> AnswerList
//!                                                        -> codec encode -> socket
//! ```
//!
//! Dispatch is single-threaded and cooperative: the receive path decodes
//! and classifies, then defers reply emission by one task so the receive
//! loop is never blocked by handlers. The dispatch core is stateless
//! between datagrams apart from the handler list, and no failure in one
//! datagram affects the next.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

pub mod dispatch;
pub mod handler;
pub mod service;
pub mod transport;

pub use dispatch::Dispatcher;
pub use handler::{HandlerOutcome, MdnsHandler};
pub use service::{MdnsService, ServiceConfig};
pub use transport::{MulticastTransport, ReplyTransport};

/// IPv4 mDNS multicast group.
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// IPv6 mDNS multicast group. Recognized in configuration; the service
/// replies on IPv4 only.
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xFF02, 0, 0, 0, 0, 0, 0, 0xFB);

/// IP TTL for outbound multicast replies (mDNS convention).
pub const MDNS_HOP_LIMIT: u32 = 255;

/// Service error types.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Socket creation, bind, or multicast join failed.
    #[error("failed to create mdns socket: {0}")]
    Socket(#[source] std::io::Error),

    /// The configured interface has no usable IPv4 address.
    #[error("interface {0} has no ipv4 address")]
    NoInterfaceAddress(String),

    /// `run` was called before a successful `init`.
    #[error("service not initialized")]
    NotInitialized,
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// View of the network interface the service is bound to.
///
/// Handlers share a reference to this to learn the address they should
/// advertise; the service owns it for its runtime duration.
#[derive(Debug, Clone)]
pub struct NetworkAdapter {
    name: String,
    ipv4: Option<Ipv4Addr>,
}

impl NetworkAdapter {
    /// Creates an adapter view for the named interface.
    pub fn new(name: impl Into<String>, ipv4: Option<Ipv4Addr>) -> Self {
        Self {
            name: name.into(),
            ipv4,
        }
    }

    /// The interface name (e.g. `eth0`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The interface's IPv4 address, if it has one.
    #[inline]
    pub fn interface_ip4(&self) -> Option<Ipv4Addr> {
        self.ipv4
    }
}
