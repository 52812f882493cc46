//! # Beacon mDNS Handlers
//!
//! Example domain handlers for the beacon mDNS service: a RAVENNA
//! service advertiser and an NMOS node handler that both answers browse
//! queries and watches replies for a registration service to contact.
//!
//! These are consumers of the core handler contract, not part of it; the
//! dispatch core only knows [`beacon_service::MdnsHandler`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod nmos;
pub mod ravenna;

pub use nmos::{NmosNodeHandler, NmosRegistry};
pub use ravenna::{RavennaHttpHandler, RavennaRtspHandler};

/// Constant identity strings read by the example handlers.
///
/// Supplied by the enclosing application's configuration.
#[derive(Debug, Clone)]
pub struct VendorInfo {
    /// Stable vendor node identifier, used as the instance label of
    /// advertised services.
    pub node_id: String,

    /// User-facing node name, used as the host label of the advertised
    /// hostname.
    pub node_name: String,
}
