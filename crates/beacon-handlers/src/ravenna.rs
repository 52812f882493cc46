//! RAVENNA service advertisement.
//!
//! From the RAVENNA discovery conventions, a node registers:
//!
//! ```text
//! <vendor node id>._http._tcp.
//! <vendor node id>._rtsp._tcp.
//! ```
//!
//! and, to enable browsing specifically for RAVENNA services, the
//! `_ravenna` sub types:
//!
//! ```text
//! <vendor node id>._ravenna._sub._http._tcp.
//! <vendor node id>._ravenna._sub._rtsp._tcp.
//! ```
//!
//! Controllers such as ANEMAN browse `_ravenna._sub._http._tcp.local`.

use crate::VendorInfo;
use beacon_proto::{AnswerList, Error, Name, Question, ReplyData};
use beacon_service::{HandlerOutcome, MdnsHandler, NetworkAdapter};
use std::sync::Arc;
use tracing::{info, warn};

const HTTP_BROWSE: [&str; 5] = ["_ravenna", "_sub", "_http", "_tcp", "local"];
const RTSP_BROWSE: [&str; 5] = ["_ravenna", "_sub", "_rtsp", "_tcp", "local"];

/// Answers `_ravenna._sub._http._tcp.local` browse queries with the full
/// PTR/TXT/SRV/A record set for this node's service instances.
pub struct RavennaHttpHandler {
    adapter: Arc<NetworkAdapter>,
    /// The four advertised service instance names.
    instances: Vec<Name>,
    /// Hostname the SRV records target.
    hostname: Name,
}

impl RavennaHttpHandler {
    /// Builds the advertised names from the vendor identity.
    pub fn new(vendor: &VendorInfo, adapter: Arc<NetworkAdapter>) -> Result<Self, Error> {
        let id = vendor.node_id.as_str();

        let instances = vec![
            Name::from_labels([id, "_http", "_tcp"])?,
            Name::from_labels([id, "_ravenna", "_sub", "_http", "_tcp"])?,
            Name::from_labels([id, "_rtsp", "_tcp"])?,
            Name::from_labels([id, "_ravenna", "_sub", "_rtsp", "_tcp"])?,
        ];
        let hostname = Name::from_labels([vendor.node_name.as_str(), "local"])?;

        Ok(Self {
            adapter,
            instances,
            hostname,
        })
    }
}

impl MdnsHandler for RavennaHttpHandler {
    fn on_question(&self, question: &Question, answers: &mut AnswerList) -> HandlerOutcome {
        if !question.name.matches_labels(&HTTP_BROWSE) {
            return HandlerOutcome::NotYetHandled;
        }

        info!(name = %question.name, "answering ravenna http browse query");

        let Some(addr) = self.adapter.interface_ip4() else {
            warn!(
                interface = self.adapter.name(),
                "cannot advertise: interface has no ipv4 address"
            );
            return HandlerOutcome::Handled;
        };

        for instance in &self.instances {
            answers.append_ptr(&question.name, instance);
            answers.append_txt(instance, "");
            answers.append_srv(instance, &self.hostname);
            answers.append_a(instance, addr);
        }

        HandlerOutcome::Handled
    }

    fn on_reply(&self, _replies: &[ReplyData]) -> HandlerOutcome {
        HandlerOutcome::NotYetHandled
    }
}

/// Claims `_ravenna._sub._rtsp._tcp.local` browse queries.
///
/// RTSP session advertisement is announced elsewhere; this handler only
/// keeps the query from falling through as unclaimed.
pub struct RavennaRtspHandler;

impl MdnsHandler for RavennaRtspHandler {
    fn on_question(&self, question: &Question, _answers: &mut AnswerList) -> HandlerOutcome {
        if !question.name.matches_labels(&RTSP_BROWSE) {
            return HandlerOutcome::NotYetHandled;
        }

        info!(name = %question.name, "handling ravenna rtsp browse query");
        HandlerOutcome::Handled
    }

    fn on_reply(&self, _replies: &[ReplyData]) -> HandlerOutcome {
        HandlerOutcome::NotYetHandled
    }
}
