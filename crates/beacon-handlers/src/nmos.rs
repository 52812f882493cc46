//! NMOS IS-04 node handler.
//!
//! On the question path this advertises the Node API
//! (`_nmos-node._tcp.local`) and claims the registration and query
//! browse names. On the reply path it watches for a Registration API
//! advertisement (`<instance>._nmos-register._tcp.local`), collects the
//! SRV port, A address, and TXT metadata from the same datagram, and
//! kicks off registration against the discovered endpoint.

use beacon_proto::{AnswerList, Name, Question, RData, ReplyData};
use beacon_service::{HandlerOutcome, MdnsHandler};
use compact_str::CompactString;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

const NODE_BROWSE: [&str; 3] = ["_nmos-node", "_tcp", "local"];
const REGISTER_BROWSE: [&str; 3] = ["_nmos-register", "_tcp", "local"];
const QUERY_BROWSE: [&str; 3] = ["_nmos-query", "_tcp", "local"];

/// API version this node speaks.
const API_VERSION: &str = "v1.3";

/// The node-side NMOS state the handler advertises and drives.
///
/// `_nmos-node._tcp` advertises a Node API; `_nmos-register._tcp` a
/// Registration API; `_nmos-query._tcp` a Query API. The handler holds a
/// non-owning reference; the registry outlives it.
pub trait NmosRegistry: Send + Sync {
    /// Begins registration against a discovered Registration API
    /// endpoint. Fire-and-forget from the handler's point of view.
    fn start_registration(&self, server: IpAddr, port: Option<u16>);

    /// Resource counts advertised as `ver_*` TXT values.
    fn num_self(&self) -> u8;
    /// Number of devices.
    fn num_devices(&self) -> u8;
    /// Number of sources.
    fn num_sources(&self) -> u8;
    /// Number of flows.
    fn num_flows(&self) -> u8;
    /// Number of senders.
    fn num_senders(&self) -> u8;
    /// Number of receivers.
    fn num_receivers(&self) -> u8;
}

/// Advertises the Node API and discovers the Registration API.
pub struct NmosNodeHandler {
    registry: Arc<dyn NmosRegistry>,
}

impl NmosNodeHandler {
    /// Creates a handler backed by the given registry.
    pub fn new(registry: Arc<dyn NmosRegistry>) -> Self {
        Self { registry }
    }

    fn node_txt(&self, answers: &mut AnswerList) -> beacon_proto::Result<()> {
        let key = |label: &str| Name::from_labels([label]);

        answers.append_txt(&key("api_proto")?, "http");
        answers.append_txt(&key("api_ver")?, API_VERSION);
        answers.append_txt(&key("api_auth")?, "false");

        answers.append_txt(&key("ver_slf")?, &self.registry.num_self().to_string());
        answers.append_txt(&key("ver_src")?, &self.registry.num_sources().to_string());
        answers.append_txt(&key("ver_flw")?, &self.registry.num_flows().to_string());
        answers.append_txt(&key("ver_dvc")?, &self.registry.num_devices().to_string());
        answers.append_txt(&key("ver_snd")?, &self.registry.num_senders().to_string());
        answers.append_txt(&key("ver_rcv")?, &self.registry.num_receivers().to_string());

        Ok(())
    }

    /// Submits an async lookup for the SRV target of a registration
    /// service that did not include an A record.
    ///
    /// The continuation only logs, so it is a safe no-op if it fires
    /// after the service has shut down.
    fn resolve_hostname(&self, target: &Name) {
        let host = unicast_hostname(target);
        if host.is_empty() {
            info!("empty hostname in registration advertisement");
            return;
        }

        info!(%host, "resolving registration server hostname");
        tokio::spawn(async move {
            match tokio::net::lookup_host((host.as_str(), 0u16)).await {
                Ok(addrs) => {
                    for addr in addrs {
                        info!(%host, ip = %addr.ip(), "resolved registration server");
                    }
                }
                Err(e) => {
                    error!(%host, error = %e, "failed to resolve registration server");
                }
            }
        });
    }
}

/// Joins the labels for a unicast lookup, dropping a trailing `local`.
fn unicast_hostname(name: &Name) -> String {
    let labels: Vec<&str> = name.labels().collect();
    let trimmed = match labels.split_last() {
        Some((last, rest)) if last.eq_ignore_ascii_case("local") => rest,
        _ => &labels[..],
    };
    trimmed.join(".")
}

impl MdnsHandler for NmosNodeHandler {
    fn on_question(&self, question: &Question, answers: &mut AnswerList) -> HandlerOutcome {
        if question.name.matches_labels(&NODE_BROWSE) {
            info!(name = %question.name, "answering nmos node browse query");
            if let Err(e) = self.node_txt(answers) {
                error!(error = %e, "failed to build nmos node answers");
            }
            return HandlerOutcome::Handled;
        }

        if question.name.matches_labels(&REGISTER_BROWSE) {
            info!(name = %question.name, "handling nmos registration browse query");
            return HandlerOutcome::Handled;
        }

        if question.name.matches_labels(&QUERY_BROWSE) {
            info!(name = %question.name, "handling nmos query browse query");
            return HandlerOutcome::Handled;
        }

        HandlerOutcome::NotYetHandled
    }

    fn on_reply(&self, replies: &[ReplyData]) -> HandlerOutcome {
        let mut server_ip: Option<IpAddr> = None;
        let mut server_port: Option<u16> = None;
        let mut server_name: Option<Name> = None;
        let mut api_proto: Option<CompactString> = None;
        let mut api_ver: Option<CompactString> = None;
        let mut found = false;

        for reply in replies {
            if reply.matches_labels(&["*", "_nmos-register", "_tcp", "local"])
                || reply.matches_labels(&["*", "_nmos-registration", "_tcp", "local"])
            {
                info!(name = %reply.name, "recognized nmos registration advertisement");
                found = true;
            }

            match &reply.rdata {
                RData::Txt(map) => {
                    let (Some(proto), Some(ver)) = (map.get("api_proto"), map.get("api_ver"))
                    else {
                        debug!(name = %reply.name, "txt record without api_proto/api_ver");
                        continue;
                    };
                    api_proto = Some(proto.clone());
                    api_ver = Some(ver.clone());
                }

                RData::Ptr(target) => {
                    debug!(service = %target, "service instance in ptr record");
                }

                RData::Srv(srv) => {
                    server_port = Some(srv.port);
                    if server_ip.is_none() {
                        server_name = Some(srv.target.clone());
                    }
                }

                RData::A(addr) => {
                    server_ip = Some(IpAddr::V4(*addr));
                }

                RData::Aaaa(_) => {
                    debug!("aaaa record skipped: ipv6 registration not supported");
                }

                RData::Unknown => {
                    debug!(name = %reply.name, rtype = %reply.rtype, "unhandled reply record type");
                }
            }
        }

        if !found {
            return HandlerOutcome::NotYetHandled;
        }

        let Some(server_ip) = server_ip else {
            if let Some(name) = server_name {
                self.resolve_hostname(&name);
            }
            info!("no address for registration service yet");
            return HandlerOutcome::Handled;
        };

        let Some(api_proto) = api_proto else {
            error!("not registering: advertisement has no api_proto");
            return HandlerOutcome::Handled;
        };
        let Some(api_ver) = api_ver else {
            error!("not registering: advertisement has no api_ver");
            return HandlerOutcome::Handled;
        };

        if api_proto != "http" && api_proto != "https" {
            error!(%api_proto, "not registering: unhandled api proto");
            return HandlerOutcome::Handled;
        }
        if api_ver != API_VERSION {
            error!(%api_ver, "not registering: unhandled api version");
            return HandlerOutcome::Handled;
        }

        info!(server = %server_ip, port = ?server_port, "contacting registration server");
        self.registry.start_registration(server_ip, server_port);

        HandlerOutcome::Handled
    }
}
