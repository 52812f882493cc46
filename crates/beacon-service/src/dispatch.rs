//! Datagram dispatch.
//!
//! One [`Dispatcher`] drives all inbound traffic: it classifies each
//! datagram as query or reply, decodes the relevant section, and runs the
//! handler chain. Reply emission for queries is deferred by one task so
//! the receive path returns before any handler runs; the reply path for
//! inbound answers runs inline, since it never produces output.

use crate::handler::{HandlerOutcome, MdnsHandler};
use crate::transport::ReplyTransport;
use beacon_proto::header::HEADER_SIZE;
use beacon_proto::question::QuestionParser;
use beacon_proto::reply::RecordParser;
use beacon_proto::{AnswerList, Header, MessageType, Question};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives the handler chain for one datagram at a time.
///
/// Stateless between datagrams apart from the shared, read-only handler
/// list. Cloning is cheap and shares the chain and transport.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<[Arc<dyn MdnsHandler>]>,
    transport: Arc<dyn ReplyTransport>,
    srv_port: u16,
}

impl Dispatcher {
    /// Creates a dispatcher over the given handler chain.
    ///
    /// `srv_port` is the port advertised in outbound SRV records.
    pub fn new(
        handlers: Vec<Arc<dyn MdnsHandler>>,
        transport: Arc<dyn ReplyTransport>,
        srv_port: u16,
    ) -> Self {
        Self {
            handlers: handlers.into(),
            transport,
            srv_port,
        }
    }

    /// Entry point for one inbound datagram.
    pub fn dispatch(&self, datagram: &[u8], src: SocketAddr) {
        if datagram.len() < HEADER_SIZE {
            warn!(
                len = datagram.len(),
                client = %src,
                "ignoring datagram too small for mdns header"
            );
            return;
        }

        let header = match Header::parse(datagram) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, client = %src, "ignoring unparseable mdns header");
                return;
            }
        };

        match header.message_type() {
            MessageType::Query => self.handle_query(datagram, &header, src),
            MessageType::Reply => self.handle_reply(datagram, &header, src),
        }
    }

    /// Query path: decode all questions, then defer chain + emission.
    fn handle_query(&self, datagram: &[u8], header: &Header, src: SocketAddr) {
        let mut parser = QuestionParser::new(datagram, HEADER_SIZE, header.qd_count);
        let questions = match parser.collect_all() {
            Ok(questions) => questions,
            Err(e) => {
                error!(error = %e, client = %src, "malformed mdns query");
                return;
            }
        };

        debug!(
            id = header.id,
            questions = questions.len(),
            client = %src,
            "received mdns query"
        );

        // Deferred one task-tick: the receive callback returns before the
        // handler chain runs.
        let dispatcher = self.clone();
        let id = header.id;
        tokio::spawn(async move {
            dispatcher.send_reply(questions, src, id).await;
        });
    }

    /// Runs the handler chain over the questions of one datagram and
    /// emits at most one consolidated reply.
    async fn send_reply(&self, questions: Vec<Question>, src: SocketAddr, id: u16) {
        let mut answers = AnswerList::new(self.srv_port);

        for question in &questions {
            let mut handled = false;
            for handler in self.handlers.iter() {
                if handler.on_question(question, &mut answers) == HandlerOutcome::Handled {
                    handled = true;
                    break;
                }
            }

            if !handled {
                info!(name = %question.name, client = %src, "no handler claimed question");
            }
        }

        if answers.is_empty() {
            debug!(client = %src, "query not for us: no answers");
            return;
        }

        let header = Header::reply(id, answers.count());
        let mut packet = BytesMut::with_capacity(HEADER_SIZE + answers.bytes().len());
        header.write_to(&mut packet);
        packet.extend_from_slice(answers.bytes());

        info!(
            id = header.id,
            answers = header.an_count,
            client = %src,
            "replying to mdns query"
        );

        if let Err(e) = self.transport.send(packet.freeze()).await {
            warn!(error = %e, "failed to send mdns reply");
        }
    }

    /// Reply path: decode all answer records, then run the chain once
    /// over the full set. Produces no outbound packet.
    fn handle_reply(&self, datagram: &[u8], header: &Header, src: SocketAddr) {
        let mut parser = RecordParser::new(datagram, HEADER_SIZE, header.an_count);
        let replies = match parser.collect_all() {
            Ok(replies) => replies,
            Err(e) => {
                error!(error = %e, client = %src, "malformed mdns reply");
                return;
            }
        };

        debug!(answers = replies.len(), client = %src, "dispatching mdns reply");

        let handled = self
            .handlers
            .iter()
            .any(|handler| handler.on_reply(&replies) == HandlerOutcome::Handled);

        if !handled {
            info!(client = %src, "no handler claimed reply");
        }
    }
}
