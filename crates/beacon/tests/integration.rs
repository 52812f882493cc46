//! End-to-end dispatch tests.
//!
//! These drive the dispatcher the way the receive loop does, with
//! handcrafted wire-format datagrams and a channel-backed transport in
//! place of the multicast socket, and assert on both handler
//! observations and the emitted reply bytes.

use async_trait::async_trait;
use beacon_proto::header::HEADER_SIZE;
use beacon_proto::reply::RecordParser;
use beacon_proto::{
    AnswerList, Class, Header, MessageType, Name, Question, RType, RecordClass, RecordType,
    ReplyData,
};
use beacon_service::{Dispatcher, HandlerOutcome, MdnsHandler, ReplyTransport};
use bytes::Bytes;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Test Helpers
// ============================================================================

/// Captures outbound datagrams instead of multicasting them.
struct ChannelTransport {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelTransport {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl ReplyTransport for ChannelTransport {
    async fn send(&self, datagram: Bytes) -> io::Result<()> {
        self.tx
            .send(datagram)
            .map_err(|_| io::Error::other("receiver dropped"))
    }
}

/// Records every question it sees and returns a fixed outcome.
struct QuestionRecorder {
    outcome: HandlerOutcome,
    questions: Mutex<Vec<Question>>,
    reply_calls: AtomicUsize,
}

impl QuestionRecorder {
    fn new(outcome: HandlerOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            questions: Mutex::new(Vec::new()),
            reply_calls: AtomicUsize::new(0),
        })
    }

    fn questions(&self) -> Vec<Question> {
        self.questions.lock().unwrap().clone()
    }

    fn total_calls(&self) -> usize {
        self.questions.lock().unwrap().len() + self.reply_calls.load(Ordering::SeqCst)
    }
}

impl MdnsHandler for QuestionRecorder {
    fn on_question(&self, question: &Question, _answers: &mut AnswerList) -> HandlerOutcome {
        self.questions.lock().unwrap().push(question.clone());
        self.outcome
    }

    fn on_reply(&self, _replies: &[ReplyData]) -> HandlerOutcome {
        self.reply_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

/// Records every reply set it sees.
struct ReplyRecorder {
    outcome: HandlerOutcome,
    replies: Mutex<Vec<Vec<ReplyData>>>,
    question_calls: AtomicUsize,
}

impl ReplyRecorder {
    fn new(outcome: HandlerOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            replies: Mutex::new(Vec::new()),
            question_calls: AtomicUsize::new(0),
        })
    }

    fn replies(&self) -> Vec<Vec<ReplyData>> {
        self.replies.lock().unwrap().clone()
    }

    fn total_calls(&self) -> usize {
        self.replies.lock().unwrap().len() + self.question_calls.load(Ordering::SeqCst)
    }
}

impl MdnsHandler for ReplyRecorder {
    fn on_question(&self, _question: &Question, _answers: &mut AnswerList) -> HandlerOutcome {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }

    fn on_reply(&self, replies: &[ReplyData]) -> HandlerOutcome {
        self.replies.lock().unwrap().push(replies.to_vec());
        self.outcome
    }
}

/// Appends one record of each type for every question it is offered.
struct AdvertisingHandler {
    instance: Name,
    hostname: Name,
    addr: Ipv4Addr,
}

impl AdvertisingHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            instance: Name::from_labels(["myservice", "_http", "_tcp", "local"]).unwrap(),
            hostname: Name::from_labels(["myhost", "local"]).unwrap(),
            addr: Ipv4Addr::new(192, 168, 1, 100),
        })
    }
}

impl MdnsHandler for AdvertisingHandler {
    fn on_question(&self, question: &Question, answers: &mut AnswerList) -> HandlerOutcome {
        answers.append_ptr(&question.name, &self.instance);
        answers.append_txt(&self.instance, "path=/");
        answers.append_srv(&self.instance, &self.hostname);
        answers.append_a(&self.hostname, self.addr);
        HandlerOutcome::Handled
    }

    fn on_reply(&self, _replies: &[ReplyData]) -> HandlerOutcome {
        HandlerOutcome::NotYetHandled
    }
}

fn dispatcher(handlers: Vec<Arc<dyn MdnsHandler>>) -> (Dispatcher, mpsc::UnboundedReceiver<Bytes>) {
    let (transport, rx) = ChannelTransport::new();
    (Dispatcher::new(handlers, transport, 8080), rx)
}

fn encode_name(labels: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for label in labels {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

fn query_packet(id: u16, qname: &[&str], qtype: u16, qclass: u16) -> Vec<u8> {
    let mut packet = Header::query(id, 1).to_wire().to_vec();
    packet.extend_from_slice(&encode_name(qname));
    packet.extend_from_slice(&qtype.to_be_bytes());
    packet.extend_from_slice(&qclass.to_be_bytes());
    packet
}

fn reply_packet_ptr(id: u16, name: &[&str], target: &[&str], ttl: u32) -> Vec<u8> {
    let rdata = encode_name(target);

    let mut packet = Header::reply(id, 1).to_wire().to_vec();
    packet.extend_from_slice(&encode_name(name));
    packet.extend_from_slice(&12u16.to_be_bytes());
    packet.extend_from_slice(&1u16.to_be_bytes());
    packet.extend_from_slice(&ttl.to_be_bytes());
    packet.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    packet.extend_from_slice(&rdata);
    packet
}

fn src() -> SocketAddr {
    "192.168.1.50:5353".parse().unwrap()
}

async fn expect_packet(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Bytes {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for outbound packet")
        .expect("transport channel closed")
}

async fn expect_no_packet(rx: &mut mpsc::UnboundedReceiver<Bytes>) {
    // Give any wrongly spawned reply task a chance to run first
    assert!(
        timeout(Duration::from_millis(100), rx.recv()).await.is_err(),
        "unexpected outbound packet"
    );
}

// ============================================================================
// Scenarios
// ============================================================================

/// S1: a PTR query dispatches one on_question invocation; with no handler
/// claiming it, no packet goes out.
#[tokio::test]
async fn ptr_query_dispatches_to_handler() {
    let handler = QuestionRecorder::new(HandlerOutcome::NotYetHandled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    dispatcher.dispatch(
        &query_packet(0x1234, &["_http", "_tcp", "local"], 12, 1),
        src(),
    );

    expect_no_packet(&mut rx).await;

    let questions = handler.questions();
    assert_eq!(questions.len(), 1);

    let q = &questions[0];
    assert_eq!(
        q.name.labels().collect::<Vec<_>>(),
        vec!["_http", "_tcp", "local"]
    );
    assert_eq!(q.rtype, RType::Known(RecordType::PTR));
    assert_eq!(q.class, Class::Known(RecordClass::IN));
    assert!(!q.unicast_response);
}

/// S2: a PTR reply dispatches one on_reply invocation with the decoded
/// record; no packet goes out.
#[tokio::test]
async fn ptr_reply_dispatches_to_handler() {
    let handler = ReplyRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    dispatcher.dispatch(
        &reply_packet_ptr(
            0x5678,
            &["_http", "_tcp", "local"],
            &["myservice", "local"],
            4500,
        ),
        src(),
    );

    let batches = handler.replies();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);

    let reply = &batches[0][0];
    assert_eq!(reply.rtype, RType::Known(RecordType::PTR));
    assert_eq!(reply.ttl, 4500);
    let target = reply.ptr().expect("typed PTR payload");
    assert_eq!(
        target.labels().collect::<Vec<_>>(),
        vec!["myservice", "local"]
    );

    expect_no_packet(&mut rx).await;
}

/// S3: a datagram shorter than the header reaches no handler and sends
/// nothing.
#[tokio::test]
async fn too_short_datagram_ignored() {
    let handler = QuestionRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    dispatcher.dispatch(&[0x12, 0x34, 0x00, 0x00, 0x00], src());

    expect_no_packet(&mut rx).await;
    assert_eq!(handler.total_calls(), 0);
}

/// S4: a label length that overruns the buffer drops the datagram before
/// any handler runs.
#[tokio::test]
async fn malformed_name_ignored() {
    let handler = QuestionRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    let mut packet = Header::query(0x1234, 1).to_wire().to_vec();
    packet.extend_from_slice(&[0x0A, b'a', b'b', b'c']); // label claims 10 bytes, 3 present

    dispatcher.dispatch(&packet, src());

    expect_no_packet(&mut rx).await;
    assert_eq!(handler.total_calls(), 0);
}

/// S5: a compression pointer past the end of the datagram drops it.
#[tokio::test]
async fn out_of_range_compression_pointer_ignored() {
    let handler = QuestionRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    let mut packet = Header::query(0x1234, 1).to_wire().to_vec();
    packet.extend_from_slice(&[0xC0, 0xFF]);

    dispatcher.dispatch(&packet, src());

    expect_no_packet(&mut rx).await;
    assert_eq!(handler.total_calls(), 0);
}

/// A header that declares more questions than the datagram holds drops
/// the datagram wholesale.
#[tokio::test]
async fn missing_question_fields_ignored() {
    let handler = QuestionRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    let mut packet = Header::query(0x1234, 1).to_wire().to_vec();
    packet.extend_from_slice(&encode_name(&["test"]));
    // QTYPE and QCLASS missing

    dispatcher.dispatch(&packet, src());

    expect_no_packet(&mut rx).await;
    assert_eq!(handler.total_calls(), 0);
}

/// S6: a five-label service query decodes with all labels in wire order.
#[tokio::test]
async fn multi_label_query_decoded() {
    let handler = QuestionRecorder::new(HandlerOutcome::NotYetHandled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    dispatcher.dispatch(
        &query_packet(
            0xABCD,
            &["myservice", "_ravenna", "_sub", "_http", "_tcp"],
            12,
            1,
        ),
        src(),
    );

    expect_no_packet(&mut rx).await;

    let questions = handler.questions();
    assert_eq!(questions.len(), 1);
    assert_eq!(
        questions[0].name.labels().collect::<Vec<_>>(),
        vec!["myservice", "_ravenna", "_sub", "_http", "_tcp"]
    );
}

/// S7: one handler appending PTR/TXT/SRV/A produces a single reply with
/// ANCOUNT 4, the echoed txid, QDCOUNT 0, and the records in call order.
#[tokio::test]
async fn answer_construction_produces_matching_count() {
    let (dispatcher, mut rx) = dispatcher(vec![AdvertisingHandler::new()]);

    dispatcher.dispatch(
        &query_packet(0x1234, &["_http", "_tcp", "local"], 12, 1),
        src(),
    );

    let packet = expect_packet(&mut rx).await;

    let header = Header::parse(&packet).unwrap();
    assert_eq!(header.message_type(), MessageType::Reply);
    assert!(header.is_authoritative());
    assert_eq!(header.id, 0x1234);
    assert_eq!(header.qd_count, 0);
    assert_eq!(header.an_count, 4);

    let mut parser = RecordParser::new(&packet, HEADER_SIZE, header.an_count);
    let records = parser.collect_all().unwrap();
    assert_eq!(records.len(), 4);

    assert_eq!(records[0].rtype, RType::Known(RecordType::PTR));
    assert_eq!(records[1].rtype, RType::Known(RecordType::TXT));
    assert_eq!(records[2].rtype, RType::Known(RecordType::SRV));
    assert_eq!(records[3].rtype, RType::Known(RecordType::A));

    // SRV carries the dispatcher's configured service port
    assert_eq!(records[2].srv().unwrap().port, 8080);
    assert_eq!(records[3].a(), Some(Ipv4Addr::new(192, 168, 1, 100)));

    // Exactly one datagram per inbound query
    expect_no_packet(&mut rx).await;
}

// ============================================================================
// Chain semantics
// ============================================================================

/// Handlers run in registration order, and the first Handled stops the
/// chain for that question.
#[tokio::test]
async fn first_handler_wins() {
    let first = QuestionRecorder::new(HandlerOutcome::Handled);
    let second = QuestionRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![first.clone(), second.clone()]);

    dispatcher.dispatch(
        &query_packet(0x0001, &["_http", "_tcp", "local"], 12, 1),
        src(),
    );

    expect_no_packet(&mut rx).await; // Handled without appending records

    assert_eq!(first.questions().len(), 1);
    assert_eq!(second.questions().len(), 0);
}

/// An unclaimed question is offered to every handler in registration
/// order.
#[tokio::test]
async fn unclaimed_question_walks_whole_chain() {
    let first = QuestionRecorder::new(HandlerOutcome::NotYetHandled);
    let second = QuestionRecorder::new(HandlerOutcome::NotYetHandled);
    let (dispatcher, mut rx) = dispatcher(vec![first.clone(), second.clone()]);

    dispatcher.dispatch(
        &query_packet(0x0002, &["_http", "_tcp", "local"], 12, 1),
        src(),
    );

    expect_no_packet(&mut rx).await;

    assert_eq!(first.questions().len(), 1);
    assert_eq!(second.questions().len(), 1);
}

/// Duplicate question names are not deduplicated; handlers see each
/// occurrence in wire order.
#[tokio::test]
async fn duplicate_questions_all_dispatched() {
    let handler = QuestionRecorder::new(HandlerOutcome::NotYetHandled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    let mut packet = Header::query(0x0003, 2).to_wire().to_vec();
    for _ in 0..2 {
        packet.extend_from_slice(&encode_name(&["_http", "_tcp", "local"]));
        packet.extend_from_slice(&12u16.to_be_bytes());
        packet.extend_from_slice(&1u16.to_be_bytes());
    }

    dispatcher.dispatch(&packet, src());

    expect_no_packet(&mut rx).await;
    assert_eq!(handler.questions().len(), 2);
}

/// The unicast-response bit is separated from the class value.
#[tokio::test]
async fn unicast_response_bit_decoded() {
    let handler = QuestionRecorder::new(HandlerOutcome::NotYetHandled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    dispatcher.dispatch(
        &query_packet(0x0004, &["_http", "_tcp", "local"], 12, 0x8001),
        src(),
    );

    expect_no_packet(&mut rx).await;

    let questions = handler.questions();
    assert!(questions[0].unicast_response);
    assert_eq!(questions[0].class, Class::Known(RecordClass::IN));
}

/// A reply datagram never produces an outbound packet, even when a
/// handler claims it.
#[tokio::test]
async fn reply_path_produces_no_packet() {
    let handler = ReplyRecorder::new(HandlerOutcome::Handled);
    let (dispatcher, mut rx) = dispatcher(vec![handler.clone()]);

    dispatcher.dispatch(
        &reply_packet_ptr(0x0005, &["a", "local"], &["b", "local"], 120),
        src(),
    );

    assert_eq!(handler.replies().len(), 1);
    assert_eq!(handler.total_calls(), 1);
    expect_no_packet(&mut rx).await;
}

/// One datagram's failure leaves the dispatcher fully functional for the
/// next.
#[tokio::test]
async fn failure_does_not_affect_next_datagram() {
    let (dispatcher, mut rx) = dispatcher(vec![AdvertisingHandler::new()]);

    let mut bad = Header::query(0x0006, 1).to_wire().to_vec();
    bad.extend_from_slice(&[0xC0, 0xFF]);
    dispatcher.dispatch(&bad, src());

    dispatcher.dispatch(
        &query_packet(0x0007, &["_http", "_tcp", "local"], 12, 1),
        src(),
    );

    let packet = expect_packet(&mut rx).await;
    let header = Header::parse(&packet).unwrap();
    assert_eq!(header.id, 0x0007);
    assert_eq!(header.an_count, 4);
}
