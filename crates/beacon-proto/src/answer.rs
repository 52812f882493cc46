//! Outbound answer construction.
//!
//! [`AnswerList`] accumulates the serialized answer section of one reply
//! datagram. Each typed appender writes a complete resource record onto
//! the internal buffer and bumps the answer counter, so the header's
//! ANCOUNT can be taken from [`AnswerList::count`] after the handler
//! chain has run. Names are always written uncompressed.
//!
//! TTLs and cache-flush bits follow mDNS convention: records shared
//! across responders (PTR, TXT) get a long TTL and no cache-flush;
//! records unique to this host (SRV, A) get a short TTL with cache-flush
//! set.

use crate::class::{Class, RecordClass};
use crate::name::Name;
use crate::rtype::RecordType;
use bytes::{Bytes, BytesMut};
use std::net::Ipv4Addr;

/// TTL for outbound PTR and TXT records (seconds).
pub const SHARED_RECORD_TTL_SECS: u32 = 4500;

/// TTL for outbound SRV and A records (seconds).
pub const UNIQUE_RECORD_TTL_SECS: u32 = 120;

/// Accumulator for the answer section of one outbound reply.
///
/// Single-threaded and consumed within one dispatch. The SRV port is
/// supplied by the service configuration (the unencrypted web port in the
/// default build); handlers do not choose it per record.
#[derive(Debug)]
pub struct AnswerList {
    buf: BytesMut,
    count: u16,
    srv_port: u16,
}

impl AnswerList {
    /// Creates an empty answer list advertising `srv_port` in SRV records.
    pub fn new(srv_port: u16) -> Self {
        Self {
            buf: BytesMut::new(),
            count: 0,
            srv_port,
        }
    }

    /// Appends a PTR record: `name` points at `target`.
    pub fn append_ptr(&mut self, name: &Name, target: &Name) {
        self.record_header(name, RecordType::PTR, false, SHARED_RECORD_TTL_SECS);
        self.buf
            .extend_from_slice(&(target.wire_len() as u16).to_be_bytes());
        target.write_wire(&mut self.buf);
        self.count += 1;
    }

    /// Appends a TXT record carrying one counted string.
    ///
    /// Multiple entries are multiple records. Text beyond 255 bytes is
    /// truncated to fit the counted-string length octet.
    pub fn append_txt(&mut self, name: &Name, text: &str) {
        let text = &text.as_bytes()[..text.len().min(255)];

        self.record_header(name, RecordType::TXT, false, SHARED_RECORD_TTL_SECS);
        self.buf
            .extend_from_slice(&((1 + text.len()) as u16).to_be_bytes());
        self.buf.extend_from_slice(&[text.len() as u8]);
        self.buf.extend_from_slice(text);
        self.count += 1;
    }

    /// Appends an SRV record for `name` targeting `target` at the
    /// configured service port, priority and weight zero.
    pub fn append_srv(&mut self, name: &Name, target: &Name) {
        self.record_header(name, RecordType::SRV, true, UNIQUE_RECORD_TTL_SECS);
        self.buf
            .extend_from_slice(&((6 + target.wire_len()) as u16).to_be_bytes());
        self.buf.extend_from_slice(&0u16.to_be_bytes()); // priority
        self.buf.extend_from_slice(&0u16.to_be_bytes()); // weight
        self.buf.extend_from_slice(&self.srv_port.to_be_bytes());
        target.write_wire(&mut self.buf);
        self.count += 1;
    }

    /// Appends an A record for `name` with the given IPv4 address.
    pub fn append_a(&mut self, name: &Name, addr: Ipv4Addr) {
        self.record_header(name, RecordType::A, true, UNIQUE_RECORD_TTL_SECS);
        self.buf.extend_from_slice(&4u16.to_be_bytes());
        self.buf.extend_from_slice(&addr.octets());
        self.count += 1;
    }

    fn record_header(&mut self, name: &Name, rtype: RecordType, cache_flush: bool, ttl: u32) {
        name.write_wire(&mut self.buf);
        self.buf.extend_from_slice(&rtype.to_u16().to_be_bytes());
        self.buf.extend_from_slice(
            &Class::Known(RecordClass::IN)
                .to_wire(cache_flush)
                .to_be_bytes(),
        );
        self.buf.extend_from_slice(&ttl.to_be_bytes());
    }

    /// Number of records appended so far.
    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Returns true if no records have been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The serialized answer section.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the list, yielding the serialized answer section.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{RData, RecordParser};
    use crate::rtype::RType;

    fn name(labels: &[&str]) -> Name {
        Name::from_labels(labels).unwrap()
    }

    #[test]
    fn test_empty_list() {
        let answers = AnswerList::new(80);
        assert_eq!(answers.count(), 0);
        assert!(answers.is_empty());
        assert!(answers.bytes().is_empty());
    }

    #[test]
    fn test_count_tracks_appends() {
        let mut answers = AnswerList::new(80);
        let svc = name(&["_http", "_tcp", "local"]);
        let instance = name(&["myservice", "_http", "_tcp", "local"]);
        let host = name(&["myhost", "local"]);

        answers.append_ptr(&svc, &instance);
        answers.append_txt(&instance, "path=/");
        answers.append_srv(&instance, &host);
        answers.append_a(&host, Ipv4Addr::new(192, 168, 1, 100));

        assert_eq!(answers.count(), 4);
        assert!(!answers.is_empty());
    }

    #[test]
    fn test_records_decode_back_in_call_order() {
        let mut answers = AnswerList::new(8080);
        let svc = name(&["_http", "_tcp", "local"]);
        let instance = name(&["myservice", "_http", "_tcp", "local"]);
        let host = name(&["myhost", "local"]);
        let addr = Ipv4Addr::new(10, 0, 0, 7);

        answers.append_ptr(&svc, &instance);
        answers.append_txt(&instance, "api_ver=v1.3");
        answers.append_srv(&instance, &host);
        answers.append_a(&host, addr);

        let wire = answers.into_bytes();
        let mut parser = RecordParser::new(&wire, 0, 4);
        let records = parser.collect_all().unwrap();
        assert_eq!(records.len(), 4);

        // PTR: shared TTL, no cache-flush, target round-trips
        assert_eq!(records[0].rtype, RType::Known(RecordType::PTR));
        assert_eq!(records[0].ttl, SHARED_RECORD_TTL_SECS);
        assert!(!records[0].cache_flush);
        assert_eq!(records[0].ptr().unwrap(), &instance);

        // TXT: single counted string
        assert_eq!(records[1].rtype, RType::Known(RecordType::TXT));
        assert_eq!(records[1].ttl, SHARED_RECORD_TTL_SECS);
        assert!(!records[1].cache_flush);
        assert_eq!(
            records[1].txt().unwrap().get("api_ver").map(|v| v.as_str()),
            Some("v1.3")
        );

        // SRV: configured port, zero priority and weight, cache-flush set
        assert_eq!(records[2].rtype, RType::Known(RecordType::SRV));
        assert_eq!(records[2].ttl, UNIQUE_RECORD_TTL_SECS);
        assert!(records[2].cache_flush);
        let srv = records[2].srv().unwrap();
        assert_eq!(srv.priority, 0);
        assert_eq!(srv.weight, 0);
        assert_eq!(srv.port, 8080);
        assert_eq!(&srv.target, &host);

        // A: address bytes round-trip, cache-flush set
        assert_eq!(records[3].rtype, RType::Known(RecordType::A));
        assert_eq!(records[3].ttl, UNIQUE_RECORD_TTL_SECS);
        assert!(records[3].cache_flush);
        assert_eq!(records[3].a(), Some(addr));
    }

    #[test]
    fn test_txt_empty_string() {
        let mut answers = AnswerList::new(80);
        let instance = name(&["svc", "local"]);

        answers.append_txt(&instance, "");

        let wire = answers.into_bytes();
        let mut parser = RecordParser::new(&wire, 0, 1);
        let records = parser.collect_all().unwrap();

        // One counted string of length zero
        assert_eq!(records[0].payload.as_ref(), &[0u8]);
        assert_eq!(records[0].rdata, RData::Txt(Default::default()));
    }

    #[test]
    fn test_txt_truncated_to_counted_string_limit() {
        let mut answers = AnswerList::new(80);
        let instance = name(&["svc", "local"]);
        let long = "x".repeat(300);

        answers.append_txt(&instance, &long);

        let wire = answers.into_bytes();
        let mut parser = RecordParser::new(&wire, 0, 1);
        let records = parser.collect_all().unwrap();
        assert_eq!(records[0].payload.len(), 256); // length octet + 255 bytes
    }
}
