//! Answer records parsed from inbound reply datagrams.
//!
//! Each record keeps its raw payload alongside a typed decoding keyed by
//! the record type; unknown types carry only the raw payload. PTR and SRV
//! payloads may use name compression referencing the whole datagram, so
//! their decoders take the enclosing datagram rather than just the RDATA
//! slice.

use crate::class::Class;
use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rtype::{RType, RecordType};
use bytes::Bytes;
use compact_str::CompactString;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Key/value pairs parsed from a TXT record payload.
pub type TxtMap = BTreeMap<CompactString, CompactString>;

/// Decoded SRV record data (RFC 2782).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvPayload {
    /// Priority (lower is more preferred).
    pub priority: u16,
    /// Weight for load balancing among equal priority.
    pub weight: u16,
    /// TCP/UDP port of the service.
    pub port: u16,
    /// Target host name.
    pub target: Name,
}

/// Typed record data, keyed by record type with a raw fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    /// IPv4 address (A record, rdlen 4).
    A(Ipv4Addr),

    /// IPv6 address (AAAA record, rdlen 16).
    Aaaa(Ipv6Addr),

    /// Domain name pointer (PTR record).
    Ptr(Name),

    /// Key/value pairs from `<len><"key=value" | "key">` tuples; an
    /// absent `=` yields an empty value.
    Txt(TxtMap),

    /// Service location.
    Srv(SrvPayload),

    /// Unknown record type; only the raw payload is available.
    Unknown,
}

impl RData {
    /// Parses the typed payload for a record.
    ///
    /// `offset` and `rdlength` locate the RDATA inside `datagram`; the
    /// caller has already verified the slice is in bounds.
    fn parse(rtype: RType, datagram: &[u8], offset: usize, rdlength: usize) -> Result<Self> {
        let payload = &datagram[offset..offset + rdlength];

        match rtype.as_known() {
            Some(RecordType::A) => {
                if rdlength != 4 {
                    return Err(Error::RDataLengthMismatch {
                        rtype: "A",
                        expected: 4,
                        actual: rdlength,
                    });
                }
                let octets: [u8; 4] = payload.try_into().map_err(|_| Error::RDataLengthMismatch {
                    rtype: "A",
                    expected: 4,
                    actual: rdlength,
                })?;
                Ok(Self::A(Ipv4Addr::from(octets)))
            }

            Some(RecordType::AAAA) => {
                if rdlength != 16 {
                    return Err(Error::RDataLengthMismatch {
                        rtype: "AAAA",
                        expected: 16,
                        actual: rdlength,
                    });
                }
                let octets: [u8; 16] =
                    payload.try_into().map_err(|_| Error::RDataLengthMismatch {
                        rtype: "AAAA",
                        expected: 16,
                        actual: rdlength,
                    })?;
                Ok(Self::Aaaa(Ipv6Addr::from(octets)))
            }

            Some(RecordType::PTR) => {
                let parser = NameParser::new(datagram);
                let (target, _) = parser.parse_name(offset)?;
                Ok(Self::Ptr(target))
            }

            Some(RecordType::SRV) => {
                if rdlength < 6 {
                    return Err(Error::RDataLengthMismatch {
                        rtype: "SRV",
                        expected: 6,
                        actual: rdlength,
                    });
                }

                let priority = u16::from_be_bytes([payload[0], payload[1]]);
                let weight = u16::from_be_bytes([payload[2], payload[3]]);
                let port = u16::from_be_bytes([payload[4], payload[5]]);

                let parser = NameParser::new(datagram);
                let (target, _) = parser.parse_name(offset + 6)?;

                Ok(Self::Srv(SrvPayload {
                    priority,
                    weight,
                    port,
                    target,
                }))
            }

            Some(RecordType::TXT) => Ok(Self::Txt(parse_txt(payload)?)),

            _ => Ok(Self::Unknown),
        }
    }
}

fn parse_txt(payload: &[u8]) -> Result<TxtMap> {
    let mut map = TxtMap::new();
    let mut pos = 0;

    while pos < payload.len() {
        let len = payload[pos] as usize;
        if len == 0 {
            break;
        }
        pos += 1;

        if pos + len > payload.len() {
            return Err(Error::invalid_data(
                pos,
                format!("TXT entry length {len} exceeds payload"),
            ));
        }

        let entry = &payload[pos..pos + len];
        match entry.iter().position(|&b| b == b'=') {
            Some(eq) => map.insert(
                CompactString::from_utf8_lossy(&entry[..eq]),
                CompactString::from_utf8_lossy(&entry[eq + 1..]),
            ),
            None => map.insert(CompactString::from_utf8_lossy(entry), CompactString::new("")),
        };
        pos += len;
    }

    Ok(map)
}

/// One answer record parsed from an inbound reply datagram.
///
/// Lives only for the duration of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyData {
    /// The record name.
    pub name: Name,

    /// Record type.
    pub rtype: RType,

    /// Record class, with the cache-flush bit removed.
    pub class: Class,

    /// The cache-flush bit of the wire class field.
    pub cache_flush: bool,

    /// Time to live in seconds.
    pub ttl: u32,

    /// The raw RDATA, regardless of type.
    pub payload: Bytes,

    /// Typed decoding of the payload when the type is known.
    pub rdata: RData,
}

impl ReplyData {
    /// Parses an answer record from the datagram at the given offset.
    ///
    /// Returns the record and the number of bytes consumed. The declared
    /// RDATA length is verified against the remaining datagram before
    /// anything is read from it.
    pub fn parse(datagram: &[u8], offset: usize) -> Result<(Self, usize)> {
        let parser = NameParser::new(datagram);
        let (name, name_len) = parser.parse_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 10 > datagram.len() {
            return Err(Error::buffer_too_short(fixed + 10, datagram.len()));
        }

        let rtype = RType::from_u16(u16::from_be_bytes([datagram[fixed], datagram[fixed + 1]]));
        let (class, cache_flush) = Class::split_wire(u16::from_be_bytes([
            datagram[fixed + 2],
            datagram[fixed + 3],
        ]));
        let ttl = u32::from_be_bytes([
            datagram[fixed + 4],
            datagram[fixed + 5],
            datagram[fixed + 6],
            datagram[fixed + 7],
        ]);
        let rdlength = usize::from(u16::from_be_bytes([
            datagram[fixed + 8],
            datagram[fixed + 9],
        ]));

        let rdata_offset = fixed + 10;
        let remaining = datagram.len() - rdata_offset;
        if rdlength > remaining {
            return Err(Error::RDataOverflow { rdlength, remaining });
        }

        let payload = Bytes::copy_from_slice(&datagram[rdata_offset..rdata_offset + rdlength]);
        let rdata = RData::parse(rtype, datagram, rdata_offset, rdlength)?;

        Ok((
            Self {
                name,
                rtype,
                class,
                cache_flush,
                ttl,
                payload,
                rdata,
            },
            name_len + 10 + rdlength,
        ))
    }

    /// Returns the IPv4 address if this is an A record.
    #[inline]
    pub fn a(&self) -> Option<Ipv4Addr> {
        match &self.rdata {
            RData::A(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Returns the IPv6 address if this is an AAAA record.
    #[inline]
    pub fn aaaa(&self) -> Option<Ipv6Addr> {
        match &self.rdata {
            RData::Aaaa(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Returns the pointer target if this is a PTR record.
    #[inline]
    pub fn ptr(&self) -> Option<&Name> {
        match &self.rdata {
            RData::Ptr(target) => Some(target),
            _ => None,
        }
    }

    /// Returns the SRV payload if this is an SRV record.
    #[inline]
    pub fn srv(&self) -> Option<&SrvPayload> {
        match &self.rdata {
            RData::Srv(srv) => Some(srv),
            _ => None,
        }
    }

    /// Returns the TXT key/value pairs if this is a TXT record.
    #[inline]
    pub fn txt(&self) -> Option<&TxtMap> {
        match &self.rdata {
            RData::Txt(map) => Some(map),
            _ => None,
        }
    }

    /// Wildcard comparison of the record name; see [`Name::matches`].
    #[inline]
    pub fn matches(&self, pattern: &Name) -> bool {
        self.name.matches(pattern)
    }

    /// Wildcard comparison against a pattern given directly as labels.
    #[inline]
    pub fn matches_labels(&self, pattern: &[&str]) -> bool {
        self.name.matches_labels(pattern)
    }
}

/// Sequential parser for the answer section.
#[derive(Debug)]
pub struct RecordParser<'a> {
    /// The complete datagram.
    data: &'a [u8],
    /// Current offset into the datagram.
    offset: usize,
    /// Number of records remaining per the header count.
    remaining: u16,
}

impl<'a> RecordParser<'a> {
    /// Creates a parser reading `count` records starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Parses the next record, or `None` when the count is exhausted.
    pub fn next(&mut self) -> Result<Option<ReplyData>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let (record, consumed) = ReplyData::parse(self.data, self.offset)?;
        self.offset += consumed;
        self.remaining -= 1;

        Ok(Some(record))
    }

    /// Collects all remaining records; any failure aborts the whole reply.
    pub fn collect_all(&mut self) -> Result<Vec<ReplyData>> {
        let mut records = Vec::with_capacity(usize::from(self.remaining).min(16));
        while let Some(r) = self.next()? {
            records.push(r);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encode_name(labels: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for label in labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out
    }

    fn encode_record(name: &[&str], rtype: u16, class: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
        let mut out = encode_name(name);
        out.extend_from_slice(&rtype.to_be_bytes());
        out.extend_from_slice(&class.to_be_bytes());
        out.extend_from_slice(&ttl.to_be_bytes());
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(rdata);
        out
    }

    #[test]
    fn test_parse_ptr_record() {
        let rdata = encode_name(&["myservice", "local"]);
        let wire = encode_record(&["_http", "_tcp", "local"], 12, 1, 4500, &rdata);

        let (record, consumed) = ReplyData::parse(&wire, 0).unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(record.rtype, RType::Known(RecordType::PTR));
        assert_eq!(record.ttl, 4500);
        assert!(!record.cache_flush);
        assert_eq!(record.payload.as_ref(), rdata.as_slice());

        let target = record.ptr().unwrap();
        assert_eq!(target.label(0), Some("myservice"));
        assert_eq!(target.label(1), Some("local"));
    }

    #[test]
    fn test_parse_srv_record() {
        let mut rdata = Vec::new();
        rdata.extend_from_slice(&10u16.to_be_bytes());
        rdata.extend_from_slice(&20u16.to_be_bytes());
        rdata.extend_from_slice(&8080u16.to_be_bytes());
        rdata.extend_from_slice(&encode_name(&["host", "local"]));

        let wire = encode_record(&["svc", "_http", "_tcp", "local"], 33, 0x8001, 120, &rdata);

        let (record, _) = ReplyData::parse(&wire, 0).unwrap();
        assert!(record.cache_flush);

        let srv = record.srv().unwrap();
        assert_eq!(srv.priority, 10);
        assert_eq!(srv.weight, 20);
        assert_eq!(srv.port, 8080);
        assert_eq!(srv.target.to_string(), "host.local");
    }

    #[test]
    fn test_parse_txt_record() {
        let mut rdata = Vec::new();
        for entry in ["api_proto=http", "api_ver=v1.3", "flag"] {
            rdata.push(entry.len() as u8);
            rdata.extend_from_slice(entry.as_bytes());
        }

        let wire = encode_record(&["svc", "local"], 16, 1, 4500, &rdata);

        let (record, _) = ReplyData::parse(&wire, 0).unwrap();
        let txt = record.txt().unwrap();
        assert_eq!(txt.get("api_proto").map(|v| v.as_str()), Some("http"));
        assert_eq!(txt.get("api_ver").map(|v| v.as_str()), Some("v1.3"));
        assert_eq!(txt.get("flag").map(|v| v.as_str()), Some(""));
    }

    #[test]
    fn test_parse_a_record() {
        let wire = encode_record(&["host", "local"], 1, 0x8001, 120, &[192, 168, 1, 10]);

        let (record, _) = ReplyData::parse(&wire, 0).unwrap();
        assert_eq!(record.a(), Some(Ipv4Addr::new(192, 168, 1, 10)));
        assert!(record.cache_flush);
    }

    #[test]
    fn test_parse_aaaa_record() {
        let mut octets = [0u8; 16];
        octets[0] = 0xFE;
        octets[1] = 0x80;
        octets[15] = 1;
        let wire = encode_record(&["host", "local"], 28, 1, 120, &octets);

        let (record, _) = ReplyData::parse(&wire, 0).unwrap();
        assert_eq!(record.aaaa(), Some(Ipv6Addr::from(octets)));
        assert!(record.a().is_none());
    }

    #[test]
    fn test_a_record_size_mismatch() {
        let wire = encode_record(&["host", "local"], 1, 1, 120, &[192, 168, 1]);

        assert!(matches!(
            ReplyData::parse(&wire, 0),
            Err(Error::RDataLengthMismatch {
                rtype: "A",
                expected: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_rdlength_overflow() {
        let mut wire = encode_record(&["host", "local"], 16, 1, 120, &[4, b't', b'e', b's', b't']);
        // Inflate the declared RDATA length past the end of the datagram
        let rdlen_at = wire.len() - 5 - 2;
        wire[rdlen_at] = 0xFF;
        wire[rdlen_at + 1] = 0xFF;

        assert!(matches!(
            ReplyData::parse(&wire, 0),
            Err(Error::RDataOverflow { .. })
        ));
    }

    #[test]
    fn test_unknown_type_keeps_raw_payload() {
        // NSEC (47) is not decoded; the raw payload must survive
        let wire = encode_record(&["host", "local"], 47, 1, 120, &[1, 2, 3, 4]);

        let (record, _) = ReplyData::parse(&wire, 0).unwrap();
        assert_eq!(record.rtype, RType::Unknown(47));
        assert_eq!(record.rdata, RData::Unknown);
        assert_eq!(record.payload.as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_compressed_ptr_target() {
        // Record name at offset 0, PTR rdata pointing back into it
        let mut wire = encode_name(&["myservice", "local"]);
        let name_len = wire.len();
        let mut record = encode_name(&["_http", "_tcp", "local"]);
        record.extend_from_slice(&12u16.to_be_bytes());
        record.extend_from_slice(&1u16.to_be_bytes());
        record.extend_from_slice(&4500u32.to_be_bytes());
        record.extend_from_slice(&2u16.to_be_bytes());
        record.extend_from_slice(&[0xC0, 0x00]); // pointer to offset 0
        wire.extend_from_slice(&record);

        let (parsed, consumed) = ReplyData::parse(&wire, name_len).unwrap();
        assert_eq!(consumed, record.len());
        let target = parsed.ptr().unwrap();
        assert_eq!(target.to_string(), "myservice.local");
    }

    #[test]
    fn test_wildcard_match_on_record() {
        let rdata = encode_name(&["reg", "local"]);
        let wire = encode_record(&["reg", "_nmos-register", "_tcp", "local"], 12, 1, 4500, &rdata);

        let (record, _) = ReplyData::parse(&wire, 0).unwrap();
        assert!(record.matches_labels(&["*", "_nmos-register", "_tcp", "local"]));
        assert!(!record.matches_labels(&["*", "_nmos-query", "_tcp", "local"]));
    }

    #[test]
    fn test_record_parser_collects_in_wire_order() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&encode_record(&["a", "local"], 1, 1, 120, &[10, 0, 0, 1]));
        wire.extend_from_slice(&encode_record(&["b", "local"], 1, 1, 120, &[10, 0, 0, 2]));

        let mut parser = RecordParser::new(&wire, 0, 2);
        let records = parser.collect_all().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.label(0), Some("a"));
        assert_eq!(records[1].name.label(0), Some("b"));
    }

    #[test]
    fn test_record_parser_aborts_on_bad_record() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&encode_record(&["a", "local"], 1, 1, 120, &[10, 0, 0, 1]));
        wire.extend_from_slice(&[0x0A, b'x']); // truncated second record

        let mut parser = RecordParser::new(&wire, 0, 2);
        assert!(parser.collect_all().is_err());
    }
}
