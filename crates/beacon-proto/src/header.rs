//! mDNS message header.
//!
//! The header is a fixed 12-byte structure at the start of every DNS
//! message. mDNS keeps the RFC 1035 layout; the only flags this codec
//! sets on output are QR and AA.

use crate::error::{Error, Result};
use bitflags::bitflags;
use bytes::BytesMut;
use std::fmt;

/// Size of the mDNS header in bytes.
pub const HEADER_SIZE: usize = 12;

bitflags! {
    /// Single-bit header flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u16 {
        /// Query/Response flag: 0 = query, 1 = reply.
        const QR = 0x8000;

        /// Authoritative Answer. mDNS responders always set this on replies.
        const AA = 0x0400;

        /// Truncation: message was truncated.
        const TC = 0x0200;

        /// Recursion Desired. Meaningless for mDNS, preserved on parse.
        const RD = 0x0100;

        /// Recursion Available. Meaningless for mDNS, preserved on parse.
        const RA = 0x0080;
    }
}

/// Message direction, derived from the QR bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// QR = 0: a query to be answered.
    Query,
    /// QR = 1: a reply carrying answer records.
    Reply,
}

/// Parsed mDNS message header.
///
/// # Wire Format
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA| Z|   |   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Transaction id. Opaque to the service and echoed unchanged in replies.
    pub id: u16,

    /// Single-bit flags.
    pub flags: HeaderFlags,

    /// Operation code (bits 11-14 of the flags word).
    pub opcode: u8,

    /// Response code (bits 0-3 of the flags word).
    pub rcode: u8,

    /// Number of questions.
    pub qd_count: u16,

    /// Number of answer records.
    pub an_count: u16,

    /// Number of authority records.
    pub ns_count: u16,

    /// Number of additional records.
    pub ar_count: u16,
}

impl Header {
    /// Creates a query header with all flags clear.
    #[inline]
    pub const fn query(id: u16, qd_count: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::empty(),
            opcode: 0,
            rcode: 0,
            qd_count,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Creates a reply header with QR and AA set and a zero question count.
    #[inline]
    pub const fn reply(id: u16, an_count: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::QR.union(HeaderFlags::AA),
            opcode: 0,
            rcode: 0,
            qd_count: 0,
            an_count,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Returns the message direction from the QR bit.
    #[inline]
    pub fn message_type(&self) -> MessageType {
        if self.flags.contains(HeaderFlags::QR) {
            MessageType::Reply
        } else {
            MessageType::Query
        }
    }

    /// Returns true if the AA bit is set.
    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.flags.contains(HeaderFlags::AA)
    }

    /// Returns true if the message was truncated.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags.contains(HeaderFlags::TC)
    }

    /// Parses a header from wire format.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::buffer_too_short(HEADER_SIZE, data.len()));
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let flags_raw = u16::from_be_bytes([data[2], data[3]]);

        let opcode = ((flags_raw >> 11) & 0x0F) as u8;
        let rcode = (flags_raw & 0x0F) as u8;
        let flags = HeaderFlags::from_bits_truncate(flags_raw);

        Ok(Self {
            id,
            flags,
            opcode,
            rcode,
            qd_count: u16::from_be_bytes([data[4], data[5]]),
            an_count: u16::from_be_bytes([data[6], data[7]]),
            ns_count: u16::from_be_bytes([data[8], data[9]]),
            ar_count: u16::from_be_bytes([data[10], data[11]]),
        })
    }

    /// Serializes the header to wire format.
    pub fn to_wire(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..2].copy_from_slice(&self.id.to_be_bytes());

        let mut flags_raw = self.flags.bits();
        flags_raw |= u16::from(self.opcode & 0x0F) << 11;
        flags_raw |= u16::from(self.rcode & 0x0F);

        buf[2..4].copy_from_slice(&flags_raw.to_be_bytes());
        buf[4..6].copy_from_slice(&self.qd_count.to_be_bytes());
        buf[6..8].copy_from_slice(&self.an_count.to_be_bytes());
        buf[8..10].copy_from_slice(&self.ns_count.to_be_bytes());
        buf[10..12].copy_from_slice(&self.ar_count.to_be_bytes());

        buf
    }

    /// Writes the header to a buffer.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&self.to_wire());
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID:{:04X} {} QD:{} AN:{} NS:{} AR:{}",
            self.id,
            match self.message_type() {
                MessageType::Query => "QUERY",
                MessageType::Reply => "REPLY",
            },
            self.qd_count,
            self.an_count,
            self.ns_count,
            self.ar_count
        )
    }
}
