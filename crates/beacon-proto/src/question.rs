//! mDNS question section.

use crate::class::{Class, RecordClass};
use crate::error::{Error, Result};
use crate::name::{Name, NameParser};
use crate::rtype::{RType, RecordType};
use bytes::BytesMut;
use std::fmt;

/// A single mDNS question.
///
/// The top bit of the wire class field is the unicast-response flag
/// (RFC 6762 Section 5.4); the codec separates it from the class value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// The name being queried.
    pub name: Name,

    /// Requested record type.
    pub rtype: RType,

    /// Question class, with the unicast-response bit removed.
    pub class: Class,

    /// The querier asked for a unicast reply.
    pub unicast_response: bool,
}

impl Question {
    /// Creates a new multicast question.
    #[inline]
    pub fn new(name: Name, rtype: RecordType, class: RecordClass) -> Self {
        Self {
            name,
            rtype: RType::Known(rtype),
            class: Class::Known(class),
            unicast_response: false,
        }
    }

    /// Parses a question from the datagram at the given offset.
    ///
    /// Returns the question and the number of bytes consumed.
    pub fn parse(datagram: &[u8], offset: usize) -> Result<(Self, usize)> {
        let parser = NameParser::new(datagram);
        let (name, name_len) = parser.parse_name(offset)?;

        let fixed = offset + name_len;
        if fixed + 4 > datagram.len() {
            return Err(Error::buffer_too_short(fixed + 4, datagram.len()));
        }

        let rtype = RType::from_u16(u16::from_be_bytes([datagram[fixed], datagram[fixed + 1]]));
        let (class, unicast_response) = Class::split_wire(u16::from_be_bytes([
            datagram[fixed + 2],
            datagram[fixed + 3],
        ]));

        Ok((
            Self {
                name,
                rtype,
                class,
                unicast_response,
            },
            name_len + 4,
        ))
    }

    /// Returns the wire format length of this question.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.name.wire_len() + 4
    }

    /// Writes the question to wire format.
    pub fn write_to(&self, buf: &mut BytesMut) {
        self.name.write_wire(buf);
        buf.extend_from_slice(&self.rtype.to_u16().to_be_bytes());
        buf.extend_from_slice(&self.class.to_wire(self.unicast_response).to_be_bytes());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.class, self.rtype)
    }
}

/// Sequential parser for the question section.
#[derive(Debug)]
pub struct QuestionParser<'a> {
    /// The complete datagram.
    data: &'a [u8],
    /// Current offset into the datagram.
    offset: usize,
    /// Number of questions remaining per the header count.
    remaining: u16,
}

impl<'a> QuestionParser<'a> {
    /// Creates a parser reading `count` questions starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Returns the current offset.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parses the next question, or `None` when the count is exhausted.
    pub fn next(&mut self) -> Result<Option<Question>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let (question, consumed) = Question::parse(self.data, self.offset)?;
        self.offset += consumed;
        self.remaining -= 1;

        Ok(Some(question))
    }

    /// Collects all remaining questions.
    ///
    /// A declared count that exceeds what the datagram actually holds
    /// fails here, which drops the datagram wholesale.
    pub fn collect_all(&mut self) -> Result<Vec<Question>> {
        let mut questions = Vec::with_capacity(usize::from(self.remaining).min(16));
        while let Some(q) = self.next()? {
            questions.push(q);
        }
        Ok(questions)
    }
}
