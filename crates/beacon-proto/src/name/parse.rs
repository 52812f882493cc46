//! Name decoding from wire format with compression support.
//!
//! Names in a DNS message may end in a compression pointer: a two-octet
//! sequence whose top two bits are `11`, the remaining 14 bits forming an
//! offset into the enclosing datagram where the rest of the name resides
//! (RFC 1035 Section 4.1.4). The parser therefore always holds the whole
//! datagram, and every decode is bounded so that hostile pointer chains
//! terminate as errors rather than loops.

use super::Name;
use crate::error::{Error, Result};
use crate::{MAX_NAME_LABELS, MAX_NAME_LENGTH};
use compact_str::CompactString;
use smallvec::SmallVec;

/// Parser for reading domain names from an mDNS datagram.
#[derive(Debug, Clone)]
pub struct NameParser<'a> {
    /// The complete datagram, for compression pointer resolution.
    datagram: &'a [u8],
}

impl<'a> NameParser<'a> {
    /// Creates a new name parser over the given datagram.
    #[inline]
    pub const fn new(datagram: &'a [u8]) -> Self {
        Self { datagram }
    }

    /// Parses a domain name starting at the given offset.
    ///
    /// Returns the parsed name and the number of bytes consumed at the
    /// starting position (a compression pointer consumes two bytes,
    /// regardless of how long the resolved tail is).
    pub fn parse_name(&self, offset: usize) -> Result<(Name, usize)> {
        let mut labels: SmallVec<[CompactString; 6]> = SmallVec::new();
        let mut consumed = 0;
        let mut pos = offset;
        let mut jumps = 0;
        let mut followed_pointer = false;
        let mut wire_len = 1usize;

        loop {
            if pos >= self.datagram.len() {
                return Err(Error::UnexpectedEof { offset: pos });
            }

            let len_byte = self.datagram[pos];

            // Compression pointer: top two bits are 11
            if len_byte & 0xC0 == 0xC0 {
                if pos + 1 >= self.datagram.len() {
                    return Err(Error::UnexpectedEof { offset: pos + 1 });
                }

                let target =
                    usize::from(u16::from_be_bytes([len_byte & 0x3F, self.datagram[pos + 1]]));

                // The offset must lie strictly inside the datagram
                if target >= self.datagram.len() {
                    return Err(Error::InvalidCompressionPointer {
                        offset: pos,
                        target,
                    });
                }

                if !followed_pointer {
                    consumed = pos - offset + 2;
                    followed_pointer = true;
                }

                jumps += 1;
                if jumps > MAX_NAME_LABELS {
                    return Err(Error::CompressionLoop { offset });
                }

                pos = target;
                continue;
            }

            // Extended label types (reserved, top bits 01 or 10)
            if len_byte >= 0x40 {
                return Err(Error::invalid_data(
                    pos,
                    format!("invalid label type 0x{len_byte:02X}"),
                ));
            }

            let len = len_byte as usize;

            // Root label terminates the name
            if len == 0 {
                if !followed_pointer {
                    consumed = pos - offset + 1;
                }
                break;
            }

            if pos + 1 + len > self.datagram.len() {
                return Err(Error::UnexpectedEof {
                    offset: pos + 1 + len,
                });
            }

            wire_len += 1 + len;
            if wire_len > MAX_NAME_LENGTH {
                return Err(Error::NameTooLong { length: wire_len });
            }
            if labels.len() >= MAX_NAME_LABELS {
                return Err(Error::TooManyLabels {
                    max_labels: MAX_NAME_LABELS,
                });
            }

            labels.push(CompactString::from_utf8_lossy(
                &self.datagram[pos + 1..pos + 1 + len],
            ));
            pos += 1 + len;
        }

        Ok((Name::from_label_vec(labels), consumed))
    }
}
