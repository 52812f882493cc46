//! # Beacon mDNS Protocol Library
//!
//! Wire format types and codec for Multicast DNS (RFC 1035 framing with
//! the mDNS refinements of RFC 6762). The decoder is written for hostile
//! input: every read is bounds-checked against the enclosing datagram and
//! name compression is resolved with hard limits on pointer chasing.
//!
//! ## Example
//!
//! ```rust
//! use beacon_proto::{AnswerList, Header, Name};
//!
//! let name = Name::from_labels(["_http", "_tcp", "local"])?;
//! let target = Name::from_labels(["myservice", "local"])?;
//!
//! let mut answers = AnswerList::new(80);
//! answers.append_ptr(&name, &target);
//!
//! let header = Header::reply(0x1234, answers.count());
//! assert_eq!(header.an_count, 1);
//! # Ok::<(), beacon_proto::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answer;
pub mod class;
pub mod error;
pub mod header;
pub mod name;
pub mod question;
pub mod reply;
pub mod rtype;

// Re-exports for convenience
pub use answer::AnswerList;
pub use class::{Class, RecordClass};
pub use error::{Error, Result};
pub use header::{Header, MessageType};
pub use name::{Name, NameParser};
pub use question::Question;
pub use reply::{RData, ReplyData, SrvPayload};
pub use rtype::{RType, RecordType};

/// Maximum length of a DNS label (63 bytes per RFC 1035).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a domain name in wire format (255 bytes per RFC 1035).
pub const MAX_NAME_LENGTH: usize = 255;

/// Upper bound on labels resolved while decoding a single name.
///
/// Compression pointer chains that exceed this are treated as decode
/// failures, which keeps the parser total on adversarial input.
pub const MAX_NAME_LABELS: usize = 128;

/// mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;
