//! DNS record types.
//!
//! Only the types this service decodes with typed payloads get enum
//! variants; everything else decodes as an unknown type carrying its raw
//! payload.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// DNS record type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u16)]
pub enum RecordType {
    /// IPv4 address - RFC 1035.
    A = 1,

    /// Authoritative name server - RFC 1035.
    NS = 2,

    /// Canonical name (alias) - RFC 1035.
    CNAME = 5,

    /// Domain name pointer - RFC 1035. Carries service instance names in
    /// DNS-SD browsing.
    PTR = 12,

    /// Text strings - RFC 1035. Carries key/value metadata in DNS-SD.
    TXT = 16,

    /// IPv6 address - RFC 3596.
    AAAA = 28,

    /// Server selection - RFC 2782.
    SRV = 33,

    /// Any type - RFC 1035. Query-only; DNS-SD browsers send it.
    ANY = 255,
}

impl RecordType {
    /// Returns the numeric value of the type.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Creates a record type from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns the human-readable name of the type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::PTR => "PTR",
            Self::TXT => "TXT",
            Self::AAAA => "AAAA",
            Self::SRV => "SRV",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A type value that can represent both known types and unknown values.
///
/// Unknown types decode but carry only the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RType {
    /// A known record type.
    Known(RecordType),
    /// An unknown type value.
    Unknown(u16),
}

impl RType {
    /// Creates a type from a u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordType::from_u16(value)
            .map(Self::Known)
            .unwrap_or(Self::Unknown(value))
    }

    /// Returns the numeric type value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(t) => t.to_u16(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the known record type, if any.
    #[inline]
    pub const fn as_known(self) -> Option<RecordType> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown(_) => None,
        }
    }
}

impl From<RecordType> for RType {
    fn from(t: RecordType) -> Self {
        Self::Known(t)
    }
}

impl fmt::Display for RType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(t) => write!(f, "{t}"),
            Self::Unknown(v) => write!(f, "TYPE{v}"),
        }
    }
}
