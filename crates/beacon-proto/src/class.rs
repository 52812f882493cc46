//! DNS record classes and the repurposed class-field top bit.
//!
//! mDNS reuses bit 15 of the wire class field: in questions it is the
//! unicast-response flag, in answers the cache-flush flag (RFC 6762
//! Sections 5.4 and 10.2). The codec always separates this bit from the
//! class value.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// The repurposed top bit of the wire class field.
pub const CLASS_FLAG_BIT: u16 = 0x8000;

const CLASS_VALUE_MASK: u16 = 0x7FFF;

/// DNS record class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum RecordClass {
    /// Internet - RFC 1035. Used for all mDNS traffic.
    IN = 1,

    /// CSNET - RFC 1035 (obsolete).
    CS = 2,

    /// CHAOS - RFC 1035.
    CH = 3,

    /// Hesiod - RFC 1035.
    HS = 4,
}

impl RecordClass {
    /// Returns the numeric value of the class.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Creates a class from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true if this is the Internet class.
    #[inline]
    pub const fn is_internet(self) -> bool {
        matches!(self, Self::IN)
    }

    /// Returns the human-readable name of the class.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IN => "IN",
            Self::CS => "CS",
            Self::CH => "CH",
            Self::HS => "HS",
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for RecordClass {
    fn default() -> Self {
        Self::IN
    }
}

/// A class value that can represent both standard classes and unknown values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// A known, standard class.
    Known(RecordClass),
    /// An unknown class value.
    Unknown(u16),
}

impl Class {
    /// Creates a class from a u16 value (with the flag bit already removed).
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordClass::from_u16(value)
            .map(Self::Known)
            .unwrap_or(Self::Unknown(value))
    }

    /// Splits a wire class field into the class value and its repurposed
    /// top bit.
    #[inline]
    pub fn split_wire(raw: u16) -> (Self, bool) {
        (
            Self::from_u16(raw & CLASS_VALUE_MASK),
            raw & CLASS_FLAG_BIT != 0,
        )
    }

    /// Recombines the class value with the repurposed top bit for the wire.
    #[inline]
    pub const fn to_wire(self, flag: bool) -> u16 {
        self.to_u16() | if flag { CLASS_FLAG_BIT } else { 0 }
    }

    /// Returns the numeric class value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(c) => c.to_u16(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the standard class if known.
    #[inline]
    pub const fn as_known(self) -> Option<RecordClass> {
        match self {
            Self::Known(c) => Some(c),
            Self::Unknown(_) => None,
        }
    }

    /// Returns true if this is the Internet class.
    #[inline]
    pub const fn is_internet(self) -> bool {
        matches!(self, Self::Known(RecordClass::IN))
    }
}

impl From<RecordClass> for Class {
    fn from(c: RecordClass) -> Self {
        Self::Known(c)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(c) => write!(f, "{c}"),
            Self::Unknown(v) => write!(f, "CLASS{v}"),
        }
    }
}

impl Default for Class {
    fn default() -> Self {
        Self::Known(RecordClass::IN)
    }
}
