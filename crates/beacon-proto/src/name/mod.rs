//! mDNS domain names as label sequences.
//!
//! A name is an ordered sequence of labels, each 1..=63 bytes. The root
//! label is implicit: it is not stored, and encoding appends the
//! terminating zero octet. Service instance labels routinely contain
//! characters a hostname would not (spaces, underscores), so labels are
//! only validated for length.

mod parse;

pub use parse::NameParser;

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use bytes::BytesMut;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

type LabelVec = SmallVec<[CompactString; 6]>;

/// A domain name.
///
/// # Comparison Semantics
///
/// Names compare ASCII case-insensitively per DNS convention. Two names
/// are equal iff they have the same number of labels and each pair of
/// labels is equal.
///
/// # Wildcard Matching
///
/// [`Name::matches`] compares against a pattern name of the same length
/// where the literal label `*` matches any candidate label. This is how
/// handlers recognize service instances without knowing the instance
/// label, e.g. `*._nmos-register._tcp.local`.
///
/// # Example
///
/// ```rust
/// use beacon_proto::Name;
///
/// let name = Name::from_labels(["myservice", "_http", "_tcp", "local"])?;
/// let pattern = Name::from_labels(["*", "_http", "_tcp", "local"])?;
///
/// assert_eq!(name.label_count(), 4);
/// assert!(name.matches(&pattern));
/// # Ok::<(), beacon_proto::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct Name {
    labels: LabelVec,
}

impl Name {
    /// Creates the root (empty) name.
    #[inline]
    pub const fn root() -> Self {
        Self {
            labels: SmallVec::new_const(),
        }
    }

    /// Creates a name from an ordered sequence of labels.
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = LabelVec::new();
        let mut wire_len = 1usize; // terminating zero octet

        for (position, label) in labels.into_iter().enumerate() {
            let label = label.as_ref();
            if label.is_empty() {
                return Err(Error::EmptyLabel { position });
            }
            if label.len() > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong {
                    length: label.len(),
                });
            }

            wire_len += 1 + label.len();
            if wire_len > MAX_NAME_LENGTH {
                return Err(Error::NameTooLong { length: wire_len });
            }

            out.push(CompactString::from(label));
        }

        Ok(Self { labels: out })
    }

    pub(crate) fn from_label_vec(labels: LabelVec) -> Self {
        Self { labels }
    }

    /// Returns the number of labels (the implicit root is not counted).
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if this is the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns an iterator over the labels, leftmost first.
    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(CompactString::as_str)
    }

    /// Returns the label at the given index (0 = leftmost).
    #[inline]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(CompactString::as_str)
    }

    /// Returns the wire format length, including the terminating zero.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| 1 + l.len()).sum::<usize>() + 1
    }

    /// Writes the name in uncompressed wire format: `<len><bytes>...0`.
    ///
    /// Compression is never produced on output.
    pub fn write_wire(&self, buf: &mut BytesMut) {
        for label in &self.labels {
            buf.extend_from_slice(&[label.len() as u8]);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.extend_from_slice(&[0]);
    }

    /// Compares against a pattern name, treating the literal pattern label
    /// `*` as matching any candidate label.
    pub fn matches(&self, pattern: &Name) -> bool {
        if self.labels.len() != pattern.labels.len() {
            return false;
        }

        self.labels
            .iter()
            .zip(pattern.labels.iter())
            .all(|(label, pat)| pat == "*" || label.eq_ignore_ascii_case(pat))
    }

    /// [`Name::matches`] against a pattern given directly as labels.
    pub fn matches_labels(&self, pattern: &[&str]) -> bool {
        if self.labels.len() != pattern.len() {
            return false;
        }

        self.labels
            .iter()
            .zip(pattern.iter())
            .all(|(label, pat)| *pat == "*" || label.eq_ignore_ascii_case(pat))
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a name from the dotted string format.
    ///
    /// An empty string or `.` yields the root name; a trailing dot is
    /// accepted and ignored.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let s = s.strip_suffix('.').unwrap_or(s);
        Self::from_labels(s.split('.'))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }

        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in &self.labels {
            for byte in label.as_bytes() {
                byte.to_ascii_lowercase().hash(state);
            }
            0xFFu8.hash(state); // label separator
        }
    }
}
