//! Strongly-typed arena offsets.
//!
//! Both types are plain byte offsets from the start of the arena. They
//! never alias the arena's storage, so holding one does not borrow the
//! heap it came from.

use std::fmt;

/// Byte offset of a block header within the arena.
///
/// Offset 0 always holds the first block, which is why a stored link of
/// 0 can double as the end-of-list sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockOffset(pub usize);

impl BlockOffset {
    /// The raw byte offset.
    pub fn get(self) -> usize {
        self.0
    }

    /// The payload that starts `header_size` bytes after this header.
    pub fn payload(self, header_size: usize) -> Payload {
        Payload(self.0 + header_size)
    }
}

impl fmt::Display for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for BlockOffset {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Byte offset of an allocated payload within the arena.
///
/// This is what `allocate` hands out and what `release` takes back.
/// The header that describes it lives immediately before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Payload(pub usize);

impl Payload {
    /// The raw byte offset.
    pub fn get(self) -> usize {
        self.0
    }

    /// The header offset for this payload, or `None` if the payload sits
    /// closer to the arena start than one header.
    pub fn header(self, header_size: usize) -> Option<BlockOffset> {
        self.0.checked_sub(header_size).map(BlockOffset)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Payload {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
