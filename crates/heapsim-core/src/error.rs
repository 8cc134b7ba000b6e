//! Error types for the heapsim allocator.
//!
//! The baseline allocator contract is non-fatal: exhaustion and
//! zero-size requests come back as `None`, and null releases are
//! ignored. The enums here cover the remaining cases: configurations
//! rejected at construction, misuse detected by the hardened
//! `try_*` operations, and findings from the layout checker.

use std::error::Error;
use std::fmt;

use crate::id::{BlockOffset, Payload};

/// A heap configuration that cannot back a valid arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Alignment is zero or not a power of two.
    InvalidAlignment {
        /// The rejected alignment.
        alignment: usize,
    },
    /// Capacity is not a whole number of alignment units.
    UnalignedCapacity {
        /// Requested arena size in bytes.
        capacity: usize,
        /// Configured alignment.
        alignment: usize,
    },
    /// The arena cannot hold a single header plus one payload byte.
    CapacityTooSmall {
        /// Requested arena size in bytes.
        capacity: usize,
        /// Size of one block header under this configuration.
        header_size: usize,
    },
    /// The offset width cannot address every byte of the arena.
    CapacityExceedsOffsetWidth {
        /// Requested arena size in bytes.
        capacity: usize,
        /// Largest capacity the configured width can address.
        max_capacity: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAlignment { alignment } => {
                write!(f, "alignment {alignment} is not a non-zero power of two")
            }
            Self::UnalignedCapacity {
                capacity,
                alignment,
            } => {
                write!(
                    f,
                    "capacity {capacity} is not a multiple of alignment {alignment}"
                )
            }
            Self::CapacityTooSmall {
                capacity,
                header_size,
            } => {
                write!(
                    f,
                    "capacity {capacity} cannot hold a {header_size}-byte header and a payload"
                )
            }
            Self::CapacityExceedsOffsetWidth {
                capacity,
                max_capacity,
            } => {
                write!(
                    f,
                    "capacity {capacity} exceeds offset width limit of {max_capacity} bytes"
                )
            }
        }
    }
}

impl Error for ConfigError {}

/// Misuse reported by the hardened allocator operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The payload does not start any block in the arena.
    InvalidAddress {
        /// The payload that was passed in.
        payload: Payload,
    },
    /// The payload's block is already free.
    DoubleRelease {
        /// The payload that was passed in.
        payload: Payload,
    },
    /// A reference-count operation targeted a free block.
    NotAllocated {
        /// The payload that was passed in.
        payload: Payload,
    },
    /// The block's reference count is already at the header field's maximum.
    RefCountOverflow {
        /// The payload that was passed in.
        payload: Payload,
        /// Largest count the header can store.
        max: u64,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { payload } => {
                write!(f, "payload {payload} does not belong to any block")
            }
            Self::DoubleRelease { payload } => {
                write!(f, "payload {payload} was already released")
            }
            Self::NotAllocated { payload } => {
                write!(f, "payload {payload} is not allocated")
            }
            Self::RefCountOverflow { payload, max } => {
                write!(f, "payload {payload} already has {max} holders")
            }
        }
    }
}

impl Error for HeapError {}

/// A broken block-partition invariant found by [`check_layout`].
///
/// [`check_layout`]: crate::block::check_layout
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutViolation {
    /// Bytes between two blocks (or after the last one) belong to no block.
    Gap {
        /// First unclaimed byte.
        at: usize,
        /// Number of unclaimed bytes.
        len: usize,
    },
    /// A block starts inside the previous block's span.
    Overlap {
        /// The offending block.
        block: BlockOffset,
        /// Where the previous block ends.
        previous_end: usize,
    },
    /// Traversal visited a block at a lower offset than its predecessor.
    OutOfOrder {
        /// The offending block.
        block: BlockOffset,
        /// The predecessor's offset.
        previous: BlockOffset,
    },
    /// A block's span runs past the end of the arena.
    Overrun {
        /// The offending block.
        block: BlockOffset,
        /// Where the block claims to end.
        end: usize,
        /// Arena size in bytes.
        capacity: usize,
    },
    /// A block's `next` link does not point at the byte after its span.
    LinkMismatch {
        /// The offending block.
        block: BlockOffset,
        /// The stored link (`None` for the end-of-list sentinel).
        next: Option<BlockOffset>,
        /// Where the next header must begin.
        expected: usize,
    },
}

impl fmt::Display for LayoutViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gap { at, len } => write!(f, "{len} unclaimed bytes at offset {at}"),
            Self::Overlap {
                block,
                previous_end,
            } => {
                write!(
                    f,
                    "block {block} overlaps predecessor ending at {previous_end}"
                )
            }
            Self::OutOfOrder { block, previous } => {
                write!(f, "block {block} visited after block {previous}")
            }
            Self::Overrun {
                block,
                end,
                capacity,
            } => {
                write!(
                    f,
                    "block {block} ends at {end}, past arena capacity {capacity}"
                )
            }
            Self::LinkMismatch {
                block,
                next,
                expected,
            } => match next {
                Some(next) => write!(f, "block {block} links to {next}, expected {expected}"),
                None => write!(f, "block {block} ends the list, expected a block at {expected}"),
            },
        }
    }
}

impl Error for LayoutViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_values() {
        let err = ConfigError::CapacityExceedsOffsetWidth {
            capacity: 300,
            max_capacity: 256,
        };
        assert_eq!(
            err.to_string(),
            "capacity 300 exceeds offset width limit of 256 bytes"
        );
    }

    #[test]
    fn link_mismatch_mentions_sentinel() {
        let err = LayoutViolation::LinkMismatch {
            block: BlockOffset(0),
            next: None,
            expected: 40,
        };
        assert!(err.to_string().contains("ends the list"));
    }

    #[test]
    fn overflow_names_the_limit() {
        let err = HeapError::RefCountOverflow {
            payload: Payload(3),
            max: 255,
        };
        assert_eq!(err.to_string(), "payload 3 already has 255 holders");
    }
}
