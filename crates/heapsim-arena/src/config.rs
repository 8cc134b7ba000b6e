//! Heap configuration parameters.

use heapsim_core::ConfigError;

/// Integer width used for the `size`, `next` and `ref_count` header fields.
///
/// The narrow widths model offset addressing: every link is a byte
/// offset into the arena, so the arena can be no larger than the width
/// can address. [`OffsetWidth::Native`] uses the platform word and has
/// no practical ceiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OffsetWidth {
    /// One byte per field (arenas up to 256 bytes).
    U8,
    /// Two bytes per field (arenas up to 64 KiB).
    U16,
    /// Four bytes per field (arenas up to 4 GiB).
    U32,
    /// `usize` per field.
    #[default]
    Native,
}

impl OffsetWidth {
    /// Bytes occupied by one field of this width.
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::Native => std::mem::size_of::<usize>(),
        }
    }

    /// Largest value a field of this width can hold.
    pub const fn max_value(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::Native => usize::MAX as u64,
        }
    }

    /// Smallest width able to address an arena of `capacity` bytes.
    pub fn for_capacity(capacity: usize) -> Self {
        let last = capacity.saturating_sub(1) as u64;
        [Self::U8, Self::U16, Self::U32]
            .into_iter()
            .find(|w| last <= w.max_value())
            .unwrap_or(Self::Native)
    }
}

/// How `allocate` picks among free blocks that are large enough.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FitPolicy {
    /// The first adequate block in arena order.
    #[default]
    FirstFit,
    /// The smallest adequate block; ties go to the lowest offset.
    BestFit,
}

/// How much merging `release` performs on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoalescePolicy {
    /// Merge with the following block only, one step.
    ///
    /// A free predecessor is left alone; `coalesce_all` picks it up.
    #[default]
    Forward,
    /// Merge with the following block, then with a free predecessor.
    Bidirectional,
}

/// Configuration for one heap.
///
/// Validated at construction; the arena never grows afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena size in bytes, headers included.
    pub capacity: usize,

    /// Request sizes and header sizes are rounded up to this boundary.
    ///
    /// Must be a power of two. `1` disables rounding.
    pub alignment: usize,

    /// Width of the integer header fields.
    pub offset_width: OffsetWidth,

    /// Whether headers carry a holder count for the reference-counted layer.
    pub ref_counting: bool,

    /// Block selection policy.
    pub fit: FitPolicy,

    /// Merge behaviour on release.
    pub coalesce: CoalescePolicy,
}

impl HeapConfig {
    /// Default arena size in bytes.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Default payload alignment.
    pub const DEFAULT_ALIGNMENT: usize = 8;

    /// Size of the flags byte in every header.
    const FLAGS_BYTES: usize = 1;

    /// Create a config for an arena of `capacity` bytes.
    ///
    /// Uses word-width links, 8-byte alignment, first-fit and
    /// forward-only coalescing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            alignment: Self::DEFAULT_ALIGNMENT,
            offset_width: OffsetWidth::Native,
            ref_counting: false,
            fit: FitPolicy::FirstFit,
            coalesce: CoalescePolicy::Forward,
        }
    }

    /// A byte-addressed layout for small arenas: the narrowest width that
    /// fits `capacity` and no alignment padding.
    pub fn compact(capacity: usize) -> Self {
        Self::new(capacity)
            .with_alignment(1)
            .with_offset_width(OffsetWidth::for_capacity(capacity))
    }

    /// Set the alignment boundary.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the header field width.
    pub fn with_offset_width(mut self, width: OffsetWidth) -> Self {
        self.offset_width = width;
        self
    }

    /// Enable or disable holder counts in headers.
    pub fn with_ref_counting(mut self, enabled: bool) -> Self {
        self.ref_counting = enabled;
        self
    }

    /// Set the block selection policy.
    pub fn with_fit(mut self, fit: FitPolicy) -> Self {
        self.fit = fit;
        self
    }

    /// Set the release-time merge policy.
    pub fn with_coalesce(mut self, coalesce: CoalescePolicy) -> Self {
        self.coalesce = coalesce;
        self
    }

    /// Bytes occupied by one header before alignment padding.
    pub fn raw_header_size(&self) -> usize {
        let fields = if self.ref_counting { 3 } else { 2 };
        fields * self.offset_width.bytes() + Self::FLAGS_BYTES
    }

    /// Bytes occupied by one header, padded so payloads stay aligned.
    ///
    /// Only meaningful once [`validate`](Self::validate) has accepted the
    /// alignment.
    pub fn header_size(&self) -> usize {
        align_up(self.raw_header_size(), self.alignment.max(1)).unwrap_or(usize::MAX)
    }

    /// Check that this configuration can back an arena.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alignment == 0 || !self.alignment.is_power_of_two() {
            return Err(ConfigError::InvalidAlignment {
                alignment: self.alignment,
            });
        }
        if self.capacity % self.alignment != 0 {
            return Err(ConfigError::UnalignedCapacity {
                capacity: self.capacity,
                alignment: self.alignment,
            });
        }
        let header_size = self.header_size();
        if self.capacity <= header_size {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                header_size,
            });
        }
        let max = self.offset_width.max_value();
        if (self.capacity - 1) as u64 > max {
            return Err(ConfigError::CapacityExceedsOffsetWidth {
                capacity: self.capacity,
                max_capacity: max.saturating_add(1),
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
///
/// Returns `None` on overflow.
pub fn align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    value
        .checked_add(alignment - 1)
        .map(|v| v & !(alignment - 1))
}
