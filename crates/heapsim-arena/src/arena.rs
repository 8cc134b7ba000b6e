//! Fixed-capacity byte storage.
//!
//! An [`Arena`] is a pre-allocated, zero-initialised byte buffer. It has
//! no structure of its own: block headers and payloads are laid out in
//! it by the heap, which addresses it purely by byte offset.

use std::ops::Range;

/// Contiguous backing storage for one heap.
///
/// The buffer is allocated once at its final size and never resized.
pub struct Arena {
    data: Box<[u8]>,
}

impl Arena {
    /// Create an arena of `capacity` zeroed bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Total size in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read a little-endian unsigned integer of `width` bytes (at most 8).
    ///
    /// # Panics
    ///
    /// Panics if `offset + width` exceeds the capacity.
    pub fn read_uint(&self, offset: usize, width: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&self.data[offset..offset + width]);
        u64::from_le_bytes(buf)
    }

    /// Write the low `width` bytes of `value` in little-endian order.
    ///
    /// # Panics
    ///
    /// Panics if `offset + width` exceeds the capacity.
    pub fn write_uint(&mut self, offset: usize, width: usize, value: u64) {
        let bytes = value.to_le_bytes();
        self.data[offset..offset + width].copy_from_slice(&bytes[..width]);
    }

    /// Read a single byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of range.
    pub fn byte(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    /// Overwrite a single byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of range.
    pub fn set_byte(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    /// Shared view of a byte range, or `None` if it is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<&[u8]> {
        self.data.get(range)
    }

    /// Mutable view of a byte range, or `None` if it is out of bounds.
    pub fn slice_mut(&mut self, range: Range<usize>) -> Option<&mut [u8]> {
        self.data.get_mut(range)
    }
}
