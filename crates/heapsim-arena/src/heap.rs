//! The allocator core: initialize, allocate, release and coalesce.
//!
//! A [`Heap`] owns one [`Arena`] and lays a singly-linked block list over
//! it. The list is anchored at offset 0 and always visits blocks in
//! ascending arena order, so the blocks on either side of a list link
//! are physically adjacent and can be merged by arithmetic alone.
//!
//! ```text
//! offset 0                                                   capacity
//! +-----+---------+-----+-------------+-----+-------------------+
//! | hdr | payload | hdr |   payload   | hdr |   free payload    |
//! +-----+---------+-----+-------------+-----+-------------------+
//!    |              ^ |                 ^ |
//!    +--- next -----+ +---- next -------+ +--> 0 (end of list)
//! ```
//!
//! Links are validated integer offsets, never references into the
//! buffer: every header access goes through `HeaderLayout` with bounds
//! checks, and a link that does not point strictly forward ends the walk.

use heapsim_core::{BlockAllocator, BlockOffset, ConfigError, HeapError, Payload};
use log::{debug, info, trace, warn};

use crate::arena::Arena;
use crate::config::{align_up, CoalescePolicy, FitPolicy, HeapConfig};
use crate::header::{BlockHeader, HeaderLayout};

/// A fixed-capacity heap with an embedded first-fit free list.
///
/// Single-owner and synchronous: every operation runs to completion in
/// time linear in the number of blocks. Share it across threads only
/// behind a lock that covers the whole heap.
pub struct Heap {
    arena: Arena,
    layout: HeaderLayout,
    config: HeapConfig,
    /// Anchor of the block list.
    head: BlockOffset,
}

/// A block found by [`Heap::locate`], with its list predecessor.
pub(crate) struct Located {
    pub(crate) at: BlockOffset,
    pub(crate) header: BlockHeader,
    pub(crate) previous: Option<(BlockOffset, BlockHeader)>,
}

impl Heap {
    /// Build and initialize a heap.
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut heap = Self {
            arena: Arena::new(config.capacity),
            layout: HeaderLayout::new(&config),
            config,
            head: BlockOffset(0),
        };
        heap.initialize();
        Ok(heap)
    }

    /// Build a heap of `capacity` bytes with the default configuration.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(HeapConfig::new(capacity))
    }

    /// Reset to a single free block spanning the arena.
    ///
    /// Discards every outstanding allocation. Payload bytes are left as
    /// they were.
    pub fn initialize(&mut self) {
        self.head = BlockOffset(0);
        let size = self.capacity() - self.header_size();
        self.write(self.head, &BlockHeader::free(size, None));
        info!(
            "heap initialized: {} bytes, {}-byte headers, {size} bytes free",
            self.capacity(),
            self.header_size()
        );
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Arena size in bytes.
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Bytes occupied by one block header.
    pub fn header_size(&self) -> usize {
        self.layout.size()
    }

    /// Raw arena contents, headers included.
    pub fn as_bytes(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    /// Hand out a payload of at least `size` usable bytes.
    ///
    /// The request is rounded up to the configured alignment and served
    /// from the block chosen by the fit policy. If that block exceeds the
    /// request by more than one header, the excess is split off as a new
    /// free block; otherwise the whole block is handed out.
    ///
    /// Returns `None` for a zero-byte request or when nothing fits.
    pub fn allocate(&mut self, size: usize) -> Option<Payload> {
        if size == 0 {
            debug!("refused zero-byte allocation");
            return None;
        }
        let Some(size) = align_up(size, self.config.alignment) else {
            debug!("refused allocation of {size} bytes: overflows alignment");
            return None;
        };
        let Some((at, mut header)) = self.find_fit(size) else {
            debug!(
                "no free block fits {size} bytes (largest free: {})",
                self.stats().largest_free
            );
            return None;
        };

        let header_size = self.header_size();
        let remaining = header.size - size;
        if remaining > header_size {
            let split_at = BlockOffset(at.get() + header_size + size);
            let split_size = remaining - header_size;
            self.write(split_at, &BlockHeader::free(split_size, header.next));
            header.next = Some(split_at);
            header.size = size;
            debug!("split block {at}: {split_size} bytes stay free at {split_at}");
        }

        header.is_free = false;
        header.ref_count = 1;
        self.write(at, &header);

        let payload = at.payload(header_size);
        trace!("allocated {} bytes at payload {payload}", header.size);
        Some(payload)
    }

    /// Return a payload to the free list.
    ///
    /// `None` is a no-op. Payloads that do not start an allocated block
    /// are ignored with a warning; see [`try_release`](Self::try_release)
    /// for the checked form.
    pub fn release(&mut self, payload: impl Into<Option<Payload>>) {
        let Some(payload) = payload.into() else {
            return;
        };
        if let Err(err) = self.try_release(payload) {
            warn!("ignored release: {err}");
        }
    }

    /// Return a payload to the free list, reporting misuse.
    ///
    /// After marking the block free, merges it with the following block
    /// if that one is free too. Under [`CoalescePolicy::Bidirectional`]
    /// a free predecessor then absorbs the result.
    pub fn try_release(&mut self, payload: Payload) -> Result<(), HeapError> {
        let found = self.locate(payload)?;
        if found.header.is_free {
            return Err(HeapError::DoubleRelease { payload });
        }

        let mut header = found.header;
        header.is_free = true;
        header.ref_count = 0;
        self.write(found.at, &header);
        trace!("released {} bytes at payload {payload}", header.size);

        self.merge_forward(found.at);
        if self.config.coalesce == CoalescePolicy::Bidirectional {
            if let Some((previous, previous_header)) = found.previous {
                if previous_header.is_free {
                    self.merge_forward(previous);
                }
            }
        }
        Ok(())
    }

    /// Merge every run of adjacent free blocks in one pass.
    ///
    /// At each free block the forward merge is repeated until the
    /// neighbour is allocated or the list ends. Returns the number of
    /// merges performed.
    pub fn coalesce_all(&mut self) -> usize {
        let mut merges = 0;
        let mut cursor = Some(self.head);
        while let Some(at) = cursor {
            let header = self.read(at);
            if header.is_free && self.merge_forward(at) {
                merges += 1;
                continue;
            }
            cursor = self.successor(at, &header);
        }
        if merges > 0 {
            debug!("full sweep performed {merges} merges");
        }
        merges
    }

    /// Bytes of an allocated payload, or `None` if it is not allocated.
    pub fn payload(&self, payload: Payload) -> Option<&[u8]> {
        let size = self.size_of(payload)?;
        self.arena.slice(payload.get()..payload.get() + size)
    }

    /// Mutable bytes of an allocated payload, or `None` if it is not
    /// allocated.
    pub fn payload_mut(&mut self, payload: Payload) -> Option<&mut [u8]> {
        let size = self.size_of(payload)?;
        self.arena.slice_mut(payload.get()..payload.get() + size)
    }

    /// Usable size of an allocated payload. May exceed the requested size
    /// when alignment or an unsplit block rounded it up.
    pub fn size_of(&self, payload: Payload) -> Option<usize> {
        let found = self.locate(payload).ok()?;
        (!found.header.is_free).then_some(found.header.size)
    }

    pub(crate) fn read(&self, at: BlockOffset) -> BlockHeader {
        self.layout.read(&self.arena, at)
    }

    pub(crate) fn write(&mut self, at: BlockOffset, header: &BlockHeader) {
        self.layout.write(&mut self.arena, at, header);
    }

    pub(crate) fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    pub(crate) fn head(&self) -> BlockOffset {
        self.head
    }

    /// The block after `at`, or `None` at the end of the list or on a
    /// link that does not point strictly forward to a whole header.
    pub(crate) fn successor(&self, at: BlockOffset, header: &BlockHeader) -> Option<BlockOffset> {
        let next = header.next?;
        let limit = self.capacity() - self.header_size();
        if next > at && next.get() <= limit {
            Some(next)
        } else {
            warn!("block {at} has invalid link {next}; ending traversal");
            None
        }
    }

    /// Find the block whose payload starts at `payload`.
    pub(crate) fn locate(&self, payload: Payload) -> Result<Located, HeapError> {
        let target = payload
            .header(self.header_size())
            .ok_or(HeapError::InvalidAddress { payload })?;
        let mut previous = None;
        for (at, header) in self.walk() {
            if at == target {
                return Ok(Located {
                    at,
                    header,
                    previous,
                });
            }
            if at > target {
                break;
            }
            previous = Some((at, header));
        }
        Err(HeapError::InvalidAddress { payload })
    }

    fn find_fit(&self, size: usize) -> Option<(BlockOffset, BlockHeader)> {
        let mut candidates = self
            .walk()
            .filter(|(_, header)| header.is_free && header.size >= size);
        match self.config.fit {
            FitPolicy::FirstFit => candidates.next(),
            FitPolicy::BestFit => candidates.min_by_key(|(_, header)| header.size),
        }
    }

    /// Absorb the block after `at` if it is free. `at` must be free.
    fn merge_forward(&mut self, at: BlockOffset) -> bool {
        let mut header = self.read(at);
        let Some(next) = self.successor(at, &header) else {
            return false;
        };
        let neighbour = self.read(next);
        if !neighbour.is_free {
            return false;
        }
        header.size += self.header_size() + neighbour.size;
        header.next = neighbour.next;
        self.write(at, &header);
        debug!("coalesced block {next} into {at}: {} bytes free", header.size);
        true
    }

    pub(crate) fn walk(&self) -> Walk<'_> {
        Walk {
            heap: self,
            cursor: Some(self.head),
        }
    }
}

/// Raw header traversal in list order.
pub(crate) struct Walk<'a> {
    heap: &'a Heap,
    cursor: Option<BlockOffset>,
}

impl Iterator for Walk<'_> {
    type Item = (BlockOffset, BlockHeader);

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.cursor?;
        let header = self.heap.read(at);
        self.cursor = self.heap.successor(at, &header);
        Some((at, header))
    }
}

impl BlockAllocator for Heap {
    fn allocate(&mut self, size: usize) -> Option<Payload> {
        Heap::allocate(self, size)
    }

    fn release(&mut self, payload: Option<Payload>) {
        Heap::release(self, payload);
    }

    fn coalesce_all(&mut self) -> usize {
        Heap::coalesce_all(self)
    }
}
