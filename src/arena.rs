//! Bump allocator for per-element scratch buffers.
use num::Zero;
use std::ops::Range;

/// A contiguous region handed out by [`MemoryArena::allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaSlice {
    range: Range<usize>,
}

impl ArenaSlice {
    pub fn offset(&self) -> usize {
        self.range.start
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Position in the arena returned by [`MemoryArena::mark`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Marker(usize);

impl Marker {
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// A fixed-capacity bump allocator.
///
/// Allocations are ranges into a single buffer. Nothing is freed individually: callers either
/// [`rewind`](Self::rewind) to a previously taken [`Marker`] or [`reset`](Self::reset) the
/// whole arena.
#[derive(Debug, Clone)]
pub struct MemoryArena<T> {
    buffer: Vec<T>,
    offset: usize,
}

impl<T: Copy + Zero> MemoryArena<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![T::zero(); capacity],
            offset: 0,
        }
    }

    /// Grows the buffer to hold at least `capacity` entries.
    ///
    /// Panics if any allocation is outstanding.
    pub fn reserve(&mut self, capacity: usize) {
        assert_eq!(self.offset, 0, "cannot grow an arena with live allocations");
        if capacity > self.buffer.len() {
            self.buffer.resize(capacity, T::zero());
        }
    }

    /// Allocates `n` zeroed entries.
    ///
    /// Panics if the arena does not have room for `n` more entries.
    pub fn allocate(&mut self, n: usize) -> ArenaSlice {
        let start = self.offset;
        let end = start + n;
        assert!(
            end <= self.buffer.len(),
            "arena exhausted: requested {} entries with {} of {} in use",
            n,
            self.offset,
            self.buffer.len()
        );
        self.buffer[start..end].fill(T::zero());
        self.offset = end;
        ArenaSlice { range: start..end }
    }
}

impl<T> MemoryArena<T> {
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn used(&self) -> usize {
        self.offset
    }

    pub fn mark(&self) -> Marker {
        Marker(self.offset)
    }

    /// Releases everything allocated after `marker` was taken.
    pub fn rewind(&mut self, marker: Marker) {
        assert!(marker.0 <= self.offset, "cannot rewind forward");
        self.offset = marker.0;
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn slice(&self, slice: &ArenaSlice) -> &[T] {
        &self.buffer[slice.range.clone()]
    }

    pub fn slice_mut(&mut self, slice: &ArenaSlice) -> &mut [T] {
        &mut self.buffer[slice.range.clone()]
    }

    /// Borrows several allocations mutably at once.
    ///
    /// The slices must be given in allocation order.
    pub fn slices_mut<const K: usize>(&mut self, slices: [&ArenaSlice; K]) -> [&mut [T]; K] {
        let mut rest: &mut [T] = &mut self.buffer[..];
        let mut consumed = 0;
        std::array::from_fn(|i| {
            let range = &slices[i].range;
            assert!(range.start >= consumed, "arena slices must be disjoint and in allocation order");
            let tail = std::mem::take(&mut rest);
            let (_, tail) = tail.split_at_mut(range.start - consumed);
            let (head, tail) = tail.split_at_mut(range.len());
            rest = tail;
            consumed = range.end;
            head
        })
    }
}
