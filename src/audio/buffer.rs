//! Fixed-capacity circular FIFO used for every queue on the real-time path.
//!
//! All storage is allocated once in [`RingBuffer::new`]; pushing and popping
//! only move indices, so the audio callback never reallocates.  Two overflow
//! policies are offered:
//!
//! * [`push_back`](RingBuffer::push_back) refuses the item when full and hands
//!   it back to the caller.
//! * [`push_overwrite`](RingBuffer::push_overwrite) evicts the oldest item to
//!   make room, which is how the output queue caps its latency.
//!
//! # Example
//!
//! ```rust
//! use live_denoise::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(2);
//! buf.push_back(1).unwrap();
//! buf.push_back(2).unwrap();
//! assert_eq!(buf.push_back(3), Err(3));          // full → rejected
//! assert_eq!(buf.push_overwrite(3), Some(1));    // full → oldest evicted
//! assert_eq!(buf.pop_front(), Some(2));
//! assert_eq!(buf.pop_front(), Some(3));
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity first-in first-out queue.
///
/// Items are kept in `Option` slots so the buffer can hold owned values such
/// as [`AudioFrame`](crate::audio::AudioFrame) without requiring `Copy`.
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    /// Index of the oldest item.
    head: usize,
    /// Number of occupied slots (≤ capacity).
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    fn tail(&self) -> usize {
        (self.head + self.len) % self.slots.len()
    }

    /// Append `item` at the back.  Returns `Err(item)` when the buffer is full.
    pub fn push_back(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let tail = self.tail();
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Append `item`, evicting and returning the oldest item when full.
    pub fn push_overwrite(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.pop_front() } else { None };
        let tail = self.tail();
        self.slots[tail] = Some(item);
        self.len += 1;
        evicted
    }

    /// Remove and return the oldest item.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        item
    }

    /// Borrow the oldest item.
    pub fn front(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Mutably borrow the newest item.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.len - 1) % self.slots.len();
        self.slots[idx].as_mut()
    }

    /// Iterate from oldest to newest without removing anything.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let cap = self.slots.len();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % cap].as_ref())
    }

    /// Drop every item and reset the indices.  Capacity is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    /// Number of items currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer holds no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of items the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when the next [`push_back`](Self::push_back) would fail.
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
