//! The shared window record and its circular buffer algorithms.
//!
//! `WindowRecord` is the exact byte layout stored in the shared segment. It
//! holds only integers and indices, never pointers, so it is valid at whatever
//! address each process maps it. All methods here assume the caller holds the
//! window's lock; they perform no synchronization and no allocation except
//! for the `Vec` returned by `values`.
//!
//! Layout (`#[repr(C)]`, native endian):
//! - Offset 0x00: capacity (i32)
//! - Offset 0x04: length (i32)
//! - Offset 0x08: start (i32)
//! - Offset 0x0C: end (i32)
//! - Offset 0x10: data (`CAP_MAX` x i32)

use crate::CAP_MAX;

/// Fixed-size circular buffer header and storage.
#[repr(C)]
#[derive(Clone)]
pub struct WindowRecord {
    capacity: i32,
    length: i32,
    start: i32,
    end: i32,
    data: [i32; CAP_MAX],
}

/// `reject_matching` hit a match outside the removable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonMonotonic {
    /// Logical index of the offending sample.
    pub index: usize,
    /// Samples removed before the violation.
    pub removed: usize,
}

impl std::fmt::Debug for WindowRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRecord")
            .field("capacity", &self.capacity)
            .field("length", &self.length)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

impl WindowRecord {
    /// Create an empty record with the given capacity, or `None` if the
    /// capacity is outside `1..=CAP_MAX`.
    ///
    /// Outside shared memory this is only useful for tests and benchmarks.
    pub fn new(capacity: usize) -> Option<Self> {
        if !(1..=CAP_MAX).contains(&capacity) {
            return None;
        }
        let mut record = Self {
            capacity: 0,
            length: 0,
            start: 0,
            end: 0,
            data: [0; CAP_MAX],
        };
        record.initialize(capacity);
        Some(record)
    }

    /// Reset the counters and set a new capacity.
    ///
    /// The caller validates `capacity` against `1..=CAP_MAX`. Stale samples in
    /// `data` are left in place.
    pub(crate) fn initialize(&mut self, capacity: usize) {
        debug_assert!((1..=CAP_MAX).contains(&capacity));
        self.capacity = capacity as i32;
        self.clear();
    }

    /// Number of live samples.
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Whether the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Maximum number of samples.
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Physical index of the oldest sample.
    pub fn start(&self) -> usize {
        self.start as usize
    }

    /// Physical index the next push writes to.
    pub fn end(&self) -> usize {
        self.end as usize
    }

    /// Whether a process has ever initialized this record.
    ///
    /// A freshly created segment is zero-filled, so its capacity is 0.
    pub fn is_initialized(&self) -> bool {
        (1..=CAP_MAX as i32).contains(&self.capacity)
    }

    /// Check that every counter is within bounds so that indexing `data`
    /// cannot go out of range.
    ///
    /// This does not check `end == (start + length) % capacity`;
    /// `reject_matching` can leave that relation broken and the record is
    /// still safe to use.
    pub fn check_bounds(&self) -> Result<(), String> {
        if !self.is_initialized() {
            return Err(format!("capacity {} outside 1..={CAP_MAX}", self.capacity));
        }
        if !(0..=self.capacity).contains(&self.length) {
            return Err(format!(
                "length {} outside 0..={}",
                self.length, self.capacity
            ));
        }
        if !(0..self.capacity).contains(&self.start) {
            return Err(format!("start {} outside 0..{}", self.start, self.capacity));
        }
        if !(0..self.capacity).contains(&self.end) {
            return Err(format!("end {} outside 0..{}", self.end, self.capacity));
        }
        Ok(())
    }

    /// Most recent sample, or `None` on an empty window.
    pub fn last(&self) -> Option<i32> {
        if self.is_empty() {
            return None;
        }
        let index = (self.start() + self.len() - 1) % self.capacity();
        Some(self.data[index])
    }

    /// Live samples from oldest to newest.
    pub fn values(&self) -> Vec<i32> {
        let capacity = self.capacity();
        (0..self.len())
            .map(|i| self.data[(self.start() + i) % capacity])
            .collect()
    }

    /// Append a sample, evicting the oldest one if the window is full.
    pub fn push(&mut self, value: i32) {
        if self.length == self.capacity {
            self.length -= 1;
            self.start = (self.start + 1) % self.capacity;
        }

        self.data[self.end()] = value;
        self.length += 1;
        self.end = (self.end + 1) % self.capacity;
    }

    /// Drop all samples. Capacity and stale data are kept.
    pub fn clear(&mut self) {
        self.length = 0;
        self.start = 0;
        self.end = 0;
    }

    /// Remove the samples matching `predicate`, which must form a prefix of
    /// the window.
    ///
    /// Samples are visited in logical order. Logical index `i` is read from
    /// physical index `(start + i) % length`, with `start` and `length` taken
    /// at entry, and every accepted removal moves the live record forward with
    /// `start = (start + 1) % length; length -= 1`. Note the modulus is the
    /// length, not the capacity: this matches the historical on-segment
    /// behavior shared with other implementations and is kept as is, even
    /// though it only lines up with `values()` while fewer than half of the
    /// samples are removed from an unwrapped window.
    ///
    /// On the first match that is not at logical index `removed`, returns
    /// `NonMonotonic` with all earlier removals already applied.
    pub fn reject_matching<F>(&mut self, mut predicate: F) -> Result<usize, NonMonotonic>
    where
        F: FnMut(i32) -> bool,
    {
        let start = self.start();
        let length = self.len();

        let mut removed = 0;
        for i in 0..length {
            let value = self.data[(start + i) % length];
            if !predicate(value) {
                continue;
            }
            if removed != i {
                return Err(NonMonotonic { index: i, removed });
            }
            removed += 1;
            self.start = (self.start + 1) % self.length;
            self.length -= 1;
        }

        Ok(removed)
    }
}
