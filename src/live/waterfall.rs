//! Waterfall history
//!
//! Fixed-capacity FIFO of spectrum rows. Once full, each new row evicts the
//! oldest one, like a `deque(maxlen=N)` that never reallocates.

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

use crate::domain::{ScanError, ScanResult};

pub struct Waterfall {
    rows: HeapRb<Vec<f32>>,
}

impl Waterfall {
    pub fn new(capacity: usize) -> ScanResult<Self> {
        if capacity == 0 {
            return Err(ScanError::Config("waterfall needs at least one row".into()));
        }
        Ok(Self {
            rows: HeapRb::new(capacity),
        })
    }

    /// Append the newest row, returning the row it evicted when full
    pub fn push(&mut self, row: Vec<f32>) -> Option<Vec<f32>> {
        self.rows.push_overwrite(row)
    }

    pub fn len(&self) -> usize {
        self.rows.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.occupied_len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.rows.capacity().get()
    }

    /// Copy of the history, newest row first
    pub fn newest_first(&self) -> Vec<Vec<f32>> {
        let mut rows: Vec<Vec<f32>> = self.rows.iter().cloned().collect();
        rows.reverse();
        rows
    }

    pub fn clear(&mut self) {
        self.rows = HeapRb::new(self.capacity());
    }
}
