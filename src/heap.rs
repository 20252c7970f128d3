use crate::error::{HuffmanError, Result};

/// One slot per possible byte value.
pub const HEAP_CAPACITY: usize = 256;

pub trait Weighted {
    fn weight(&self) -> u64;
}

impl<T: Weighted + ?Sized> Weighted for Box<T> {
    fn weight(&self) -> u64 {
        (**self).weight()
    }
}

struct HeapEntry<T> {
    weight: u64,
    seq: u64,
    item: T,
}

impl<T> HeapEntry<T> {
    // Equal weights fall back to push order, so pops are reproducible.
    fn precedes(&self, other: &Self) -> bool {
        (self.weight, self.seq) < (other.weight, other.seq)
    }
}

/// Bounded array-backed binary min-heap keyed on [`Weighted::weight`].
///
/// Ties between equal weights are resolved by insertion order: whatever was
/// pushed first pops first.
pub struct MinHeap<T> {
    entries: Vec<HeapEntry<T>>,
    capacity: usize,
    next_seq: u64,
}

impl<T: Weighted> MinHeap<T> {
    pub fn new() -> Self {
        Self::with_capacity(HEAP_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MinHeap {
            entries: Vec::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(HuffmanError::HeapOverflow {
                capacity: self.capacity,
            });
        }
        let entry = HeapEntry {
            weight: item.weight(),
            seq: self.next_seq,
            item,
        };
        self.next_seq += 1;
        self.entries.push(entry);
        self.sift_up(self.entries.len() - 1);
        Ok(())
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.first().map(|e| &e.item)
    }

    pub fn pop(&mut self) -> Result<T> {
        if self.entries.is_empty() {
            return Err(HuffmanError::HeapUnderflow);
        }
        let root = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Ok(root.item)
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.entries[i].precedes(&self.entries[parent]) {
                break;
            }
            self.entries.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < n && self.entries[left].precedes(&self.entries[smallest]) {
                smallest = left;
            }
            if right < n && self.entries[right].precedes(&self.entries[smallest]) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.entries.swap(i, smallest);
            i = smallest;
        }
    }
}

impl<T: Weighted> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}
