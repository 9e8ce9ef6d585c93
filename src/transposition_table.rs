use std::sync::{atomic::*, Arc};

/// Storage for search bounds, keyed by [`BitBoard::key`].
///
/// A value of 0 marks an empty slot, so the solver offsets every stored bound
/// away from 0. Lookups on an overwritten or missing slot return 0; a miss is
/// the expected common case and only costs pruning power, never correctness.
///
/// [`BitBoard::key`]: crate::bitboard::BitBoard::key
pub trait Table {
    fn get(&self, key: u64) -> u8;
    fn set(&mut self, key: u64, value: u8);
}

#[derive(Copy, Clone)]
struct Entry {
    key: u32,
    value: u8,
}

impl Entry {
    fn new() -> Self {
        Self { key: 0, value: 0 }
    }
}

// prime, so the truncated keys spread over the slots
pub(crate) const TABLE_MAX_SIZE: usize = (1 << 23) + 9;

/// A single-threaded fixed-size table with overwrite-on-collision.
///
/// Bounded memory and O(1) access are bought with inexactness: a colliding
/// store silently evicts the previous entry, and only the low 32 key bits are
/// kept for verification.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Entry>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::new(); TABLE_MAX_SIZE],
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for TranspositionTable {
    fn set(&mut self, key: u64, value: u8) {
        let len = self.entries.len();
        self.entries[key as usize % len] = Entry {
            key: key as u32,
            value,
        };
    }

    fn get(&self, key: u64) -> u8 {
        let entry = self.entries[key as usize % self.entries.len()];
        if entry.key == key as u32 {
            entry.value
        } else {
            0
        }
    }
}

struct SharedEntry {
    key: AtomicU32,
    value: AtomicU8,
}

impl SharedEntry {
    fn new() -> Self {
        Self {
            key: AtomicU32::new(0),
            value: AtomicU8::new(0),
        }
    }
}

/// A lock-free table shared between worker threads.
///
/// Stores are two relaxed atomic writes; the key slot holds `key ^ value` so
/// a read that races a write fails verification and reads as a miss instead
/// of returning a bound for the wrong position.
#[derive(Clone)]
pub struct SharedTranspositionTable {
    entries: Arc<Vec<SharedEntry>>,
}

impl SharedTranspositionTable {
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(TABLE_MAX_SIZE);
        for _ in 0..TABLE_MAX_SIZE {
            entries.push(SharedEntry::new());
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl Default for SharedTranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for SharedTranspositionTable {
    fn set(&mut self, key: u64, value: u8) {
        let entry = &self.entries[key as usize % self.entries.len()];
        entry.key.store(key as u32 ^ value as u32, Ordering::Relaxed);
        entry.value.store(value, Ordering::Relaxed);
    }

    fn get(&self, key: u64) -> u8 {
        let entry = &self.entries[key as usize % self.entries.len()];
        let value = entry.value.load(Ordering::Relaxed);
        if entry.key.load(Ordering::Relaxed) == key as u32 ^ value as u32 {
            value
        } else {
            0
        }
    }
}
