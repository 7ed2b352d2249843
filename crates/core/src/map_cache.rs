//! The process-wide Map lookup cache.
//!
//! A fixed-size, pointer-keyed cache recording the last-seen sorted
//! index for an exact `(map, key)` pointer pair. It is a pure
//! optimization: a miss just falls back to binary search, and the
//! whole table is invalidated at the start of every GC cycle because
//! its entries hold non-owning pointers that sweep may free.

use crate::limits::MAP_CACHE_SIZE;
use crate::zref::ZRef;

#[derive(Clone, Copy)]
struct Entry {
    map_ptr: usize,
    key_ptr: usize,
    index: usize,
}

pub struct MapCache {
    slots: Vec<Option<Entry>>,
}

fn addr(z: ZRef) -> usize {
    z.addr()
}

impl MapCache {
    pub fn new() -> Self {
        MapCache {
            slots: vec![None; MAP_CACHE_SIZE],
        }
    }

    fn slot_for(&self, map_ptr: usize, key_ptr: usize) -> usize {
        (map_ptr ^ key_ptr) % self.slots.len()
    }

    pub fn get(&self, map: ZRef, key: ZRef) -> Option<usize> {
        let m = addr(map);
        let k = addr(key);
        let slot = self.slot_for(m, k);
        match self.slots[slot] {
            Some(e) if e.map_ptr == m && e.key_ptr == k => Some(e.index),
            _ => None,
        }
    }

    pub fn put(&mut self, map: ZRef, key: ZRef, index: usize) {
        let m = addr(map);
        let k = addr(key);
        let slot = self.slot_for(m, k);
        self.slots[slot] = Some(Entry {
            map_ptr: m,
            key_ptr: k,
            index,
        });
    }

    /// Invalidated wholesale at the start of every GC cycle.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}

impl Default for MapCache {
    fn default() -> Self {
        Self::new()
    }
}
