// File: src/table.rs
//
// Open-addressed hash table keyed by interned string handles, used for
// both `Vm::globals` (name -> Value) and `Vm::strings` (the interning
// table, presence-only). Linear probing, tombstones on delete, 0.75
// load-factor growth from an initial capacity of 8 -- the same
// discipline the original's `table.c` uses, reinterpreted with a
// `Slot` enum instead of a sentinel (key == NULL) pair so "empty" and
// "tombstone" can't be confused by accident.

use crate::object::{fnv1a_hash, Heap, StringHandle};
use crate::value::Value;

const INITIAL_CAPACITY: usize = 8;
const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(StringHandle, Value),
}

#[derive(Debug)]
pub struct Table {
    entries: Vec<Slot>,
    // Occupied slots plus tombstones created since the last grow; only
    // exactly equal to the live entry count right after `grow` rebuilds
    // it. Counting tombstones here (not decrementing on delete) is what
    // forces a resize before a probe-heavy table fills up with dead
    // entries, matching the original's `table.c`.
    count: usize,
}

impl Table {
    pub fn new() -> Self {
        Self { entries: Vec::new(), count: 0 }
    }

    /// Number of occupied-or-tombstoned slots. Equals the live entry
    /// count only when no keys have been deleted since the last grow.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Insert or overwrite. Returns `true` iff `key` was not already
    /// present (a tombstone slot being reused does not count as new).
    pub fn set(&mut self, heap: &Heap, key: StringHandle, value: Value) -> bool {
        if self.capacity() == 0
            || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD_FACTOR
        {
            self.grow(heap);
        }

        let hash = heap.get(key).hash;
        let index = self.find_slot_index(key, hash);
        let is_new = !matches!(self.entries[index], Slot::Occupied(_, _));
        if is_new && matches!(self.entries[index], Slot::Empty) {
            self.count += 1;
        }
        self.entries[index] = Slot::Occupied(key, value);
        is_new
    }

    pub fn get(&self, heap: &Heap, key: StringHandle) -> Option<&Value> {
        if self.capacity() == 0 {
            return None;
        }
        let hash = heap.get(key).hash;
        let index = self.find_slot_index(key, hash);
        match &self.entries[index] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    /// Converts the slot to a tombstone. Returns `true` iff `key` was
    /// present.
    pub fn delete(&mut self, heap: &Heap, key: StringHandle) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let hash = heap.get(key).hash;
        let index = self.find_slot_index(key, hash);
        if matches!(self.entries[index], Slot::Occupied(_, _)) {
            self.entries[index] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    /// Probe for `key` (already interned, so handle equality suffices)
    /// starting at `hash % capacity`, advancing linearly and skipping
    /// tombstones without terminating on them.
    fn find_slot_index(&self, key: StringHandle, hash: u32) -> usize {
        let capacity = self.capacity();
        let mut index = (hash as usize) % capacity;
        let mut first_tombstone: Option<usize> = None;
        loop {
            match &self.entries[index] {
                Slot::Empty => {
                    return first_tombstone.unwrap_or(index);
                }
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) => {
                    // Handles are interned, so identity already implies
                    // content equality -- no byte comparison needed here.
                    if *k == key {
                        return index;
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    /// Content-based probe used only while interning, before a handle
    /// for `bytes` exists. Mirrors `tableFindString`: match on
    /// length + hash + byte content, never terminating on a tombstone.
    pub fn find_string(&self, heap: &Heap, bytes: &[u8], hash: u32) -> Option<StringHandle> {
        if self.capacity() == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) % capacity;
        loop {
            match &self.entries[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(key, _) => {
                    let obj = heap.get(*key);
                    if obj.hash == hash && obj.as_bytes() == bytes {
                        return Some(*key);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self, heap: &Heap) {
        let new_capacity = if self.capacity() == 0 { INITIAL_CAPACITY } else { self.capacity() * 2 };
        let old_entries = std::mem::replace(&mut self.entries, (0..new_capacity).map(|_| Slot::Empty).collect());
        self.count = 0;
        for slot in old_entries {
            if let Slot::Occupied(key, value) = slot {
                let hash = heap.get(key).hash;
                let index = self.find_slot_index(key, hash);
                self.entries[index] = Slot::Occupied(key, value);
                self.count += 1;
            }
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
