//! Open-addressing hash table keyed by [`Value`].
//!
//! Used for globals, string interning, instance fields, class methods,
//! dictionary contents, module exports and enum members.
//!
//! Keys are compared by value identity: numbers by IEEE equality, strings
//! by handle (they are interned), other objects by handle. Each entry keeps
//! the key's hash so the table can grow without consulting the heap.
//!
//! A slot whose key is [`Value::Empty`] is either never used (value `Nil`)
//! or a tombstone (value `true`). Tombstones keep probe sequences intact
//! and count toward the load factor until the next resize.

use core_types::{ObjRef, Value};

/// Maximum load factor, as a fraction
const MAX_LOAD_NUMERATOR: usize = 3;
const MAX_LOAD_DENOMINATOR: usize = 4;

/// Smallest non-zero capacity
const MIN_CAPACITY: usize = 8;

/// A key together with its precomputed hash
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableKey {
    /// The key value
    pub value: Value,
    /// Its hash
    pub hash: u32,
}

impl TableKey {
    /// Pair a value with its hash
    pub fn new(value: Value, hash: u32) -> Self {
        Self { value, hash }
    }
}

/// One table slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Key, or `Empty` for unused and deleted slots
    pub key: Value,
    /// Cached hash of the key
    pub hash: u32,
    /// Stored value; `true` marks a tombstone when the key is `Empty`
    pub value: Value,
}

impl Entry {
    const UNUSED: Entry = Entry {
        key: Value::Empty,
        hash: 0,
        value: Value::Nil,
    };

    fn is_live(&self) -> bool {
        !self.key.is_empty()
    }

    fn is_tombstone(&self) -> bool {
        self.key.is_empty() && !self.value.is_nil()
    }
}

/// Open-addressing hash map with linear probing
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<Entry>,
    /// Live entries plus tombstones
    occupied: usize,
    /// Live entries only
    len: usize,
}

impl Table {
    /// Create an empty table; no storage is allocated until the first insert
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no live entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Bytes held by the slot array
    pub fn allocated_bytes(&self) -> usize {
        self.entries.capacity() * std::mem::size_of::<Entry>()
    }

    /// Probe for `key`.
    ///
    /// Returns the slot holding the key, or the slot an insert should use:
    /// the first tombstone passed, else the unused slot that ended the probe.
    fn find_slot(entries: &[Entry], key: Value, hash: u32) -> usize {
        let mask = entries.len() - 1;
        let mut index = hash as usize & mask;
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            if entry.key.is_empty() {
                if entry.value.is_nil() {
                    return tombstone.unwrap_or(index);
                }
                if tombstone.is_none() {
                    tombstone = Some(index);
                }
            } else if entry.key == key {
                return index;
            }
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let capacity = if self.entries.is_empty() {
            MIN_CAPACITY
        } else {
            self.entries.len() * 2
        };
        let mut entries = vec![Entry::UNUSED; capacity];
        self.occupied = 0;
        for entry in self.entries.iter().filter(|e| e.is_live()) {
            let slot = Self::find_slot(&entries, entry.key, entry.hash);
            entries[slot] = *entry;
            self.occupied += 1;
        }
        self.entries = entries;
    }

    /// Insert or overwrite. Returns true if the key was not present.
    pub fn set(&mut self, key: TableKey, value: Value) -> bool {
        if (self.occupied + 1) * MAX_LOAD_DENOMINATOR > self.entries.len() * MAX_LOAD_NUMERATOR {
            self.grow();
        }
        let slot = Self::find_slot(&self.entries, key.value, key.hash);
        let entry = &mut self.entries[slot];
        let is_new = !entry.is_live();
        if is_new {
            if !entry.is_tombstone() {
                self.occupied += 1;
            }
            self.len += 1;
        }
        *entry = Entry {
            key: key.value,
            hash: key.hash,
            value,
        };
        is_new
    }

    /// Look up a key
    pub fn get(&self, key: TableKey) -> Option<Value> {
        if self.len == 0 {
            return None;
        }
        let slot = Self::find_slot(&self.entries, key.value, key.hash);
        let entry = &self.entries[slot];
        entry.is_live().then_some(entry.value)
    }

    /// Returns true if the key is present
    pub fn contains(&self, key: TableKey) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, leaving a tombstone. Returns true if it was present.
    pub fn delete(&mut self, key: TableKey) -> bool {
        if self.len == 0 {
            return false;
        }
        let slot = Self::find_slot(&self.entries, key.value, key.hash);
        let entry = &mut self.entries[slot];
        if !entry.is_live() {
            return false;
        }
        *entry = Entry {
            key: Value::Empty,
            hash: 0,
            value: Value::Bool(true),
        };
        self.len -= 1;
        true
    }

    /// Copy every live entry of `self` into `to`, overwriting existing keys
    pub fn add_all(&self, to: &mut Table) {
        for entry in self.entries.iter().filter(|e| e.is_live()) {
            to.set(TableKey::new(entry.key, entry.hash), entry.value);
        }
    }

    /// Drop every entry and release the slot array
    pub fn clear(&mut self) {
        self.entries = Vec::new();
        self.occupied = 0;
        self.len = 0;
    }

    /// Find an interned string by content.
    ///
    /// `matches` is asked whether a candidate handle holds the wanted
    /// characters; it is only called for entries with an equal hash.
    pub fn find_interned_string(
        &self,
        hash: u32,
        mut matches: impl FnMut(ObjRef) -> bool,
    ) -> Option<ObjRef> {
        if self.len == 0 {
            return None;
        }
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                Value::Empty => {
                    if entry.value.is_nil() {
                        return None;
                    }
                }
                Value::Obj(r) if entry.hash == hash && matches(r) => return Some(r),
                _ => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Delete every entry whose key is an object `is_live` rejects
    pub fn retain_keys(&mut self, mut is_live: impl FnMut(ObjRef) -> bool) {
        let mut removed = 0;
        for entry in self.entries.iter_mut() {
            if let Value::Obj(r) = entry.key {
                if !is_live(r) {
                    *entry = Entry {
                        key: Value::Empty,
                        hash: 0,
                        value: Value::Bool(true),
                    };
                    removed += 1;
                }
            }
        }
        self.len -= removed;
    }

    /// Iterate live `(key, value)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries
            .iter()
            .filter(|e| e.is_live())
            .map(|e| (e.key, e.value))
    }

    /// Iterate live entries with their cached hashes
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter().filter(|e| e.is_live())
    }

    /// Live keys in slot order
    pub fn keys(&self) -> Vec<Value> {
        self.iter().map(|(k, _)| k).collect()
    }

    /// Live values in slot order
    pub fn values(&self) -> Vec<Value> {
        self.iter().map(|(_, v)| v).collect()
    }
}
