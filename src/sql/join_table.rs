// src/sql/join_table.rs

use crate::sql::runner::FunctionRunner;

/// Header of every chained hash table entry. The tuple payload follows the
/// header in the same allocation.
#[repr(C)]
#[derive(Debug)]
pub struct HashTableEntry {
    pub next: *mut HashTableEntry,
    pub hash: u64,
}

impl HashTableEntry {
    pub const HEADER_SIZE: usize = std::mem::size_of::<HashTableEntry>();

    /// Pointer to the payload stored immediately after the header
    pub fn payload(entry: *mut HashTableEntry) -> *mut u8 {
        unsafe { (entry as *mut u8).add(Self::HEADER_SIZE) }
    }

    /// The next chained entry carrying the same hash, if any
    pub fn next_with_same_hash(entry: *mut HashTableEntry) -> *mut HashTableEntry {
        let hash = unsafe { (*entry).hash };
        let mut cursor = unsafe { (*entry).next };
        while !cursor.is_null() {
            if unsafe { (*cursor).hash } == hash {
                return cursor;
            }
            cursor = unsafe { (*cursor).next };
        }
        std::ptr::null_mut()
    }
}

/// Allocate zeroed, 8-byte-aligned storage for a header plus payload.
/// Backing words are boxed so entry addresses stay stable.
pub(crate) fn alloc_entry(payload_size: usize) -> Box<[u64]> {
    let total = HashTableEntry::HEADER_SIZE + payload_size;
    vec![0u64; total.div_ceil(8)].into_boxed_slice()
}

pub(crate) fn entry_ptr(storage: &mut Box<[u64]>) -> *mut HashTableEntry {
    storage.as_mut_ptr() as *mut HashTableEntry
}

/// Build-side hash table for joins: tuples are allocated during the build
/// phase, chained into buckets by `build()`, and probed by hash afterwards.
#[repr(C)]
#[derive(Debug, Default)]
pub struct JoinHashTable {
    tuple_size: u32,
    entries: Vec<Box<[u64]>>,
    /// Bucket heads as raw entry addresses; empty until built
    buckets: Vec<usize>,
    mask: u64,
    built: bool,
}

impl JoinHashTable {
    pub fn new(tuple_size: u32) -> Self {
        Self {
            tuple_size,
            ..Self::default()
        }
    }

    pub fn tuple_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Reserve space for one build tuple; the caller fills the payload
    pub fn alloc_tuple(&mut self, hash: u64) -> *mut u8 {
        debug_assert!(!self.built, "insert after build");
        let mut storage = alloc_entry(self.tuple_size as usize);
        let entry = entry_ptr(&mut storage);
        unsafe {
            (*entry).next = std::ptr::null_mut();
            (*entry).hash = hash;
        }
        self.entries.push(storage);
        HashTableEntry::payload(entry)
    }

    /// Chain all allocated tuples into the bucket directory
    pub fn build(&mut self) {
        if self.built {
            return;
        }
        let num_buckets = (self.entries.len() * 2).next_power_of_two().max(16);
        self.mask = num_buckets as u64 - 1;
        self.buckets = vec![0usize; num_buckets];
        for storage in &mut self.entries {
            let entry = entry_ptr(storage);
            let bucket = unsafe { ((*entry).hash & self.mask) as usize };
            unsafe {
                (*entry).next = self.buckets[bucket] as *mut HashTableEntry;
            }
            self.buckets[bucket] = entry as usize;
        }
        self.built = true;
    }

    /// Steal every thread-local table embedded at `offset` within the
    /// thread states, then build the now-complete table.
    pub fn build_parallel(
        &mut self,
        tsc: &crate::sql::ThreadStateContainer,
        offset: u32,
        _runner: &dyn FunctionRunner,
    ) {
        for state in tsc.state_pointers() {
            let source = unsafe { &mut *(state.add(offset as usize) as *mut JoinHashTable) };
            self.entries.append(&mut source.entries);
        }
        self.build();
    }

    /// Head of the probe chain for `hash`: the first entry whose hash
    /// matches exactly, or null
    pub fn lookup(&self, hash: u64) -> *mut HashTableEntry {
        if !self.built {
            return std::ptr::null_mut();
        }
        let mut cursor = self.buckets[(hash & self.mask) as usize] as *mut HashTableEntry;
        while !cursor.is_null() {
            if unsafe { (*cursor).hash } == hash {
                return cursor;
            }
            cursor = unsafe { (*cursor).next };
        }
        std::ptr::null_mut()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_payload(ptr: *mut u8, value: i64) {
        unsafe { (ptr as *mut i64).write(value) };
    }

    fn read_payload(entry: *mut HashTableEntry) -> i64 {
        unsafe { (HashTableEntry::payload(entry) as *mut i64).read() }
    }

    #[test]
    fn build_then_probe() {
        let mut jht = JoinHashTable::new(8);
        for i in 0..100i64 {
            let hash = i as u64 * 0x9e3779b9;
            write_payload(jht.alloc_tuple(hash), i);
        }
        jht.build();

        for i in 0..100i64 {
            let hash = i as u64 * 0x9e3779b9;
            let entry = jht.lookup(hash);
            assert!(!entry.is_null());
            assert_eq!(read_payload(entry), i);
        }
        assert!(jht.lookup(0xdead_beef_dead_beef).is_null());
    }

    #[test]
    fn duplicate_hashes_chain() {
        let mut jht = JoinHashTable::new(8);
        write_payload(jht.alloc_tuple(7), 1);
        write_payload(jht.alloc_tuple(7), 2);
        jht.build();

        let first = jht.lookup(7);
        assert!(!first.is_null());
        let second = HashTableEntry::next_with_same_hash(first);
        assert!(!second.is_null());
        let mut values = vec![read_payload(first), read_payload(second)];
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
        assert!(HashTableEntry::next_with_same_hash(second).is_null());
    }

    #[test]
    fn lookup_before_build_is_null() {
        let mut jht = JoinHashTable::new(8);
        jht.alloc_tuple(1);
        assert!(jht.lookup(1).is_null());
    }
}
