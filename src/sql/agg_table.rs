// src/sql/agg_table.rs

use rayon::prelude::*;

use crate::sql::join_table::{alloc_entry, entry_ptr, HashTableEntry};
use crate::sql::runner::{run_with_result, FunctionRunner};
use crate::sql::table::VectorProjectionIterator;
use crate::sql::ThreadStateContainer;

/// Number of overflow partitions used in partitioned aggregation; hashes
/// are routed by their top byte.
const NUM_PARTITIONS: usize = 256;

fn partition_of(hash: u64) -> usize {
    (hash >> 56) as usize
}

/// Chaining hash table for grouped aggregation. Payload rows are opaque to
/// the table; key comparison goes through a caller-supplied function id.
#[repr(C)]
#[derive(Debug)]
pub struct AggregationHashTable {
    payload_size: u32,
    entries: Vec<Box<[u64]>>,
    /// Bucket heads as raw entry addresses (0 = empty)
    buckets: Vec<usize>,
    mask: u64,
    count: usize,
    /// Overflow partition entry lists, present in partitioned mode
    partitions: Vec<Vec<usize>>,
    /// Merge callback installed by `transfer_partitions`
    merge_fn: Option<u16>,
}

impl AggregationHashTable {
    const INITIAL_BUCKETS: usize = 256;
    const LOAD_FACTOR: usize = 2;

    pub fn new(payload_size: u32) -> Self {
        Self {
            payload_size,
            entries: Vec::new(),
            buckets: vec![0; Self::INITIAL_BUCKETS],
            mask: Self::INITIAL_BUCKETS as u64 - 1,
            count: 0,
            partitions: Vec::new(),
            merge_fn: None,
        }
    }

    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Allocate and link a new group row for `hash`; the caller initializes
    /// the payload (keys plus aggregators)
    pub fn insert(&mut self, hash: u64) -> *mut u8 {
        if self.count >= self.buckets.len() * Self::LOAD_FACTOR {
            self.grow();
        }
        let mut storage = alloc_entry(self.payload_size as usize);
        let entry = entry_ptr(&mut storage);
        let bucket = (hash & self.mask) as usize;
        unsafe {
            (*entry).hash = hash;
            (*entry).next = self.buckets[bucket] as *mut HashTableEntry;
        }
        self.buckets[bucket] = entry as usize;
        self.entries.push(storage);
        self.count += 1;
        HashTableEntry::payload(entry)
    }

    /// Partitioned insert used by thread-local tables feeding a later merge
    pub fn insert_partitioned(&mut self, hash: u64) -> *mut u8 {
        if self.partitions.is_empty() {
            self.partitions = vec![Vec::new(); NUM_PARTITIONS];
        }
        let mut storage = alloc_entry(self.payload_size as usize);
        let entry = entry_ptr(&mut storage);
        unsafe {
            (*entry).hash = hash;
            (*entry).next = std::ptr::null_mut();
        }
        self.partitions[partition_of(hash)].push(entry as usize);
        self.entries.push(storage);
        HashTableEntry::payload(entry)
    }

    fn grow(&mut self) {
        let new_size = self.buckets.len() * 2;
        self.mask = new_size as u64 - 1;
        self.buckets = vec![0; new_size];
        for storage in &mut self.entries {
            let entry = entry_ptr(storage);
            let hash = unsafe { (*entry).hash };
            let bucket = (hash & self.mask) as usize;
            unsafe {
                (*entry).next = self.buckets[bucket] as *mut HashTableEntry;
            }
            self.buckets[bucket] = entry as usize;
        }
    }

    /// Find the group row matching `hash` whose keys equal the probe tuple,
    /// using the key-equality callback `(bool*, payload, probe)`
    pub fn lookup(
        &self,
        hash: u64,
        key_eq_fn: u16,
        probe: *const u8,
        runner: &dyn FunctionRunner,
    ) -> *mut u8 {
        let mut cursor = self.buckets[(hash & self.mask) as usize] as *mut HashTableEntry;
        while !cursor.is_null() {
            if unsafe { (*cursor).hash } == hash {
                let payload = HashTableEntry::payload(cursor);
                let eq =
                    run_with_result(runner, key_eq_fn, &[payload as u64, probe as u64]);
                if eq & 1 == 1 {
                    return payload;
                }
            }
            cursor = unsafe { (*cursor).next };
        }
        std::ptr::null_mut()
    }

    /// Vectorized aggregation of one batch: for each selected tuple, hash
    /// it, look up (or create and initialize) its group, then advance the
    /// group's aggregators. Callback shapes:
    ///   hash_fn:    (u64* result, vpi)
    ///   key_eq_fn:  (bool* result, payload, vpi)
    ///   init_fn:    (payload, vpi)
    ///   advance_fn: (payload, vpi)
    #[allow(clippy::too_many_arguments)]
    pub fn process_batch(
        &mut self,
        vpi: &mut VectorProjectionIterator,
        hash_fn: u16,
        key_eq_fn: u16,
        init_fn: u16,
        advance_fn: u16,
        partitioned: bool,
        runner: &dyn FunctionRunner,
    ) {
        let filtered = vpi.is_filtered();
        loop {
            let has_next = if filtered {
                vpi.has_next_filtered()
            } else {
                vpi.has_next()
            };
            if !has_next {
                break;
            }

            let vpi_ptr = vpi as *mut VectorProjectionIterator as u64;
            let hash = run_with_result(runner, hash_fn, &[vpi_ptr]);
            let mut payload = self.lookup_with_vpi(hash, key_eq_fn, vpi_ptr, runner);
            if payload.is_null() {
                payload = if partitioned {
                    self.insert_partitioned(hash)
                } else {
                    self.insert(hash)
                };
                runner.run(init_fn, &[payload as u64, vpi_ptr]);
            }
            runner.run(advance_fn, &[payload as u64, vpi_ptr]);

            if filtered {
                vpi.advance_filtered();
            } else {
                vpi.advance();
            }
        }
        vpi.reset();
    }

    fn lookup_with_vpi(
        &self,
        hash: u64,
        key_eq_fn: u16,
        vpi_ptr: u64,
        runner: &dyn FunctionRunner,
    ) -> *mut u8 {
        let mut cursor = self.buckets[(hash & self.mask) as usize] as *mut HashTableEntry;
        while !cursor.is_null() {
            if unsafe { (*cursor).hash } == hash {
                let payload = HashTableEntry::payload(cursor);
                let eq = run_with_result(runner, key_eq_fn, &[payload as u64, vpi_ptr]);
                if eq & 1 == 1 {
                    return payload;
                }
            }
            cursor = unsafe { (*cursor).next };
        }
        std::ptr::null_mut()
    }

    /// Steal the overflow partitions (and entry storage) of every
    /// thread-local table embedded at `offset` in the thread states, and
    /// remember the merge callback for the partitioned scan.
    pub fn transfer_partitions(
        &mut self,
        tsc: &ThreadStateContainer,
        offset: u32,
        merge_fn: u16,
    ) {
        if self.partitions.is_empty() {
            self.partitions = vec![Vec::new(); NUM_PARTITIONS];
        }
        self.merge_fn = Some(merge_fn);
        for state in tsc.state_pointers() {
            let source =
                unsafe { &mut *(state.add(offset as usize) as *mut AggregationHashTable) };
            self.entries.append(&mut source.entries);
            for (index, partition) in source.partitions.iter_mut().enumerate() {
                self.partitions[index].append(partition);
            }
        }
    }

    /// Scan the transferred partitions in parallel. Per non-empty
    /// partition: a fresh table is produced by the merge callback
    /// `(query_state, *AggregationHashTable, *AHTOverflowPartitionIterator)`,
    /// then handed to `scan_fn (query_state, thread_state, *AggregationHashTable)`.
    pub fn parallel_scan_partitions(
        &self,
        query_state: *mut u8,
        tsc: &ThreadStateContainer,
        scan_fn: u16,
        runner: &dyn FunctionRunner,
    ) {
        let Some(merge_fn) = self.merge_fn else {
            return;
        };
        let query_state = query_state as usize;
        let payload_size = self.payload_size;
        self.partitions
            .par_iter()
            .filter(|p| !p.is_empty())
            .for_each(|partition| {
                let mut merged = AggregationHashTable::new(payload_size);
                let mut iter = AhtOverflowPartitionIterator::new(partition.clone());
                runner.run(
                    merge_fn,
                    &[
                        query_state as u64,
                        &mut merged as *mut _ as u64,
                        &mut iter as *mut _ as u64,
                    ],
                );
                let state = tsc.access_current_thread_state(runner);
                runner.run(
                    scan_fn,
                    &[query_state as u64, state as u64, &mut merged as *mut _ as u64],
                );
            });
    }

    fn entry_addresses(&self) -> Vec<usize> {
        self.entries
            .iter()
            .map(|storage| storage.as_ptr() as usize)
            .collect()
    }
}

/// Iterator over every group row of an aggregation table
#[repr(C)]
#[derive(Debug, Default)]
pub struct AhtIterator {
    entries: Vec<usize>,
    pos: usize,
}

impl AhtIterator {
    pub fn init(&mut self, table: &AggregationHashTable) {
        self.entries = table.entry_addresses();
        self.pos = 0;
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.entries.len()
    }

    pub fn next(&mut self) {
        self.pos += 1;
    }

    pub fn row(&self) -> *mut u8 {
        HashTableEntry::payload(self.entries[self.pos] as *mut HashTableEntry)
    }
}

/// Iterator over the entries of one overflow partition
#[repr(C)]
#[derive(Debug, Default)]
pub struct AhtOverflowPartitionIterator {
    entries: Vec<usize>,
    pos: usize,
}

impl AhtOverflowPartitionIterator {
    pub fn new(entries: Vec<usize>) -> Self {
        Self { entries, pos: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.entries.len()
    }

    pub fn next(&mut self) {
        self.pos += 1;
    }

    pub fn hash(&self) -> u64 {
        unsafe { (*(self.entries[self.pos] as *mut HashTableEntry)).hash }
    }

    pub fn row(&self) -> *mut u8 {
        HashTableEntry::payload(self.entries[self.pos] as *mut HashTableEntry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EqRunner;
    impl FunctionRunner for EqRunner {
        // Callback 0: key-eq that compares the first 8 payload bytes
        fn run(&self, func_id: u16, args: &[u64]) {
            assert_eq!(func_id, 0);
            let result = args[0] as *mut u64;
            let payload = args[1] as *const i64;
            let probe = args[2] as *const i64;
            unsafe {
                *result = (*payload == *probe) as u64;
            }
        }
    }

    #[test]
    fn insert_then_lookup() {
        let mut aht = AggregationHashTable::new(16);
        for key in 0..50i64 {
            let hash = key as u64 * 31;
            let payload = aht.insert(hash);
            unsafe { (payload as *mut i64).write(key) };
        }

        for key in 0..50i64 {
            let hash = key as u64 * 31;
            let found = aht.lookup(hash, 0, &key as *const i64 as *const u8, &EqRunner);
            assert!(!found.is_null());
            assert_eq!(unsafe { *(found as *const i64) }, key);
        }

        let missing = 99i64;
        let found = aht.lookup(99 * 31, 0, &missing as *const i64 as *const u8, &EqRunner);
        assert!(found.is_null());
    }

    #[test]
    fn growth_preserves_entries() {
        let mut aht = AggregationHashTable::new(8);
        for key in 0..10_000i64 {
            let payload = aht.insert(key as u64);
            unsafe { (payload as *mut i64).write(key) };
        }
        assert_eq!(aht.count(), 10_000);
        let probe = 7_777i64;
        let found = aht.lookup(7_777, 0, &probe as *const i64 as *const u8, &EqRunner);
        assert!(!found.is_null());
    }

    #[test]
    fn iterator_visits_every_row() {
        let mut aht = AggregationHashTable::new(8);
        for key in 0..25i64 {
            let payload = aht.insert(key as u64);
            unsafe { (payload as *mut i64).write(key) };
        }
        let mut iter = AhtIterator::default();
        iter.init(&aht);
        let mut seen = Vec::new();
        while iter.has_next() {
            seen.push(unsafe { *(iter.row() as *const i64) });
            iter.next();
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn partitioned_inserts_route_by_top_byte() {
        let mut aht = AggregationHashTable::new(8);
        aht.insert_partitioned(0x01u64 << 56);
        aht.insert_partitioned(0x01u64 << 56 | 5);
        aht.insert_partitioned(0xffu64 << 56);
        assert_eq!(aht.partitions[1].len(), 2);
        assert_eq!(aht.partitions[255].len(), 1);
    }
}
