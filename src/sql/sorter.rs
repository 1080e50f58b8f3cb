// src/sql/sorter.rs

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::sql::runner::{run_with_result, FunctionRunner};
use crate::sql::ThreadStateContainer;

/// External sorter over fixed-size raw rows. Rows are allocated by the
/// caller through `insert`, ordered by a user comparator function id
/// `(i32* result, *row, *row)` returning negative/zero/positive.
#[repr(C)]
#[derive(Debug, Default)]
pub struct Sorter {
    tuple_size: u32,
    cmp_fn: u16,
    rows: Vec<Box<[u64]>>,
    sorted: bool,
}

impl Sorter {
    pub fn new(cmp_fn: u16, tuple_size: u32) -> Self {
        Self {
            tuple_size,
            cmp_fn,
            rows: Vec::new(),
            sorted: false,
        }
    }

    pub fn tuple_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Allocate one row; the caller writes `tuple_size` bytes into it
    pub fn insert(&mut self) -> *mut u8 {
        let words = (self.tuple_size as usize).div_ceil(8);
        let mut row = vec![0u64; words.max(1)].into_boxed_slice();
        let ptr = row.as_mut_ptr() as *mut u8;
        self.rows.push(row);
        self.sorted = false;
        ptr
    }

    /// Allocate a candidate row for a bounded (top-k) sort
    pub fn insert_top_k(&mut self, _k: u64) -> *mut u8 {
        self.insert()
    }

    /// Drop every row beyond the best `k` once the candidate is filled
    pub fn insert_top_k_finish(&mut self, k: u64, runner: &dyn FunctionRunner) {
        if self.rows.len() as u64 <= k {
            return;
        }
        self.sort(runner);
        self.rows.truncate(k as usize);
        // Later inserts may follow; keep state consistent
        self.sorted = true;
    }

    fn compare(&self, a: &Box<[u64]>, b: &Box<[u64]>, runner: &dyn FunctionRunner) -> Ordering {
        let raw = run_with_result(
            runner,
            self.cmp_fn,
            &[a.as_ptr() as u64, b.as_ptr() as u64],
        );
        (raw as i32).cmp(&0)
    }

    pub fn sort(&mut self, runner: &dyn FunctionRunner) {
        if self.sorted {
            return;
        }
        let cmp_fn = self.cmp_fn;
        self.rows.sort_by(|a, b| {
            let raw = run_with_result(runner, cmp_fn, &[a.as_ptr() as u64, b.as_ptr() as u64]);
            (raw as i32).cmp(&0)
        });
        self.sorted = true;
    }

    /// Steal the rows of every thread-local sorter embedded at `offset`
    /// within the thread states, then sort the union in parallel.
    pub fn sort_parallel(
        &mut self,
        tsc: &ThreadStateContainer,
        offset: u32,
        runner: &dyn FunctionRunner,
    ) {
        for state in tsc.state_pointers() {
            let source = unsafe { &mut *(state.add(offset as usize) as *mut Sorter) };
            self.rows.append(&mut source.rows);
            source.sorted = false;
        }
        let cmp_fn = self.cmp_fn;
        self.rows.par_sort_by(|a, b| {
            let raw = run_with_result(runner, cmp_fn, &[a.as_ptr() as u64, b.as_ptr() as u64]);
            (raw as i32).cmp(&0)
        });
        self.sorted = true;
    }

    /// Bounded parallel sort: gather, sort, keep the best `k`
    pub fn sort_top_k_parallel(
        &mut self,
        tsc: &ThreadStateContainer,
        offset: u32,
        k: u64,
        runner: &dyn FunctionRunner,
    ) {
        self.sort_parallel(tsc, offset, runner);
        self.rows.truncate(k as usize);
    }

    pub fn row_at(&self, index: usize) -> *const u8 {
        self.rows[index].as_ptr() as *const u8
    }

    pub(crate) fn check_sorted(&self, runner: &dyn FunctionRunner) -> bool {
        self.rows
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1], runner) != Ordering::Greater)
    }
}

/// Cursor over a sorted sorter's rows
#[repr(C)]
#[derive(Debug)]
pub struct SorterIterator {
    sorter: *const Sorter,
    pos: usize,
}

impl Default for SorterIterator {
    fn default() -> Self {
        Self {
            sorter: std::ptr::null(),
            pos: 0,
        }
    }
}

impl SorterIterator {
    pub fn init(&mut self, sorter: *const Sorter) {
        self.sorter = sorter;
        self.pos = 0;
    }

    fn sorter(&self) -> &Sorter {
        debug_assert!(!self.sorter.is_null());
        unsafe { &*self.sorter }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.sorter().tuple_count()
    }

    pub fn next(&mut self) {
        self.pos += 1;
    }

    pub fn row(&self) -> *const u8 {
        self.sorter().row_at(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Comparator 0: ascending i64 over the first 8 row bytes
    struct I64Cmp;
    impl FunctionRunner for I64Cmp {
        fn run(&self, func_id: u16, args: &[u64]) {
            assert_eq!(func_id, 0);
            let result = args[0] as *mut u64;
            let a = unsafe { *(args[1] as *const i64) };
            let b = unsafe { *(args[2] as *const i64) };
            let ord: i32 = match a.cmp(&b) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            };
            unsafe { *result = ord as u32 as u64 };
        }
    }

    fn fill(sorter: &mut Sorter, values: &[i64]) {
        for &v in values {
            let row = sorter.insert();
            unsafe { (row as *mut i64).write(v) };
        }
    }

    fn read_all(sorter: &Sorter) -> Vec<i64> {
        (0..sorter.tuple_count())
            .map(|i| unsafe { *(sorter.row_at(i) as *const i64) })
            .collect()
    }

    #[test]
    fn sort_orders_rows() {
        let mut sorter = Sorter::new(0, 8);
        fill(&mut sorter, &[5, 1, 4, 2, 3]);
        sorter.sort(&I64Cmp);
        assert_eq!(read_all(&sorter), vec![1, 2, 3, 4, 5]);
        assert!(sorter.check_sorted(&I64Cmp));
    }

    #[test]
    fn top_k_keeps_best() {
        let mut sorter = Sorter::new(0, 8);
        for v in [9i64, 3, 7, 1, 5] {
            let row = sorter.insert_top_k(3);
            unsafe { (row as *mut i64).write(v) };
            sorter.insert_top_k_finish(3, &I64Cmp);
        }
        sorter.sort(&I64Cmp);
        assert_eq!(read_all(&sorter), vec![1, 3, 5]);
    }

    #[test]
    fn iterator_walks_in_order() {
        let mut sorter = Sorter::new(0, 8);
        fill(&mut sorter, &[2, 1]);
        sorter.sort(&I64Cmp);
        let mut iter = SorterIterator::default();
        iter.init(&sorter);
        let mut seen = Vec::new();
        while iter.has_next() {
            seen.push(unsafe { *(iter.row() as *const i64) });
            iter.next();
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
