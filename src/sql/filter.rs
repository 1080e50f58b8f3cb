// src/sql/filter.rs

use std::cmp::Ordering;

use crate::sql::runner::FunctionRunner;
use crate::sql::table::{ColumnVector, VectorProjectionIterator};
use crate::sql::value::{DateVal, Integer, Real, StringVal};

/// An ordered list of conjunctive filter functions, each a bytecode
/// function `(*VectorProjectionIterator)` that marks matches and commits
/// them with a filtered reset. Finalize before running.
#[repr(C)]
#[derive(Debug, Default)]
pub struct FilterManager {
    clauses: Vec<u16>,
    finalized: bool,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_filter(&mut self, filter_fn: u16) {
        debug_assert!(!self.finalized, "insert after finalize");
        self.clauses.push(filter_fn);
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn run_filters(&self, vpi: *mut VectorProjectionIterator, runner: &dyn FunctionRunner) {
        debug_assert!(self.finalized, "run before finalize");
        for &clause in &self.clauses {
            runner.run(clause, &[vpi as u64]);
        }
    }
}

/// Vectorized comparisons of one column against a constant, narrowing the
/// iterator's selection in place. `finish` publishes the final selection.
#[repr(C)]
#[derive(Debug)]
pub struct VectorFilterExecutor {
    vpi: *mut VectorProjectionIterator,
}

impl VectorFilterExecutor {
    pub fn new(vpi: *mut VectorProjectionIterator) -> Self {
        Self { vpi }
    }

    fn vpi_mut(&mut self) -> &mut VectorProjectionIterator {
        debug_assert!(!self.vpi.is_null());
        unsafe { &mut *self.vpi }
    }

    /// Compare column `col` against the SQL value at `value`, keeping only
    /// tuples for which the ordering satisfies `keep`.
    fn select(&mut self, col: u32, value: *const u8, keep: fn(Ordering) -> bool) {
        let vpi = self.vpi_mut();
        if !vpi.is_filtered() {
            // Materialize the implicit full selection first
            let size = vpi.selected_row_count();
            let (sel, filtered, _) = vpi.selection_mut();
            sel.fill_all(size);
            *filtered = true;
        }
        let (sel, _, vp) = vpi.selection_mut();
        match vp.column(col) {
            ColumnVector::Int(data) => {
                let probe = unsafe { &*(value as *const Integer) };
                sel.retain(|id| {
                    let v = &data[id as usize];
                    !v.is_null && !probe.is_null && keep(v.val.cmp(&probe.val))
                });
            }
            ColumnVector::Real(data) => {
                let probe = unsafe { &*(value as *const Real) };
                sel.retain(|id| {
                    let v = &data[id as usize];
                    !v.is_null
                        && !probe.is_null
                        && v.val
                            .partial_cmp(&probe.val)
                            .map(keep)
                            .unwrap_or(false)
                });
            }
            ColumnVector::Date(data) => {
                let probe = unsafe { &*(value as *const DateVal) };
                sel.retain(|id| {
                    let v = &data[id as usize];
                    !v.is_null && !probe.is_null && keep(v.val.cmp(&probe.val))
                });
            }
            ColumnVector::String(data) => {
                let probe = unsafe { &*(value as *const StringVal) };
                sel.retain(|id| {
                    let v = &data[id as usize];
                    !v.is_null
                        && !probe.is_null
                        && keep(v.as_str().cmp(probe.as_str()))
                });
            }
        }
    }

    pub fn select_eq(&mut self, col: u32, value: *const u8) {
        self.select(col, value, |ord| ord == Ordering::Equal);
    }

    pub fn select_ne(&mut self, col: u32, value: *const u8) {
        self.select(col, value, |ord| ord != Ordering::Equal);
    }

    pub fn select_lt(&mut self, col: u32, value: *const u8) {
        self.select(col, value, |ord| ord == Ordering::Less);
    }

    pub fn select_le(&mut self, col: u32, value: *const u8) {
        self.select(col, value, |ord| ord != Ordering::Greater);
    }

    pub fn select_gt(&mut self, col: u32, value: *const u8) {
        self.select(col, value, |ord| ord == Ordering::Greater);
    }

    pub fn select_ge(&mut self, col: u32, value: *const u8) {
        self.select(col, value, |ord| ord != Ordering::Less);
    }

    /// Restart iteration over the narrowed selection
    pub fn finish(&mut self) {
        let vpi = self.vpi_mut();
        vpi.set_position_filtered(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::table::{Column, Table, TableVectorIterator};
    use std::sync::Arc;

    #[test]
    fn vector_filter_narrows_selection() {
        let data: Vec<Option<i64>> = (0..100).map(Some).collect();
        let table = Arc::new(Table::new("f", vec![Column::BigInt(data)]));
        let mut tvi = TableVectorIterator::new(table);
        assert!(tvi.next());
        let vpi: *mut VectorProjectionIterator = tvi.vpi_mut();

        let mut exec = VectorFilterExecutor::new(vpi);
        let lo = Integer::new(10);
        let hi = Integer::new(20);
        exec.select_ge(0, &lo as *const Integer as *const u8);
        exec.select_lt(0, &hi as *const Integer as *const u8);
        exec.finish();

        let vpi = unsafe { &mut *vpi };
        assert_eq!(vpi.selected_row_count(), 10);
        let mut values = Vec::new();
        while vpi.has_next_filtered() {
            values.push(vpi.get_int(0).val);
            vpi.advance_filtered();
        }
        assert_eq!(values, (10..20).collect::<Vec<_>>());
    }
}
