// src/sql/table.rs
//
// In-memory columnar tables and their block-at-a-time iterators. Tables are
// registered in a process-local catalog; bytecode refers to them by the
// 2-byte ids the code generator resolves at compile time.

use std::sync::{Arc, Mutex, OnceLock};

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::sql::runner::FunctionRunner;
use crate::sql::value::{DateVal, Integer, Real, StringVal};

/// Rows fetched per block
pub const DEFAULT_VECTOR_SIZE: usize = 2048;

/// One column of stored data
#[derive(Debug, Clone)]
pub enum Column {
    BigInt(Vec<Option<i64>>),
    Double(Vec<Option<f64>>),
    /// Packed yyyymmdd, matching DateVal
    Date(Vec<Option<i32>>),
    Varchar(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::BigInt(v) => v.len(),
            Column::Double(v) => v.len(),
            Column::Date(v) => v.len(),
            Column::Varchar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        assert!(
            columns.iter().all(|c| c.len() == num_rows),
            "all columns must have the same length"
        );
        Self {
            name: name.into(),
            columns,
            num_rows,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
struct Catalog {
    tables: Vec<Arc<Table>>,
    by_name: FxHashMap<String, u16>,
}

static CATALOG: OnceLock<Mutex<Catalog>> = OnceLock::new();

fn catalog() -> &'static Mutex<Catalog> {
    CATALOG.get_or_init(|| Mutex::new(Catalog::default()))
}

/// Register a table, returning its id. Re-registering a name replaces the
/// table but keeps the id.
pub fn register_table(table: Table) -> u16 {
    let mut catalog = catalog().lock().unwrap();
    if let Some(&id) = catalog.by_name.get(&table.name) {
        catalog.tables[id as usize] = Arc::new(table);
        return id;
    }
    let id = catalog.tables.len() as u16;
    let name = table.name.clone();
    catalog.tables.push(Arc::new(table));
    catalog.by_name.insert(name, id);
    id
}

pub fn table_id_by_name(name: &str) -> Option<u16> {
    catalog().lock().unwrap().by_name.get(name).copied()
}

pub fn table_by_id(id: u16) -> Option<Arc<Table>> {
    catalog().lock().unwrap().tables.get(id as usize).cloned()
}

// ============================================================================
// Vector projections
// ============================================================================

/// A materialized batch of one column
#[derive(Debug)]
pub enum ColumnVector {
    Int(Vec<Integer>),
    Real(Vec<Real>),
    Date(Vec<DateVal>),
    String(Vec<StringVal>),
}

/// A batch of rows in columnar form. String values point into the owning
/// table's storage, which outlives the projection via the iterator's Arc.
#[derive(Debug, Default)]
pub struct VectorProjection {
    columns: Vec<ColumnVector>,
    size: u32,
}

impl VectorProjection {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn column(&self, idx: u32) -> &ColumnVector {
        &self.columns[idx as usize]
    }

    pub fn column_mut(&mut self, idx: u32) -> &mut ColumnVector {
        &mut self.columns[idx as usize]
    }

    /// Refill from a row range of a table
    pub fn load(&mut self, table: &Table, start: usize, end: usize) {
        self.columns.clear();
        self.size = (end - start) as u32;
        for column in table.columns() {
            let vector = match column {
                Column::BigInt(data) => ColumnVector::Int(
                    data[start..end]
                        .iter()
                        .map(|v| v.map(Integer::new).unwrap_or_else(Integer::null))
                        .collect(),
                ),
                Column::Double(data) => ColumnVector::Real(
                    data[start..end]
                        .iter()
                        .map(|v| v.map(Real::new).unwrap_or_else(Real::null))
                        .collect(),
                ),
                Column::Date(data) => ColumnVector::Date(
                    data[start..end]
                        .iter()
                        .map(|v| {
                            v.map(|packed| DateVal {
                                is_null: false,
                                val: packed,
                            })
                            .unwrap_or_else(DateVal::null)
                        })
                        .collect(),
                ),
                Column::Varchar(data) => ColumnVector::String(
                    data[start..end]
                        .iter()
                        .map(|v| {
                            v.as_deref()
                                .map(StringVal::from_str)
                                .unwrap_or_else(StringVal::null)
                        })
                        .collect(),
                ),
            };
            self.columns.push(vector);
        }
    }
}

/// An ordered list of selected tuple indexes within one projection
#[derive(Debug, Default, Clone)]
pub struct TupleIdList {
    ids: Vec<u32>,
}

impl TupleIdList {
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn add(&mut self, id: u32) {
        self.ids.push(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, idx: usize) -> u32 {
        self.ids[idx]
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn retain(&mut self, mut keep: impl FnMut(u32) -> bool) {
        self.ids.retain(|&id| keep(id));
    }

    /// The full selection 0..size
    pub fn fill_all(&mut self, size: u32) {
        self.ids.clear();
        self.ids.extend(0..size);
    }
}

// ============================================================================
// Vector projection iterator
// ============================================================================

/// Tuple-at-a-time cursor over a projection, with an optional selection.
///
/// Unfiltered iteration walks the whole batch; calls to `tuple_match`
/// record survivors, and `reset_filtered` flips iteration to the recorded
/// selection. The projection pointer is owned by the enclosing table
/// iterator (or set explicitly by tests).
#[repr(C)]
#[derive(Debug)]
pub struct VectorProjectionIterator {
    vp: *mut VectorProjection,
    filtered: bool,
    pos: u32,
    sel_pos: u32,
    sel: TupleIdList,
    matches: TupleIdList,
}

impl Default for VectorProjectionIterator {
    fn default() -> Self {
        Self {
            vp: std::ptr::null_mut(),
            filtered: false,
            pos: 0,
            sel_pos: 0,
            sel: TupleIdList::default(),
            matches: TupleIdList::default(),
        }
    }
}

impl VectorProjectionIterator {
    pub fn set_projection(&mut self, vp: *mut VectorProjection) {
        self.vp = vp;
        self.filtered = false;
        self.pos = 0;
        self.sel_pos = 0;
        self.sel.clear();
        self.matches.clear();
    }

    fn vp(&self) -> &VectorProjection {
        debug_assert!(!self.vp.is_null());
        unsafe { &*self.vp }
    }

    fn vp_mut(&mut self) -> &mut VectorProjection {
        debug_assert!(!self.vp.is_null());
        unsafe { &mut *self.vp }
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    pub fn selected_row_count(&self) -> u32 {
        if self.filtered {
            self.sel.len() as u32
        } else {
            self.vp().size()
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.vp().size()
    }

    pub fn has_next_filtered(&self) -> bool {
        (self.sel_pos as usize) < self.sel.len()
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn advance_filtered(&mut self) {
        self.sel_pos += 1;
    }

    pub fn set_position(&mut self, index: u32) {
        self.pos = index;
    }

    pub fn set_position_filtered(&mut self, index: u32) {
        self.sel_pos = index;
    }

    /// The projection index the cursor currently points at
    pub fn current_index(&self) -> u32 {
        if self.filtered {
            self.sel.get(self.sel_pos as usize)
        } else {
            self.pos
        }
    }

    /// Record whether the current tuple survives the active predicate
    pub fn tuple_match(&mut self, matched: bool) {
        if matched {
            let index = self.current_index();
            self.matches.add(index);
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.sel_pos = 0;
        self.matches.clear();
    }

    /// Adopt the recorded matches as the new selection and restart
    pub fn reset_filtered(&mut self) {
        self.sel = std::mem::take(&mut self.matches);
        self.filtered = true;
        self.pos = 0;
        self.sel_pos = 0;
    }

    /// Direct access to the selection (used by the vector filter executor)
    pub fn selection_mut(&mut self) -> (&mut TupleIdList, &mut bool, &VectorProjection) {
        debug_assert!(!self.vp.is_null());
        let vp = unsafe { &*self.vp };
        (&mut self.sel, &mut self.filtered, vp)
    }

    // Typed element access at the current cursor position

    pub fn get_int(&self, col: u32) -> Integer {
        let index = self.current_index() as usize;
        match self.vp().column(col) {
            ColumnVector::Int(data) => data[index],
            _ => Integer::null(),
        }
    }

    pub fn get_real(&self, col: u32) -> Real {
        let index = self.current_index() as usize;
        match self.vp().column(col) {
            ColumnVector::Real(data) => data[index],
            _ => Real::null(),
        }
    }

    pub fn get_date(&self, col: u32) -> DateVal {
        let index = self.current_index() as usize;
        match self.vp().column(col) {
            ColumnVector::Date(data) => data[index],
            _ => DateVal::null(),
        }
    }

    pub fn get_string(&self, col: u32) -> StringVal {
        let index = self.current_index() as usize;
        match self.vp().column(col) {
            ColumnVector::String(data) => data[index],
            _ => StringVal::null(),
        }
    }

    pub fn set_int(&mut self, col: u32, value: Integer) {
        let index = self.current_index() as usize;
        if let ColumnVector::Int(data) = self.vp_mut().column_mut(col) {
            data[index] = value;
        }
    }

    pub fn set_real(&mut self, col: u32, value: Real) {
        let index = self.current_index() as usize;
        if let ColumnVector::Real(data) = self.vp_mut().column_mut(col) {
            data[index] = value;
        }
    }

    pub fn set_date(&mut self, col: u32, value: DateVal) {
        let index = self.current_index() as usize;
        if let ColumnVector::Date(data) = self.vp_mut().column_mut(col) {
            data[index] = value;
        }
    }

    pub fn set_string(&mut self, col: u32, value: StringVal) {
        let index = self.current_index() as usize;
        if let ColumnVector::String(data) = self.vp_mut().column_mut(col) {
            data[index] = value;
        }
    }
}

// ============================================================================
// Table vector iterator
// ============================================================================

/// Block-at-a-time cursor over a table (or a row range of it, for parallel
/// scans). Owns the projection its VPI points into.
#[repr(C)]
#[derive(Debug)]
pub struct TableVectorIterator {
    table: Option<Arc<Table>>,
    pos: usize,
    end: usize,
    vp: Box<VectorProjection>,
    vpi: VectorProjectionIterator,
}

impl TableVectorIterator {
    pub fn new(table: Arc<Table>) -> Self {
        let end = table.num_rows();
        Self::with_range(table, 0, end)
    }

    pub fn with_range(table: Arc<Table>, start: usize, end: usize) -> Self {
        Self {
            table: Some(table),
            pos: start,
            end,
            vp: Box::default(),
            vpi: VectorProjectionIterator::default(),
        }
    }

    /// Load the next block. Returns false when the range is exhausted.
    pub fn next(&mut self) -> bool {
        let Some(table) = self.table.clone() else {
            return false;
        };
        if self.pos >= self.end {
            return false;
        }
        let block_end = (self.pos + DEFAULT_VECTOR_SIZE).min(self.end);
        self.vp.load(&table, self.pos, block_end);
        self.pos = block_end;
        let vp_ptr: *mut VectorProjection = &mut *self.vp;
        self.vpi.set_projection(vp_ptr);
        true
    }

    pub fn vpi_mut(&mut self) -> &mut VectorProjectionIterator {
        &mut self.vpi
    }

    pub fn close(&mut self) {
        self.table = None;
    }
}

/// Partition a table scan across worker threads. Each worker gets its own
/// iterator over a row range and its thread-local state, and invokes the
/// scan callback `(query_state, thread_state, *tvi)`.
pub fn parallel_scan(
    table_id: u16,
    query_state: *mut u8,
    tsc: &crate::sql::ThreadStateContainer,
    scan_fn: u16,
    runner: &dyn FunctionRunner,
) {
    let Some(table) = table_by_id(table_id) else {
        return;
    };
    let num_rows = table.num_rows();
    let num_chunks = rayon::current_num_threads().max(1);
    let chunk = num_rows.div_ceil(num_chunks).max(1);
    let ranges: Vec<(usize, usize)> = (0..num_rows)
        .step_by(chunk)
        .map(|start| (start, (start + chunk).min(num_rows)))
        .collect();

    let query_state = query_state as usize;
    ranges.into_par_iter().for_each(|(start, end)| {
        let mut tvi = TableVectorIterator::with_range(table.clone(), start, end);
        let state = tsc.access_current_thread_state(runner);
        runner.run(
            scan_fn,
            &[query_state as u64, state as u64, &mut tvi as *mut _ as u64],
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table(rows: usize) -> Table {
        let a: Vec<Option<i64>> = (0..rows as i64).map(Some).collect();
        let b: Vec<Option<f64>> = (0..rows).map(|i| Some(i as f64 * 0.5)).collect();
        Table::new("t", vec![Column::BigInt(a), Column::Double(b)])
    }

    #[test]
    fn iterates_in_blocks() {
        let table = Arc::new(test_table(DEFAULT_VECTOR_SIZE + 100));
        let mut tvi = TableVectorIterator::new(table);
        assert!(tvi.next());
        assert_eq!(tvi.vpi_mut().selected_row_count(), DEFAULT_VECTOR_SIZE as u32);
        assert!(tvi.next());
        assert_eq!(tvi.vpi_mut().selected_row_count(), 100);
        assert!(!tvi.next());
    }

    #[test]
    fn vpi_reads_values() {
        let table = Arc::new(test_table(10));
        let mut tvi = TableVectorIterator::new(table);
        assert!(tvi.next());
        let vpi = tvi.vpi_mut();
        let mut sum = 0;
        while vpi.has_next() {
            sum += vpi.get_int(0).val;
            vpi.advance();
        }
        assert_eq!(sum, 45);
    }

    #[test]
    fn match_then_filtered_iteration() {
        let table = Arc::new(test_table(10));
        let mut tvi = TableVectorIterator::new(table);
        assert!(tvi.next());
        let vpi = tvi.vpi_mut();
        while vpi.has_next() {
            let v = vpi.get_int(0);
            vpi.tuple_match(v.val % 2 == 0);
            vpi.advance();
        }
        vpi.reset_filtered();
        assert!(vpi.is_filtered());
        assert_eq!(vpi.selected_row_count(), 5);
        let mut values = Vec::new();
        while vpi.has_next_filtered() {
            values.push(vpi.get_int(0).val);
            vpi.advance_filtered();
        }
        assert_eq!(values, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn catalog_round_trip() {
        let id = register_table(test_table(5).into_named("catalog_round_trip"));
        assert_eq!(table_id_by_name("catalog_round_trip"), Some(id));
        assert_eq!(table_by_id(id).unwrap().num_rows(), 5);
    }

    impl Table {
        fn into_named(mut self, name: &str) -> Table {
            self.name = name.to_string();
            self
        }
    }
}
