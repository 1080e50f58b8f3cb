// src/sql/value.rs
//
// Nullable SQL values with fixed, VM-visible layouts. The code generator
// reserves frame storage of exactly these sizes, and handlers cast frame
// pointers to these structs, so every type here is repr(C).

use std::cell::RefCell;

/// A nullable SQL integer (64-bit payload regardless of source width)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integer {
    pub is_null: bool,
    pub val: i64,
}

impl Integer {
    pub fn new(val: i64) -> Self {
        Self {
            is_null: false,
            val,
        }
    }

    pub fn null() -> Self {
        Self {
            is_null: true,
            val: 0,
        }
    }
}

/// A nullable SQL double-precision real
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Real {
    pub is_null: bool,
    pub val: f64,
}

impl Real {
    pub fn new(val: f64) -> Self {
        Self {
            is_null: false,
            val,
        }
    }

    pub fn null() -> Self {
        Self {
            is_null: true,
            val: 0.0,
        }
    }
}

/// A nullable SQL boolean, distinct from the primitive bool
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoolVal {
    pub is_null: bool,
    pub val: bool,
}

impl BoolVal {
    pub fn new(val: bool) -> Self {
        Self {
            is_null: false,
            val,
        }
    }

    pub fn null() -> Self {
        Self {
            is_null: true,
            val: false,
        }
    }

    /// The truth value used when a SQL boolean feeds a primitive branch:
    /// true iff non-null and true
    pub fn force_truth(self) -> bool {
        !self.is_null && self.val
    }
}

/// A nullable SQL date, packed as yyyymmdd so numeric order is date order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateVal {
    pub is_null: bool,
    pub val: i32,
}

impl DateVal {
    pub fn new(year: i32, month: i32, day: i32) -> Self {
        Self {
            is_null: false,
            val: year * 10_000 + month * 100 + day,
        }
    }

    pub fn null() -> Self {
        Self {
            is_null: true,
            val: 0,
        }
    }

    pub fn year(self) -> i32 {
        self.val / 10_000
    }
}

/// A nullable SQL timestamp in microseconds
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampVal {
    pub is_null: bool,
    pub val: i64,
}

/// A nullable SQL string: a pointer/length view over stable storage (the
/// module string pool, table column storage, or the string heap below)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringVal {
    pub is_null: bool,
    pub ptr: *const u8,
    pub len: usize,
}

impl StringVal {
    /// View over existing stable storage
    pub fn from_str(s: &str) -> Self {
        Self {
            is_null: false,
            ptr: s.as_ptr(),
            len: s.len(),
        }
    }

    pub fn null() -> Self {
        Self {
            is_null: true,
            ptr: std::ptr::null(),
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        if self.is_null || self.ptr.is_null() {
            return "";
        }
        unsafe { std::str::from_utf8_unchecked(std::slice::from_raw_parts(self.ptr, self.len)) }
    }
}

thread_local! {
    // Backing storage for strings produced at run time (concat results).
    // Entries are never moved, so handed-out pointers stay valid for the
    // life of the thread.
    static STRING_HEAP: RefCell<Vec<Box<str>>> = const { RefCell::new(Vec::new()) };
}

/// Persist a runtime-produced string and return a value pointing at it
pub fn intern_runtime_string(s: String) -> StringVal {
    STRING_HEAP.with(|heap| {
        let boxed: Box<str> = s.into_boxed_str();
        let view = StringVal {
            is_null: false,
            ptr: boxed.as_ptr(),
            len: boxed.len(),
        };
        heap.borrow_mut().push(boxed);
        view
    })
}

// ============================================================================
// Arithmetic: null-propagating; SQL division by zero yields null
// ============================================================================

macro_rules! integer_binop {
    ($name:ident, $op:tt) => {
        pub fn $name(left: &Integer, right: &Integer) -> Integer {
            if left.is_null || right.is_null {
                return Integer::null();
            }
            Integer::new(left.val $op right.val)
        }
    };
}

integer_binop!(integer_add, +);
integer_binop!(integer_sub, -);
integer_binop!(integer_mul, *);

pub fn integer_div(left: &Integer, right: &Integer) -> Integer {
    if left.is_null || right.is_null || right.val == 0 {
        return Integer::null();
    }
    Integer::new(left.val / right.val)
}

pub fn integer_rem(left: &Integer, right: &Integer) -> Integer {
    if left.is_null || right.is_null || right.val == 0 {
        return Integer::null();
    }
    Integer::new(left.val % right.val)
}

macro_rules! real_binop {
    ($name:ident, $op:tt) => {
        pub fn $name(left: &Real, right: &Real) -> Real {
            if left.is_null || right.is_null {
                return Real::null();
            }
            Real::new(left.val $op right.val)
        }
    };
}

real_binop!(real_add, +);
real_binop!(real_sub, -);
real_binop!(real_mul, *);

pub fn real_div(left: &Real, right: &Real) -> Real {
    if left.is_null || right.is_null || right.val == 0.0 {
        return Real::null();
    }
    Real::new(left.val / right.val)
}

pub fn real_rem(left: &Real, right: &Real) -> Real {
    if left.is_null || right.is_null || right.val == 0.0 {
        return Real::null();
    }
    Real::new(left.val % right.val)
}

// ============================================================================
// Comparisons: produce a SQL Boolean, null if either side is null
// ============================================================================

macro_rules! sql_compare {
    ($name:ident, $ty:ty, $op:tt) => {
        pub fn $name(left: &$ty, right: &$ty) -> BoolVal {
            if left.is_null || right.is_null {
                return BoolVal::null();
            }
            BoolVal::new(left.val $op right.val)
        }
    };
}

sql_compare!(integer_eq, Integer, ==);
sql_compare!(integer_ne, Integer, !=);
sql_compare!(integer_lt, Integer, <);
sql_compare!(integer_le, Integer, <=);
sql_compare!(integer_gt, Integer, >);
sql_compare!(integer_ge, Integer, >=);
sql_compare!(real_eq, Real, ==);
sql_compare!(real_ne, Real, !=);
sql_compare!(real_lt, Real, <);
sql_compare!(real_le, Real, <=);
sql_compare!(real_gt, Real, >);
sql_compare!(real_ge, Real, >=);
sql_compare!(date_eq, DateVal, ==);
sql_compare!(date_ne, DateVal, !=);
sql_compare!(date_lt, DateVal, <);
sql_compare!(date_le, DateVal, <=);
sql_compare!(date_gt, DateVal, >);
sql_compare!(date_ge, DateVal, >=);

macro_rules! string_compare {
    ($name:ident, $op:tt) => {
        pub fn $name(left: &StringVal, right: &StringVal) -> BoolVal {
            if left.is_null || right.is_null {
                return BoolVal::null();
            }
            BoolVal::new(left.as_str() $op right.as_str())
        }
    };
}

string_compare!(string_eq, ==);
string_compare!(string_ne, !=);
string_compare!(string_lt, <);
string_compare!(string_le, <=);
string_compare!(string_gt, >);
string_compare!(string_ge, >=);

// ============================================================================
// Scalar functions
// ============================================================================

pub fn integer_abs(input: &Integer) -> Integer {
    if input.is_null {
        return Integer::null();
    }
    Integer::new(input.val.abs())
}

pub fn real_abs(input: &Real) -> Real {
    if input.is_null {
        return Real::null();
    }
    Real::new(input.val.abs())
}

/// Unary float math, null-propagating
pub fn real_unary(input: &Real, f: fn(f64) -> f64) -> Real {
    if input.is_null {
        return Real::null();
    }
    Real::new(f(input.val))
}

pub fn real_atan2(left: &Real, right: &Real) -> Real {
    if left.is_null || right.is_null {
        return Real::null();
    }
    Real::new(left.val.atan2(right.val))
}

pub fn integer_to_real(input: &Integer) -> Real {
    if input.is_null {
        return Real::null();
    }
    Real::new(input.val as f64)
}

pub fn extract_year(input: &DateVal) -> Integer {
    if input.is_null {
        return Integer::null();
    }
    Integer::new(input.year() as i64)
}

pub fn concat(left: &StringVal, right: &StringVal) -> StringVal {
    if left.is_null || right.is_null {
        return StringVal::null();
    }
    let mut s = String::with_capacity(left.len + right.len);
    s.push_str(left.as_str());
    s.push_str(right.as_str());
    intern_runtime_string(s)
}

/// SQL LIKE with '%' (any run) and '_' (any one character)
pub fn like(input: &StringVal, pattern: &StringVal) -> BoolVal {
    if input.is_null || pattern.is_null {
        return BoolVal::null();
    }
    BoolVal::new(like_match(input.as_str(), pattern.as_str()))
}

fn like_match(input: &str, pattern: &str) -> bool {
    let input: Vec<char> = input.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_at(&input, &pattern)
}

fn like_match_at(input: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => input.is_empty(),
        Some('%') => {
            // Greedy run: try every split point
            (0..=input.len()).any(|skip| like_match_at(&input[skip..], &pattern[1..]))
        }
        Some('_') => !input.is_empty() && like_match_at(&input[1..], &pattern[1..]),
        Some(&c) => input.first() == Some(&c) && like_match_at(&input[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_propagates_null() {
        let a = Integer::new(3);
        let b = Integer::null();
        assert!(integer_add(&a, &b).is_null);
        assert_eq!(integer_add(&a, &a).val, 6);
    }

    #[test]
    fn sql_division_by_zero_is_null() {
        let a = Integer::new(10);
        let zero = Integer::new(0);
        assert!(integer_div(&a, &zero).is_null);
        assert!(integer_rem(&a, &zero).is_null);
    }

    #[test]
    fn force_truth_on_null_is_false() {
        assert!(!BoolVal::null().force_truth());
        assert!(!BoolVal::new(false).force_truth());
        assert!(BoolVal::new(true).force_truth());
    }

    #[test]
    fn comparisons_produce_null_on_null() {
        let a = Integer::new(1);
        assert!(integer_lt(&a, &Integer::null()).is_null);
        assert!(integer_lt(&a, &Integer::new(2)).val);
    }

    #[test]
    fn date_packing_preserves_order() {
        let early = DateVal::new(2019, 4, 1);
        let late = DateVal::new(2019, 12, 25);
        assert!(date_lt(&early, &late).val);
        assert_eq!(late.year(), 2019);
    }

    #[test]
    fn concat_and_like() {
        let a = StringVal::from_str("data");
        let b = StringVal::from_str("base");
        let joined = concat(&a, &b);
        assert_eq!(joined.as_str(), "database");

        let pattern = StringVal::from_str("data%");
        assert!(like(&joined, &pattern).val);
        let pattern = StringVal::from_str("d_ta_ase");
        assert!(like(&joined, &pattern).val);
        let pattern = StringVal::from_str("x%");
        assert!(!like(&joined, &pattern).val);
    }

    #[test]
    fn extract_year_from_date() {
        let d = DateVal::new(1994, 7, 2);
        assert_eq!(extract_year(&d).val, 1994);
    }
}
