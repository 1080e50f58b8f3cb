// src/sql/agg.rs
//
// Scalar aggregators. Each supports init, advance, merge, reset, and
// result. They are embedded directly in aggregation payload rows, so every
// struct is repr(C) with a fixed size and may be placement-initialized in
// raw memory.

use crate::sql::value::{Integer, Real};

/// COUNT(col): counts non-null inputs
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct CountAggregate {
    count: i64,
}

impl CountAggregate {
    pub fn init(&mut self) {
        self.count = 0;
    }

    pub fn advance(&mut self, input: &Integer) {
        if !input.is_null {
            self.count += 1;
        }
    }

    pub fn merge(&mut self, other: &CountAggregate) {
        self.count += other.count;
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn result(&self) -> Integer {
        Integer::new(self.count)
    }
}

/// COUNT(*): counts every row
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct CountStarAggregate {
    count: i64,
}

impl CountStarAggregate {
    pub fn init(&mut self) {
        self.count = 0;
    }

    pub fn advance(&mut self) {
        self.count += 1;
    }

    pub fn merge(&mut self, other: &CountStarAggregate) {
        self.count += other.count;
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn result(&self) -> Integer {
        Integer::new(self.count)
    }
}

macro_rules! integer_fold_aggregate {
    ($name:ident, $fold:expr, $start:expr) => {
        #[repr(C)]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name {
            value: i64,
            num_updates: u64,
        }

        impl $name {
            pub fn init(&mut self) {
                self.value = $start;
                self.num_updates = 0;
            }

            pub fn advance(&mut self, input: &Integer) {
                if input.is_null {
                    return;
                }
                let fold: fn(i64, i64) -> i64 = $fold;
                self.value = fold(self.value, input.val);
                self.num_updates += 1;
            }

            pub fn merge(&mut self, other: &$name) {
                if other.num_updates == 0 {
                    return;
                }
                let fold: fn(i64, i64) -> i64 = $fold;
                self.value = fold(self.value, other.value);
                self.num_updates += other.num_updates;
            }

            pub fn reset(&mut self) {
                self.init();
            }

            /// Null when no non-null input was seen
            pub fn result(&self) -> Integer {
                if self.num_updates == 0 {
                    Integer::null()
                } else {
                    Integer::new(self.value)
                }
            }
        }
    };
}

integer_fold_aggregate!(IntegerSumAggregate, |a, b| a.wrapping_add(b), 0);
integer_fold_aggregate!(IntegerMinAggregate, i64::min, i64::MAX);
integer_fold_aggregate!(IntegerMaxAggregate, i64::max, i64::MIN);

macro_rules! real_fold_aggregate {
    ($name:ident, $fold:expr, $start:expr) => {
        #[repr(C)]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name {
            value: f64,
            num_updates: u64,
        }

        impl $name {
            pub fn init(&mut self) {
                self.value = $start;
                self.num_updates = 0;
            }

            pub fn advance(&mut self, input: &Real) {
                if input.is_null {
                    return;
                }
                let fold: fn(f64, f64) -> f64 = $fold;
                self.value = fold(self.value, input.val);
                self.num_updates += 1;
            }

            pub fn merge(&mut self, other: &$name) {
                if other.num_updates == 0 {
                    return;
                }
                let fold: fn(f64, f64) -> f64 = $fold;
                self.value = fold(self.value, other.value);
                self.num_updates += other.num_updates;
            }

            pub fn reset(&mut self) {
                self.init();
            }

            pub fn result(&self) -> Real {
                if self.num_updates == 0 {
                    Real::null()
                } else {
                    Real::new(self.value)
                }
            }
        }
    };
}

real_fold_aggregate!(RealSumAggregate, |a, b| a + b, 0.0);
real_fold_aggregate!(RealMinAggregate, f64::min, f64::INFINITY);
real_fold_aggregate!(RealMaxAggregate, f64::max, f64::NEG_INFINITY);

/// AVG over integer or real inputs
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct AvgAggregate {
    sum: f64,
    count: u64,
}

impl AvgAggregate {
    pub fn init(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    pub fn advance_integer(&mut self, input: &Integer) {
        if input.is_null {
            return;
        }
        self.sum += input.val as f64;
        self.count += 1;
    }

    pub fn advance_real(&mut self, input: &Real) {
        if input.is_null {
            return;
        }
        self.sum += input.val;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &AvgAggregate) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn reset(&mut self) {
        self.init();
    }

    pub fn result(&self) -> Real {
        if self.count == 0 {
            Real::null()
        } else {
            Real::new(self.sum / self.count as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_skips_nulls() {
        let mut agg = CountAggregate::default();
        agg.init();
        agg.advance(&Integer::new(1));
        agg.advance(&Integer::null());
        agg.advance(&Integer::new(2));
        assert_eq!(agg.result().val, 2);
    }

    #[test]
    fn sum_min_max() {
        let mut sum = IntegerSumAggregate::default();
        let mut min = IntegerMinAggregate::default();
        let mut max = IntegerMaxAggregate::default();
        sum.init();
        min.init();
        max.init();
        for v in [5i64, -3, 10] {
            let val = Integer::new(v);
            sum.advance(&val);
            min.advance(&val);
            max.advance(&val);
        }
        assert_eq!(sum.result().val, 12);
        assert_eq!(min.result().val, -3);
        assert_eq!(max.result().val, 10);
    }

    #[test]
    fn empty_fold_is_null() {
        let mut min = IntegerMinAggregate::default();
        min.init();
        assert!(min.result().is_null);
    }

    #[test]
    fn merge_combines_partials() {
        let mut a = IntegerSumAggregate::default();
        let mut b = IntegerSumAggregate::default();
        a.init();
        b.init();
        a.advance(&Integer::new(10));
        b.advance(&Integer::new(32));
        a.merge(&b);
        assert_eq!(a.result().val, 42);
    }

    #[test]
    fn avg_divides_by_count() {
        let mut avg = AvgAggregate::default();
        avg.init();
        avg.advance_integer(&Integer::new(1));
        avg.advance_integer(&Integer::new(2));
        avg.advance_integer(&Integer::new(6));
        assert!((avg.result().val - 3.0).abs() < f64::EPSILON);
    }
}
