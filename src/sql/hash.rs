// src/sql/hash.rs
//! Hashing for SQL values. All hash opcodes funnel through these helpers so
//! the interpreter, the aggregation table, and the join table agree on hash
//! values.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::sql::value::{DateVal, Integer, Real, StringVal};

fn hash_one<T: Hash>(value: T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Nulls all hash to a fixed sentinel so grouping treats them as equal
const NULL_HASH: u64 = 0;

pub fn hash_integer(value: &Integer) -> u64 {
    if value.is_null {
        return NULL_HASH;
    }
    hash_one(value.val)
}

pub fn hash_real(value: &Real) -> u64 {
    if value.is_null {
        return NULL_HASH;
    }
    hash_one(value.val.to_bits())
}

pub fn hash_date(value: &DateVal) -> u64 {
    if value.is_null {
        return NULL_HASH;
    }
    hash_one(value.val)
}

pub fn hash_string(value: &StringVal) -> u64 {
    if value.is_null {
        return NULL_HASH;
    }
    hash_one(value.as_str().as_bytes())
}

/// Mix a new hash into an accumulated one (boost-style combine)
pub fn hash_combine(seed: u64, new_hash: u64) -> u64 {
    seed ^ (new_hash
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_hash_equal() {
        assert_eq!(
            hash_integer(&Integer::new(42)),
            hash_integer(&Integer::new(42))
        );
        assert_eq!(
            hash_string(&StringVal::from_str("abc")),
            hash_string(&StringVal::from_str("abc"))
        );
    }

    #[test]
    fn nulls_hash_to_sentinel() {
        assert_eq!(hash_integer(&Integer::null()), NULL_HASH);
        assert_eq!(hash_real(&Real::null()), NULL_HASH);
    }

    #[test]
    fn combine_is_order_sensitive() {
        let a = hash_integer(&Integer::new(1));
        let b = hash_integer(&Integer::new(2));
        assert_ne!(hash_combine(a, b), hash_combine(b, a));
    }
}
