//! Building blocks for leaf storages: comparison loops and early-return helpers.

use crate::bits::{Builder, BITS_IN_WORD};
use crate::types::{FilterOp, Range, RangeOrBitVector, SearchValidationResult, SqlValue};

/// Appends `comparator(data[i], val)` for consecutive `data` until `builder` is full.
///
/// Single bits are appended up to the builder's next word boundary, then whole 64-row
/// words, then single bits for the remainder. The word loop has no branches and is
/// meant to be auto-vectorized. `data` must hold at least `builder.bits_until_full()`
/// values.
#[inline]
pub fn linear_search_with_comparator<T, V, F>(val: V, data: &[T], comparator: F, builder: &mut Builder)
where
    T: Copy,
    V: Copy,
    F: Fn(T, V) -> bool,
{
    let front = builder.bits_until_word_boundary_or_full() as usize;
    let (head, rest) = data.split_at(front);
    for &value in head {
        builder.append(comparator(value, val));
    }

    let fast = builder.bits_in_complete_words_until_full() as usize;
    let (body, rest) = rest.split_at(fast);
    for chunk in body.chunks_exact(BITS_IN_WORD as usize) {
        let mut word = 0u64;
        for (k, &value) in chunk.iter().enumerate() {
            word |= (comparator(value, val) as u64) << k;
        }
        builder.append_word(word);
    }

    let back = builder.bits_until_full() as usize;
    for &value in &rest[..back] {
        builder.append(comparator(value, val));
    }
}

/// Appends `comparator(data[indices[k]], val)` for consecutive `k` until `builder` is full.
///
/// The indirection defeats vectorization of an unaligned prefix, so the builder must
/// start at a word boundary: whole 64-row words first, then single bits.
#[inline]
pub fn index_search_with_comparator<T, V, F>(val: V, data: &[T], indices: &[u32], comparator: F, builder: &mut Builder)
where
    T: Copy,
    V: Copy,
    F: Fn(T, V) -> bool,
{
    debug_assert_eq!(builder.bits_until_word_boundary_or_full(), 0);

    let fast = builder.bits_in_complete_words_until_full() as usize;
    let (body, rest) = indices.split_at(fast);
    for chunk in body.chunks_exact(BITS_IN_WORD as usize) {
        let mut word = 0u64;
        for (k, &index) in chunk.iter().enumerate() {
            word |= (comparator(data[index as usize], val) as u64) << k;
        }
        builder.append_word(word);
    }

    let back = builder.bits_until_full() as usize;
    for &index in &rest[..back] {
        builder.append(comparator(data[index as usize], val));
    }
}

/// Prepares a double operand for comparison against an integer column.
///
/// Integral doubles become `Long` and need a search. Otherwise `Eq` cannot match and
/// `Ne` always does; ordered comparisons are rewritten to the equivalent comparison
/// against the neighbouring integer, for example `x < 2.5` becomes `x < 3`. NaN matches
/// nothing except `Ne`.
///
/// The conversion saturates at the `i64` bounds, so callers classify doubles outside
/// the column type's range before calling this.
pub fn compare_int_column_with_double(value: &mut SqlValue<'_>, op: FilterOp) -> SearchValidationResult {
    let SqlValue::Double(double) = *value else {
        panic!("expected a double operand, found {:?}", value);
    };
    if double.is_nan() {
        return match op {
            FilterOp::Ne => SearchValidationResult::AllData,
            FilterOp::IsNull | FilterOp::IsNotNull => panic!("invalid filter operation {:?}", op),
            _ => SearchValidationResult::NoData,
        };
    }
    if double.trunc() == double {
        *value = SqlValue::Long(double as i64);
        return SearchValidationResult::Ok;
    }
    match op {
        FilterOp::Eq => return SearchValidationResult::NoData,
        FilterOp::Ne => return SearchValidationResult::AllData,
        FilterOp::Le | FilterOp::Gt => *value = SqlValue::Long(double.floor() as i64),
        FilterOp::Lt | FilterOp::Ge => *value = SqlValue::Long(double.ceil() as i64),
        FilterOp::IsNull | FilterOp::IsNotNull => panic!("invalid filter operation {:?}", op),
    }
    SearchValidationResult::Ok
}

/// The answer over `range` implied by `validation`, if no search is needed.
#[inline]
pub fn can_return_early(validation: SearchValidationResult, range: Range) -> Option<Range> {
    match validation {
        SearchValidationResult::Ok => None,
        SearchValidationResult::AllData => Some(range),
        SearchValidationResult::NoData => Some(Range::default()),
    }
}

/// The answer over `indices_size` positions implied by `validation`, if no search is needed.
#[inline]
pub fn can_return_early_indices(validation: SearchValidationResult, indices_size: u32) -> Option<Range> {
    can_return_early(validation, Range::new(0, indices_size))
}

/// Expands a search result into its selected rows (or positions), in increasing order.
pub fn to_index_vector(result: RangeOrBitVector) -> Vec<u32> {
    match result {
        RangeOrBitVector::Range(range) => (range.start..range.end).collect(),
        RangeOrBitVector::BitVector(bv) => bv.iter_set_bits().collect(),
    }
}
