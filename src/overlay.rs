//! Null semantics layered over a storage that knows nothing about nulls.

use crate::bits::{BitVector, Builder};
use crate::observability::{log_trace, search_span};
use crate::storage::{DenseNullOverlayDescriptor, Storage, StorageDescriptor};
use crate::types::{FilterOp, Indices, IndicesState, Range, RangeOrBitVector, SearchValidationResult, SqlValue};

/// A storage whose rows are null wherever `non_null` is unset.
///
/// The overlay is "dense": `inner` has a physical slot for every row, null or not,
/// and the contents of null rows' slots are never consulted for a match. The overlay
/// owns `inner` and borrows `non_null`, which belongs to the enclosing column and
/// must not change while a search is running.
///
/// Value predicates are answered by `inner` and then masked by `non_null`; `IsNull`
/// adds back the null rows.
pub struct DenseNullOverlay<'a, S = Box<dyn Storage + 'a>> {
    inner: S,
    non_null: &'a BitVector,
}

impl<'a, S: Storage> DenseNullOverlay<'a, S> {
    pub fn new(inner: S, non_null: &'a BitVector) -> Self {
        Self { inner, non_null }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn non_null(&self) -> &'a BitVector {
        self.non_null
    }

    /// One bit per position of `indices`, set where the row is non-null.
    fn non_null_positions(&self, indices: Indices<'_>) -> BitVector {
        let mut builder = Builder::new(indices.size());
        for &row in indices.data {
            builder.append(self.non_null.is_set(row));
        }
        builder.build()
    }

    /// A bit vector of length `range.end`, set exactly at the null rows in `range`.
    fn null_rows(&self, range: Range) -> BitVector {
        let mut nulls = self.non_null.intersect_range(range.start, range.end);
        nulls.not();
        nulls.and(&BitVector::range(range.start, range.end));
        nulls
    }
}

impl<'a, S: Storage> Storage for DenseNullOverlay<'a, S> {
    fn validate_search_constraints(&self, value: SqlValue<'_>, op: FilterOp) -> SearchValidationResult {
        // The mask alone can always answer a nullness predicate.
        if op == FilterOp::IsNull {
            return SearchValidationResult::Ok;
        }
        self.inner.validate_search_constraints(value, op)
    }

    fn search(&self, op: FilterOp, value: SqlValue<'_>, range: Range) -> RangeOrBitVector {
        let _span = search_span!("dense_null_overlay::search", op);

        if op == FilterOp::IsNull {
            match self.inner.validate_search_constraints(value, op) {
                SearchValidationResult::NoData => {
                    log_trace!(component = "dense_null_overlay", event = "is_null_from_mask", start = range.start, end = range.end);
                    return self.null_rows(range).into();
                }
                SearchValidationResult::AllData => return range.into(),
                SearchValidationResult::Ok => {}
            }
        }

        let mut result = match self.inner.search(op, value, range) {
            RangeOrBitVector::Range(inner) => {
                debug_assert!(inner.is_empty() || (inner.start >= range.start && inner.end <= range.end));
                // Keep the non-null rows of the inner range, padded out to `range.end`.
                let mut masked = self.non_null.intersect_range(inner.start, inner.end);
                masked.resize(range.end, false);
                masked
            }
            RangeOrBitVector::BitVector(bv) => bv,
        };

        if op == FilterOp::IsNull {
            // Null rows match whatever their physical slot holds.
            result.or(&self.null_rows(range));
        } else {
            // Null rows never match a value predicate.
            result.and(self.non_null);
        }

        debug_assert_eq!(result.len(), range.end);
        result.into()
    }

    fn index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> RangeOrBitVector {
        let _span = search_span!("dense_null_overlay::index_search", op);

        if op == FilterOp::IsNull {
            match self.inner.validate_search_constraints(value, op) {
                SearchValidationResult::NoData => {
                    log_trace!(component = "dense_null_overlay", event = "is_null_from_mask", positions = indices.size());
                    let mut builder = Builder::new(indices.size());
                    for &row in indices.data {
                        builder.append(!self.non_null.is_set(row));
                    }
                    return builder.build().into();
                }
                SearchValidationResult::AllData => return Range::new(0, indices.size()).into(),
                SearchValidationResult::Ok => {}
            }
        }

        let mut result = match self.inner.index_search(op, value, indices) {
            RangeOrBitVector::Range(inner) => {
                debug_assert!(inner.end <= indices.size());
                let mut builder = Builder::with_offset(indices.size(), inner.start);
                for &row in &indices.data[inner.start as usize..inner.end as usize] {
                    builder.append(self.non_null.is_set(row));
                }
                builder.build()
            }
            RangeOrBitVector::BitVector(bv) => bv,
        };

        let non_null = self.non_null_positions(indices);
        if op == FilterOp::IsNull {
            let mut null = non_null;
            null.not();
            result.or(&null);
        } else {
            result.and(&non_null);
        }

        debug_assert_eq!(result.len(), indices.size());
        result.into()
    }

    fn ordered_index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> Range {
        // Not-equal is split into two ordered searches by the caller.
        assert!(op != FilterOp::Ne, "Ne must be split by the caller before an ordered search");

        let _span = search_span!("dense_null_overlay::ordered_index_search", op);

        // Null rows are ordered first; find the first non-null one.
        let offset = indices.data.partition_point(|&row| !self.non_null.is_set(row));

        if op == FilterOp::IsNull {
            return Range::new(0, offset as u32);
        }

        if op == FilterOp::IsNotNull {
            match self.inner.validate_search_constraints(value, op) {
                SearchValidationResult::NoData => return Range::default(),
                SearchValidationResult::AllData => return Range::new(offset as u32, indices.size()),
                SearchValidationResult::Ok => {}
            }
        }

        let non_null = Indices::new(&indices.data[offset..], IndicesState::Nonmonotonic);
        let inner = self.inner.ordered_index_search(op, value, non_null);
        Range::new(inner.start + offset as u32, inner.end + offset as u32)
    }

    fn sort(&self, _rows: &mut [u32]) {
        // TODO: order null rows first, then delegate the non-null rows to `inner`.
        panic!("DenseNullOverlay::sort is not implemented");
    }

    fn stable_sort(&self, _rows: &mut [u32]) {
        panic!("DenseNullOverlay::stable_sort is not implemented");
    }

    fn serialize(&self) -> StorageDescriptor {
        StorageDescriptor::DenseNullOverlay(DenseNullOverlayDescriptor {
            bit_vector: self.non_null.into(),
            storage: Box::new(self.inner.serialize()),
        })
    }

    fn size(&self) -> u32 {
        self.inner.size()
    }
}

#[cfg(test)]
mod test {

    use super::DenseNullOverlay;
    use crate::storage::{Storage, StorageDescriptor};
    use crate::types::{FilterOp, Indices, IndicesState, Range, RangeOrBitVector, SearchValidationResult, SqlValue};
    use crate::utils::to_index_vector;
    use crate::{BitVector, FakeStorage, NumericStorage};

    /// Answers validation with a fixed classification and every search from `inner`.
    struct ScriptedValidation {
        validation: SearchValidationResult,
        inner: FakeStorage,
    }

    impl Storage for ScriptedValidation {
        fn validate_search_constraints(&self, _value: SqlValue<'_>, _op: FilterOp) -> SearchValidationResult {
            self.validation
        }
        fn search(&self, op: FilterOp, value: SqlValue<'_>, range: Range) -> RangeOrBitVector {
            self.inner.search(op, value, range)
        }
        fn index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> RangeOrBitVector {
            self.inner.index_search(op, value, indices)
        }
        fn ordered_index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> Range {
            self.inner.ordered_index_search(op, value, indices)
        }
        fn sort(&self, rows: &mut [u32]) { self.inner.sort(rows) }
        fn stable_sort(&self, rows: &mut [u32]) { self.inner.stable_sort(rows) }
        fn serialize(&self) -> StorageDescriptor { self.inner.serialize() }
        fn size(&self) -> u32 { self.inner.size() }
    }

    fn scripted(validation: SearchValidationResult, size: u32) -> ScriptedValidation {
        // The inner answer is never the expected one, so a fall through is caught.
        ScriptedValidation { validation, inner: FakeStorage::search_subset_rows(size, &[0]) }
    }

    fn bits(values: &[u8]) -> BitVector {
        values.iter().map(|&x| x == 1).collect()
    }

    fn unordered(data: &[u32]) -> Indices<'_> {
        Indices::new(data, IndicesState::Nonmonotonic)
    }

    #[test]
    fn no_filtering_search() {
        let numeric = NumericStorage::new(vec![0u32, 1, 0, 1, 0]);
        let non_null = bits(&[0, 1, 0, 1, 0]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let result = storage.search(FilterOp::Ge, SqlValue::Long(0), Range::new(0, 5));
        assert_eq!(to_index_vector(result), vec![1, 3]);
    }

    #[test]
    fn restrict_input_search() {
        let numeric = NumericStorage::new(vec![0u32, 1, 0, 1, 0]);
        let non_null = bits(&[0, 1, 0, 1, 0]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let result = storage.search(FilterOp::Ge, SqlValue::Long(0), Range::new(1, 3));
        assert_eq!(result.clone().take_if_bit_vector().map(|bv| bv.len()), Some(3));
        assert_eq!(to_index_vector(result), vec![1]);
    }

    #[test]
    fn range_filter_search() {
        let fake = FakeStorage::search_subset_range(5, Range::new(1, 3));
        let non_null = bits(&[0, 1, 0, 1, 0]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let result = storage.search(FilterOp::Ge, SqlValue::Long(0), Range::new(0, 5));
        assert_eq!(to_index_vector(result), vec![1]);
    }

    #[test]
    fn bit_vector_filter_search() {
        let fake = FakeStorage::search_subset_bit_vector(5, bits(&[0, 1, 1, 0, 0]));
        let non_null = bits(&[0, 1, 0, 1, 0]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let result = storage.search(FilterOp::Ge, SqlValue::Long(0), Range::new(0, 5));
        assert_eq!(to_index_vector(result), vec![1]);
    }

    #[test]
    fn is_null_search() {
        let fake = FakeStorage::search_subset_bit_vector(5, bits(&[1, 1, 0, 0, 1]));
        let non_null = bits(&[1, 0, 0, 1, 1]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let result = storage.search(FilterOp::IsNull, SqlValue::Null, Range::new(0, 5));
        assert_eq!(to_index_vector(result), vec![0, 1, 2, 4]);
    }

    #[test]
    fn is_null_search_restricted_range() {
        let fake = FakeStorage::search_none(6);
        let non_null = bits(&[0, 0, 1, 0, 1, 0]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let result = storage.search(FilterOp::IsNull, SqlValue::Null, Range::new(2, 5));
        assert_eq!(result.clone().take_if_bit_vector().map(|bv| bv.len()), Some(5));
        assert_eq!(to_index_vector(result), vec![3]);
    }

    #[test]
    fn is_null_search_skips_inner() {
        // Numeric storage has no nulls, so only the mask is consulted.
        let numeric = NumericStorage::new(vec![7i64; 6]);
        let non_null = bits(&[1, 0, 1, 0, 0, 1]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let result = storage.search(FilterOp::IsNull, SqlValue::Null, Range::new(1, 5));
        assert_eq!(result.clone().take_if_bit_vector().map(|bv| bv.len()), Some(5));
        assert_eq!(to_index_vector(result), vec![1, 3, 4]);
    }

    #[test]
    fn is_not_null_search() {
        let numeric = NumericStorage::new(vec![7i64; 6]);
        let non_null = bits(&[1, 0, 1, 0, 0, 1]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let result = storage.search(FilterOp::IsNotNull, SqlValue::Null, Range::new(0, 6));
        assert_eq!(to_index_vector(result), vec![0, 2, 5]);
    }

    #[test]
    fn value_search_masks_every_row() {
        let data: Vec<u32> = (0..300).map(|i| i % 5).collect();
        let non_null: BitVector = (0..300).map(|i| i % 3 != 0).collect();
        let inner = NumericStorage::new(data.clone());
        let storage = DenseNullOverlay::new(inner, &non_null);

        for range in [Range::new(0, 300), Range::new(17, 250), Range::new(64, 128)] {
            let result = storage.search(FilterOp::Le, SqlValue::Long(2), range).take_if_bit_vector();
            let result = result.expect("value searches answer with a bit vector");
            assert_eq!(result.len(), range.end);
            for row in 0..range.end {
                let expected = range.contains(row) && data[row as usize] <= 2 && non_null.is_set(row);
                assert_eq!(result.is_set(row), expected, "row {}", row);
            }
        }
    }

    #[test]
    fn is_null_ignores_inner_contents() {
        let non_null: BitVector = (0..130).map(|i| i % 4 == 0).collect();
        let range = Range::new(3, 129);
        for fake in [
            FakeStorage::search_all(130),
            FakeStorage::search_none(130),
            FakeStorage::search_subset_range(130, Range::new(10, 20)),
        ] {
            let storage = DenseNullOverlay::new(fake, &non_null);
            let result = storage.search(FilterOp::IsNull, SqlValue::Null, range);
            let rows = to_index_vector(result);
            let nulls: Vec<u32> = (3..129).filter(|&row| !non_null.is_set(row)).collect();
            assert!(nulls.iter().all(|row| rows.contains(row)));
            assert!(rows.iter().all(|&row| range.contains(row)));
        }
    }

    #[test]
    fn index_search() {
        let numeric = NumericStorage::new(vec![1u32, 0, 0, 1, 1, 1]);
        let non_null = bits(&[1, 0, 0, 1, 1, 1]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let indices = [5, 2, 3, 4, 1];
        let result = storage.index_search(FilterOp::Ge, SqlValue::Long(0), unordered(&indices));
        assert_eq!(to_index_vector(result), vec![0, 2, 3]);
    }

    #[test]
    fn is_null_index_search() {
        let fake = FakeStorage::search_subset_bit_vector(6, bits(&[0, 0, 0, 1, 1, 1]));
        let non_null = bits(&[0, 1, 0, 1, 1, 1]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let indices = [5, 2, 3, 4, 1];
        let result = storage.index_search(FilterOp::IsNull, SqlValue::Null, unordered(&indices));
        assert_eq!(to_index_vector(result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn is_null_index_search_from_mask() {
        let numeric = NumericStorage::new(vec![0u32; 6]);
        let non_null = bits(&[0, 1, 0, 1, 1, 1]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let indices = [5, 2, 3, 0, 1];
        let result = storage.index_search(FilterOp::IsNull, SqlValue::Null, unordered(&indices));
        assert_eq!(result.clone().take_if_bit_vector().map(|bv| bv.len()), Some(5));
        assert_eq!(to_index_vector(result), vec![1, 3]);
    }

    #[test]
    fn index_search_inner_range() {
        let fake = FakeStorage::search_all(6);
        let non_null = bits(&[0, 1, 0, 1, 1, 1]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let indices = [5, 2, 3, 0, 1];
        let result = storage.index_search(FilterOp::Eq, SqlValue::Long(3), unordered(&indices));
        assert_eq!(to_index_vector(result), vec![0, 2, 4]);

        // Null rows match IsNull even where the inner storage did not match them.
        let fake = FakeStorage::search_subset_range(6, Range::new(3, 6));
        let storage = DenseNullOverlay::new(fake, &non_null);
        let result = storage.index_search(FilterOp::IsNull, SqlValue::Null, unordered(&indices));
        assert_eq!(to_index_vector(result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn ordered_index_search_is_null() {
        let numeric = NumericStorage::new(vec![0u32, 4, 0, 2, 3, 0]);
        let non_null = bits(&[0, 1, 0, 1, 1, 0]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        // Nulls first, then non-null rows in value order.
        let indices = [0, 2, 5, 3, 4, 1];
        let is_null = storage.ordered_index_search(FilterOp::IsNull, SqlValue::Null, unordered(&indices));
        assert_eq!(is_null, Range::new(0, 3));
        let is_not_null = storage.ordered_index_search(FilterOp::IsNotNull, SqlValue::Null, unordered(&indices));
        assert_eq!(is_not_null, Range::new(3, 6));
    }

    #[test]
    fn ordered_index_search_values() {
        let numeric = NumericStorage::new(vec![0u32, 4, 0, 2, 3, 0]);
        let non_null = bits(&[0, 1, 0, 1, 1, 0]);
        let storage = DenseNullOverlay::new(numeric, &non_null);

        let indices = [0, 2, 5, 3, 4, 1];
        let ge = storage.ordered_index_search(FilterOp::Ge, SqlValue::Long(3), unordered(&indices));
        assert_eq!(ge, Range::new(4, 6));
        let eq = storage.ordered_index_search(FilterOp::Eq, SqlValue::Long(2), unordered(&indices));
        assert_eq!(eq, Range::new(3, 4));
        // Null rows hold zeros physically, but must not match.
        let eq = storage.ordered_index_search(FilterOp::Eq, SqlValue::Long(0), unordered(&indices));
        assert!(eq.is_empty());
    }

    #[test]
    fn ordered_index_search_through_fake() {
        let fake = FakeStorage::search_subset_range(6, Range::new(3, 5));
        let non_null = bits(&[0, 0, 1, 1, 1, 1]);
        let storage = DenseNullOverlay::new(fake, &non_null);

        let indices = [1, 0, 2, 3, 4, 5];
        let result = storage.ordered_index_search(FilterOp::Lt, SqlValue::Long(0), unordered(&indices));
        assert_eq!(result, Range::new(3, 5));
    }

    #[test]
    #[should_panic(expected = "Ne must be split")]
    fn ordered_index_search_rejects_ne() {
        let non_null = bits(&[1, 1]);
        let storage = DenseNullOverlay::new(FakeStorage::search_all(2), &non_null);
        storage.ordered_index_search(FilterOp::Ne, SqlValue::Long(0), unordered(&[0, 1]));
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn sort_is_fatal() {
        let non_null = bits(&[1, 1]);
        let storage = DenseNullOverlay::new(NumericStorage::new(vec![2u32, 1]), &non_null);
        storage.sort(&mut [0, 1]);
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn stable_sort_is_fatal() {
        let non_null = bits(&[1, 1]);
        let storage = DenseNullOverlay::new(NumericStorage::new(vec![2u32, 1]), &non_null);
        storage.stable_sort(&mut [0, 1]);
    }

    #[test]
    fn validate_is_null_always_searches() {
        let non_null = bits(&[1, 0]);
        let storage = DenseNullOverlay::new(NumericStorage::new(vec![2u32, 1]), &non_null);
        assert_eq!(storage.validate_search_constraints(SqlValue::Null, FilterOp::IsNull), SearchValidationResult::Ok);
        assert_eq!(storage.validate_search_constraints(SqlValue::Null, FilterOp::Eq), SearchValidationResult::NoData);
        assert_eq!(storage.validate_search_constraints(SqlValue::Long(1), FilterOp::Eq), SearchValidationResult::Ok);
    }

    #[test]
    fn is_null_search_inner_all_data() {
        let non_null = bits(&[0, 1, 0, 1, 1, 0]);
        let storage = DenseNullOverlay::new(scripted(SearchValidationResult::AllData, 6), &non_null);

        let result = storage.search(FilterOp::IsNull, SqlValue::Null, Range::new(1, 4));
        assert_eq!(result, RangeOrBitVector::Range(Range::new(1, 4)));
    }

    #[test]
    fn is_null_index_search_inner_all_data() {
        let non_null = bits(&[0, 1, 0, 1, 1, 0]);
        let storage = DenseNullOverlay::new(scripted(SearchValidationResult::AllData, 6), &non_null);

        let indices = [4, 1, 3];
        let result = storage.index_search(FilterOp::IsNull, SqlValue::Null, unordered(&indices));
        assert_eq!(result, RangeOrBitVector::Range(Range::new(0, 3)));
    }

    #[test]
    fn ordered_is_not_null_inner_no_data() {
        let non_null = bits(&[0, 1, 0, 1, 1, 0]);
        let storage = DenseNullOverlay::new(scripted(SearchValidationResult::NoData, 6), &non_null);

        let indices = [0, 2, 5, 1, 3, 4];
        let result = storage.ordered_index_search(FilterOp::IsNotNull, SqlValue::Null, unordered(&indices));
        assert!(result.is_empty());
        assert_eq!(result, Range::default());
    }

    #[test]
    fn ordered_is_not_null_inner_all_data() {
        let non_null = bits(&[0, 1, 0, 1, 1, 0]);
        let storage = DenseNullOverlay::new(scripted(SearchValidationResult::AllData, 6), &non_null);

        let indices = [0, 2, 5, 1, 3, 4];
        let result = storage.ordered_index_search(FilterOp::IsNotNull, SqlValue::Null, unordered(&indices));
        assert_eq!(result, Range::new(3, 6));
    }

    #[test]
    fn serialize_nests_inner() {
        let non_null = bits(&[1, 0, 1]);
        let storage = DenseNullOverlay::new(NumericStorage::new(vec![1u32, 2, 3]), &non_null);
        let standalone = storage.inner().serialize();

        match storage.serialize() {
            StorageDescriptor::DenseNullOverlay(descriptor) => {
                assert_eq!(BitVector::from(descriptor.bit_vector), *storage.non_null());
                assert_eq!(*descriptor.storage, standalone);
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }

    #[test]
    fn nested_overlays() {
        // Outer mask nulls row 0, inner mask nulls row 3.
        let inner_non_null = bits(&[1, 1, 1, 0, 1]);
        let outer_non_null = bits(&[0, 1, 1, 1, 1]);
        let numeric = NumericStorage::new(vec![5u32, 5, 1, 5, 5]);
        let inner: Box<dyn Storage + '_> = Box::new(DenseNullOverlay::new(numeric, &inner_non_null));
        let storage = DenseNullOverlay::new(inner, &outer_non_null);

        let result = storage.search(FilterOp::Eq, SqlValue::Long(5), Range::new(0, 5));
        assert_eq!(to_index_vector(result), vec![1, 4]);

        let result = storage.search(FilterOp::IsNull, SqlValue::Null, Range::new(0, 5));
        assert_eq!(to_index_vector(result), vec![0, 3]);

        match storage.serialize() {
            StorageDescriptor::DenseNullOverlay(outer) => {
                assert!(matches!(*outer.storage, StorageDescriptor::DenseNullOverlay(_)));
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }

    #[test]
    fn inner_range_result_is_sized() {
        let fake = FakeStorage::search_all(200);
        let non_null: BitVector = (0..200).map(|i| i % 2 == 0).collect();
        let storage = DenseNullOverlay::new(fake, &non_null);
        let result = storage.search(FilterOp::Gt, SqlValue::Long(0), Range::new(70, 190));
        match result {
            RangeOrBitVector::BitVector(bv) => {
                assert_eq!(bv.len(), 190);
                assert!(bv.iter_set_bits().eq((70..190).step_by(2)));
            }
            RangeOrBitVector::Range(range) => panic!("unexpected range {:?}", range),
        }
    }
}
