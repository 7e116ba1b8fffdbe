//! A scripted [`Storage`] for exercising overlays without a real column.

use crate::bits::{BitVector, Builder};
use crate::storage::{Storage, StorageDescriptor};
use crate::types::{FilterOp, Indices, Range, RangeOrBitVector, SearchValidationResult, SqlValue};

/// How a [`FakeStorage`] answers searches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Every row matches.
    All,
    /// No row matches.
    None,
    /// Exactly the rows of a fixed range match.
    Range,
    /// Exactly the set rows of a fixed bit vector match.
    BitVector,
}

/// A storage whose searches ignore the predicate and return a fixed answer.
///
/// Validation always reports `Ok`, so callers take their full search path.
#[derive(Clone, Debug)]
pub struct FakeStorage {
    size: u32,
    strategy: SearchStrategy,
    range: Range,
    bit_vector: BitVector,
}

impl FakeStorage {
    fn new(size: u32, strategy: SearchStrategy) -> Self {
        Self { size, strategy, range: Range::default(), bit_vector: BitVector::new() }
    }

    /// A storage of `size` rows on which every search matches every row.
    pub fn search_all(size: u32) -> Self {
        Self::new(size, SearchStrategy::All)
    }

    /// A storage of `size` rows on which every search matches nothing.
    pub fn search_none(size: u32) -> Self {
        Self::new(size, SearchStrategy::None)
    }

    /// A storage of `size` rows on which every search matches the rows of `range`.
    pub fn search_subset_range(size: u32, range: Range) -> Self {
        Self { range, ..Self::new(size, SearchStrategy::Range) }
    }

    /// A storage of `size` rows on which every search matches the set bits of `bit_vector`.
    pub fn search_subset_bit_vector(size: u32, bit_vector: BitVector) -> Self {
        Self { bit_vector, ..Self::new(size, SearchStrategy::BitVector) }
    }

    /// A storage of `size` rows on which every search matches the listed rows.
    pub fn search_subset_rows(size: u32, rows: &[u32]) -> Self {
        let mut bit_vector = BitVector::repeat(false, size);
        for &row in rows {
            bit_vector.set(row);
        }
        Self::search_subset_bit_vector(size, bit_vector)
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Whether `row` is one of the scripted matches, for the subset strategies.
    #[inline]
    fn matches(&self, row: u32) -> bool {
        match self.strategy {
            SearchStrategy::Range => self.range.contains(row),
            SearchStrategy::BitVector => row < self.bit_vector.len() && self.bit_vector.is_set(row),
            SearchStrategy::All => true,
            SearchStrategy::None => false,
        }
    }
}

impl Storage for FakeStorage {
    fn validate_search_constraints(&self, _value: SqlValue<'_>, _op: FilterOp) -> SearchValidationResult {
        SearchValidationResult::Ok
    }

    fn search(&self, _op: FilterOp, _value: SqlValue<'_>, range: Range) -> RangeOrBitVector {
        match self.strategy {
            SearchStrategy::All => range.into(),
            SearchStrategy::None => Range::default().into(),
            SearchStrategy::Range => range.intersect(self.range).into(),
            SearchStrategy::BitVector => self.bit_vector.intersect_range(range.start, range.end).into(),
        }
    }

    fn index_search(&self, _op: FilterOp, _value: SqlValue<'_>, indices: Indices<'_>) -> RangeOrBitVector {
        match self.strategy {
            SearchStrategy::All => Range::new(0, indices.size()).into(),
            SearchStrategy::None => Range::default().into(),
            SearchStrategy::Range | SearchStrategy::BitVector => {
                let mut builder = Builder::new(indices.size());
                for &row in indices.data {
                    builder.append(self.matches(row));
                }
                builder.build().into()
            }
        }
    }

    fn ordered_index_search(&self, _op: FilterOp, _value: SqlValue<'_>, indices: Indices<'_>) -> Range {
        match self.strategy {
            SearchStrategy::All => Range::new(0, indices.size()),
            SearchStrategy::None => Range::default(),
            SearchStrategy::Range | SearchStrategy::BitVector => {
                // Matching rows are assumed to form one run, preceded by non-matching rows.
                let first_match = indices.data.partition_point(|&row| !self.matches(row));
                let run = indices.data[first_match..].partition_point(|&row| self.matches(row));
                Range::new(first_match as u32, (first_match + run) as u32)
            }
        }
    }

    fn sort(&self, _rows: &mut [u32]) {
        panic!("FakeStorage::sort is not implemented");
    }

    fn stable_sort(&self, _rows: &mut [u32]) {
        panic!("FakeStorage::stable_sort is not implemented");
    }

    fn serialize(&self) -> StorageDescriptor {
        panic!("FakeStorage cannot be serialized");
    }

    fn size(&self) -> u32 {
        self.size
    }
}
