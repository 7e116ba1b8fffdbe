//! The contract every column storage and overlay implements.

use crate::bits::BitVector;
use crate::types::{ColumnType, FilterOp, Indices, Range, RangeOrBitVector, SearchValidationResult, SqlValue};

/// Physical storage of one column, able to answer predicates over its rows.
///
/// Storages compose: an overlay owns an inner storage and combines the inner answer
/// with its own semantics, so a column is a chain of layers ending in a leaf that
/// owns the data. All searches are read-only.
pub trait Storage {
    /// Classifies `op` against `value` without scanning.
    ///
    /// Callers use `NoData` and `AllData` to skip work; `Ok` means a search is needed.
    fn validate_search_constraints(&self, value: SqlValue<'_>, op: FilterOp) -> SearchValidationResult;

    /// The rows in `range` that satisfy the predicate.
    ///
    /// A bit vector result has length `range.end`, with the bits before `range.start` unset.
    fn search(&self, op: FilterOp, value: SqlValue<'_>, range: Range) -> RangeOrBitVector;

    /// The positions of `indices` whose rows satisfy the predicate.
    ///
    /// A bit vector result has length `indices.size()`; a range result lies within it.
    fn index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> RangeOrBitVector;

    /// The contiguous positions of `indices` whose rows satisfy the predicate.
    ///
    /// `indices` must be sorted by this column's value order, and `op` must not be `Ne`.
    fn ordered_index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> Range;

    /// Reorders `rows` by this column's values.
    fn sort(&self, rows: &mut [u32]);

    /// Reorders `rows` by this column's values, keeping ties in their input order.
    fn stable_sort(&self, rows: &mut [u32]);

    /// A structural description of this storage and everything it wraps.
    fn serialize(&self) -> StorageDescriptor;

    /// The number of rows.
    fn size(&self) -> u32;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    #[inline(always)]
    fn validate_search_constraints(&self, value: SqlValue<'_>, op: FilterOp) -> SearchValidationResult {
        (**self).validate_search_constraints(value, op)
    }
    #[inline(always)]
    fn search(&self, op: FilterOp, value: SqlValue<'_>, range: Range) -> RangeOrBitVector {
        (**self).search(op, value, range)
    }
    #[inline(always)]
    fn index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> RangeOrBitVector {
        (**self).index_search(op, value, indices)
    }
    #[inline(always)]
    fn ordered_index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> Range {
        (**self).ordered_index_search(op, value, indices)
    }
    #[inline(always)] fn sort(&self, rows: &mut [u32]) { (**self).sort(rows) }
    #[inline(always)] fn stable_sort(&self, rows: &mut [u32]) { (**self).stable_sort(rows) }
    #[inline(always)] fn serialize(&self) -> StorageDescriptor { (**self).serialize() }
    #[inline(always)] fn size(&self) -> u32 { (**self).size() }
}

/// The serialized shape of a storage chain.
///
/// Overlays nest the descriptor of the storage they wrap, mirroring the chain.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum StorageDescriptor {
    Numeric(NumericDescriptor),
    DenseNullOverlay(DenseNullOverlayDescriptor),
}

/// A flat numeric column.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct NumericDescriptor {
    pub column_type: ColumnType,
    /// The values in native byte order.
    pub values: Vec<u8>,
}

/// A dense null overlay: its non-null mask, and the storage it wraps.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DenseNullOverlayDescriptor {
    pub bit_vector: BitVectorDescriptor,
    pub storage: Box<StorageDescriptor>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVectorDescriptor {
    pub words: Vec<u64>,
    pub size: u32,
}

impl From<&BitVector> for BitVectorDescriptor {
    fn from(bv: &BitVector) -> Self {
        Self { words: bv.words().to_vec(), size: bv.len() }
    }
}

impl From<BitVectorDescriptor> for BitVector {
    fn from(descriptor: BitVectorDescriptor) -> Self {
        BitVector::from_words(descriptor.words, descriptor.size)
    }
}
