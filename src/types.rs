//! Value types shared by every storage: ranges, candidate row lists, predicates, and results.

use crate::bits::BitVector;

/// A half-open interval of rows, `[start, end)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    #[inline(always)]
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "range start {} exceeds end {}", start, end);
        Self { start, end }
    }

    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline(always)]
    pub fn contains(&self, row: u32) -> bool {
        self.start <= row && row < self.end
    }

    /// The rows in both ranges, or the default empty range if they are disjoint.
    pub fn intersect(&self, other: Range) -> Range {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end { Range { start, end } } else { Range::default() }
    }
}

impl From<std::ops::Range<u32>> for Range {
    fn from(range: std::ops::Range<u32>) -> Self {
        Range::new(range.start, range.end)
    }
}

/// What is known about the order of the row ids in an [`Indices`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IndicesState {
    /// Nothing is known.
    #[default]
    Unknown,
    /// Row ids are increasing.
    Monotonic,
    /// Row ids are known not to be increasing.
    Nonmonotonic,
}

/// A candidate subset of rows, addressed by position.
///
/// Searches over indices answer in *position space*: result bit (or range offset) `p`
/// refers to the row `data[p]`, not to row `p` itself.
#[derive(Copy, Clone, Debug)]
pub struct Indices<'a> {
    pub data: &'a [u32],
    pub state: IndicesState,
}

impl<'a> Indices<'a> {
    pub fn new(data: &'a [u32], state: IndicesState) -> Self {
        assert!(data.len() <= u32::MAX as usize, "too many indices: {}", data.len());
        Self { data, state }
    }

    /// The number of positions.
    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }
}

/// The outcome of a search: either a contiguous run of rows, or a bit per row.
///
/// Storages pick whichever representation is cheaper to produce. Extracting a
/// variant consumes the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeOrBitVector {
    Range(Range),
    BitVector(BitVector),
}

impl RangeOrBitVector {
    #[inline(always)]
    pub fn is_range(&self) -> bool {
        matches!(self, RangeOrBitVector::Range(_))
    }

    #[inline(always)]
    pub fn is_bit_vector(&self) -> bool {
        matches!(self, RangeOrBitVector::BitVector(_))
    }

    pub fn take_if_range(self) -> Option<Range> {
        match self {
            RangeOrBitVector::Range(range) => Some(range),
            RangeOrBitVector::BitVector(_) => None,
        }
    }

    pub fn take_if_bit_vector(self) -> Option<BitVector> {
        match self {
            RangeOrBitVector::Range(_) => None,
            RangeOrBitVector::BitVector(bv) => Some(bv),
        }
    }
}

impl From<Range> for RangeOrBitVector {
    fn from(range: Range) -> Self {
        RangeOrBitVector::Range(range)
    }
}

impl From<BitVector> for RangeOrBitVector {
    fn from(bv: BitVector) -> Self {
        RangeOrBitVector::BitVector(bv)
    }
}

/// A comparison applied to every candidate row.
///
/// `Ne` is split by callers into `Lt` and `Gt` before it can reach an ordered
/// index search.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    IsNull,
    IsNotNull,
}

/// A predicate operand.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum SqlValue<'a> {
    #[default]
    Null,
    Long(i64),
    Double(f64),
    String(&'a str),
}

impl SqlValue<'_> {
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Whether a predicate needs a scan, as far as a storage can tell without one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchValidationResult {
    /// A real search is required.
    Ok,
    /// No row can match.
    NoData,
    /// Every row matches.
    AllData,
}

/// The physical type of a numeric column.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Uint32,
    Int32,
    Int64,
    Double,
}
