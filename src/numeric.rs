//! Flat, non-nullable numeric columns.

use std::cmp::Ordering;

use crate::bits::Builder;
use crate::observability::log_debug;
use crate::storage::{NumericDescriptor, Storage, StorageDescriptor};
use crate::types::{ColumnType, FilterOp, Indices, Range, RangeOrBitVector, SearchValidationResult, SqlValue};
use crate::utils;

/// A primitive type that can back a [`NumericStorage`].
pub trait NumericType: Copy + PartialOrd + bytemuck::Pod + std::fmt::Debug {
    /// The physical type recorded when serializing.
    const COLUMN_TYPE: ColumnType;

    /// Classifies a comparison against a non-null numeric `value`.
    fn classify(value: SqlValue<'_>, op: FilterOp) -> SearchValidationResult;

    /// Converts `value` to the column type, once `classify` has returned `Ok`.
    fn coerce(value: SqlValue<'_>, op: FilterOp) -> Self;
}

/// Classification of `column op value` when `value` is above every value of the column type.
fn above_max(op: FilterOp) -> SearchValidationResult {
    match op {
        FilterOp::Eq | FilterOp::Gt | FilterOp::Ge => SearchValidationResult::NoData,
        _ => SearchValidationResult::AllData,
    }
}

/// Classification of `column op value` when `value` is below every value of the column type.
fn below_min(op: FilterOp) -> SearchValidationResult {
    match op {
        FilterOp::Eq | FilterOp::Lt | FilterOp::Le => SearchValidationResult::NoData,
        _ => SearchValidationResult::AllData,
    }
}

/// An integer operand after any double rewriting, or the classification that made it moot.
///
/// `min` and `max` are the column type's bounds. Doubles whose neighbouring integers
/// fall outside them are classified here, before a conversion to `i64` could saturate.
fn integer_operand(value: SqlValue<'_>, op: FilterOp, min: f64, max: f64) -> Result<i64, SearchValidationResult> {
    match value {
        SqlValue::Long(long) => Ok(long),
        SqlValue::Double(double) if double >= max + 1.0 => Err(above_max(op)),
        SqlValue::Double(double) if double < min - 1.0 => Err(below_min(op)),
        SqlValue::Double(double) => {
            let mut rewritten = value;
            match utils::compare_int_column_with_double(&mut rewritten, op) {
                SearchValidationResult::Ok => {}
                validation => return Err(validation),
            }
            log_debug!(component = "numeric", event = "double_operand_rewritten", double, rewritten = ?rewritten);
            match rewritten {
                SqlValue::Long(long) => Ok(long),
                other => unreachable!("rewritten operand {:?} is not an integer", other),
            }
        }
        other => unreachable!("non-numeric operand {:?}", other),
    }
}

macro_rules! implement_integer {
    ($($index_type:ty => $column_type:ident),*) => { $(
        impl NumericType for $index_type {
            const COLUMN_TYPE: ColumnType = ColumnType::$column_type;

            fn classify(value: SqlValue<'_>, op: FilterOp) -> SearchValidationResult {
                match integer_operand(value, op, <$index_type>::MIN as f64, <$index_type>::MAX as f64) {
                    Ok(long) if long > <$index_type>::MAX as i64 => above_max(op),
                    Ok(long) if long < <$index_type>::MIN as i64 => below_min(op),
                    Ok(_) => SearchValidationResult::Ok,
                    Err(validation) => validation,
                }
            }

            #[inline]
            fn coerce(value: SqlValue<'_>, op: FilterOp) -> Self {
                match integer_operand(value, op, <$index_type>::MIN as f64, <$index_type>::MAX as f64) {
                    Ok(long) => long as $index_type,
                    Err(validation) => unreachable!("coercing an operand classified as {:?}", validation),
                }
            }
        }
    )* }
}

implement_integer!(u32 => Uint32, i32 => Int32, i64 => Int64);

impl NumericType for f64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Double;

    fn classify(_value: SqlValue<'_>, _op: FilterOp) -> SearchValidationResult {
        SearchValidationResult::Ok
    }

    #[inline]
    fn coerce(value: SqlValue<'_>, _op: FilterOp) -> Self {
        match value {
            SqlValue::Long(long) => long as f64,
            SqlValue::Double(double) => double,
            other => unreachable!("non-numeric operand {:?}", other),
        }
    }
}

/// A column of numbers, one per row, with no nulls.
///
/// Wrap it in a [`DenseNullOverlay`](crate::DenseNullOverlay) to give it null rows.
#[derive(Clone, Debug)]
pub struct NumericStorage<T> {
    data: Vec<T>,
}

impl<T: NumericType> NumericStorage<T> {
    pub fn new(data: Vec<T>) -> Self {
        assert!(data.len() <= u32::MAX as usize, "too many rows: {}", data.len());
        Self { data }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    fn compare(a: &T, b: &T) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Equal)
    }
}

impl<T: NumericType> Storage for NumericStorage<T> {
    fn validate_search_constraints(&self, value: SqlValue<'_>, op: FilterOp) -> SearchValidationResult {
        match op {
            FilterOp::IsNull => return SearchValidationResult::NoData,
            FilterOp::IsNotNull => return SearchValidationResult::AllData,
            _ => {}
        }
        match value {
            SqlValue::Null => SearchValidationResult::NoData,
            // Numbers order before strings.
            SqlValue::String(_) => match op {
                FilterOp::Eq | FilterOp::Gt | FilterOp::Ge => SearchValidationResult::NoData,
                _ => SearchValidationResult::AllData,
            },
            SqlValue::Long(_) | SqlValue::Double(_) => T::classify(value, op),
        }
    }

    fn search(&self, op: FilterOp, value: SqlValue<'_>, range: Range) -> RangeOrBitVector {
        debug_assert!(range.end <= self.size());
        let validation = self.validate_search_constraints(value, op);
        if let Some(early) = utils::can_return_early(validation, range) {
            return early.into();
        }
        let target = T::coerce(value, op);
        let data = &self.data[range.start as usize..range.end as usize];
        let mut builder = Builder::with_offset(range.end, range.start);
        match op {
            FilterOp::Eq => utils::linear_search_with_comparator(target, data, |a, b| a == b, &mut builder),
            FilterOp::Ne => utils::linear_search_with_comparator(target, data, |a, b| a != b, &mut builder),
            FilterOp::Lt => utils::linear_search_with_comparator(target, data, |a, b| a < b, &mut builder),
            FilterOp::Le => utils::linear_search_with_comparator(target, data, |a, b| a <= b, &mut builder),
            FilterOp::Gt => utils::linear_search_with_comparator(target, data, |a, b| a > b, &mut builder),
            FilterOp::Ge => utils::linear_search_with_comparator(target, data, |a, b| a >= b, &mut builder),
            FilterOp::IsNull | FilterOp::IsNotNull => unreachable!("{:?} is answered by validation", op),
        }
        builder.build().into()
    }

    fn index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> RangeOrBitVector {
        let validation = self.validate_search_constraints(value, op);
        if let Some(early) = utils::can_return_early_indices(validation, indices.size()) {
            return early.into();
        }
        let target = T::coerce(value, op);
        let data = &self.data[..];
        let rows = indices.data;
        let mut builder = Builder::new(indices.size());
        match op {
            FilterOp::Eq => utils::index_search_with_comparator(target, data, rows, |a, b| a == b, &mut builder),
            FilterOp::Ne => utils::index_search_with_comparator(target, data, rows, |a, b| a != b, &mut builder),
            FilterOp::Lt => utils::index_search_with_comparator(target, data, rows, |a, b| a < b, &mut builder),
            FilterOp::Le => utils::index_search_with_comparator(target, data, rows, |a, b| a <= b, &mut builder),
            FilterOp::Gt => utils::index_search_with_comparator(target, data, rows, |a, b| a > b, &mut builder),
            FilterOp::Ge => utils::index_search_with_comparator(target, data, rows, |a, b| a >= b, &mut builder),
            FilterOp::IsNull | FilterOp::IsNotNull => unreachable!("{:?} is answered by validation", op),
        }
        builder.build().into()
    }

    fn ordered_index_search(&self, op: FilterOp, value: SqlValue<'_>, indices: Indices<'_>) -> Range {
        assert!(op != FilterOp::Ne, "Ne must be split by the caller before an ordered search");
        let validation = self.validate_search_constraints(value, op);
        if let Some(early) = utils::can_return_early_indices(validation, indices.size()) {
            return early;
        }
        let target = T::coerce(value, op);
        let rows = indices.data;
        // The first position whose value is not below / not at or below the target.
        let lower = rows.partition_point(|&row| self.data[row as usize] < target) as u32;
        let upper = rows.partition_point(|&row| self.data[row as usize] <= target) as u32;
        match op {
            FilterOp::Eq => Range::new(lower, upper),
            FilterOp::Lt => Range::new(0, lower),
            FilterOp::Le => Range::new(0, upper),
            FilterOp::Gt => Range::new(upper, indices.size()),
            FilterOp::Ge => Range::new(lower, indices.size()),
            FilterOp::Ne | FilterOp::IsNull | FilterOp::IsNotNull => unreachable!("{:?} is answered by validation", op),
        }
    }

    fn sort(&self, rows: &mut [u32]) {
        rows.sort_unstable_by(|&a, &b| Self::compare(&self.data[a as usize], &self.data[b as usize]));
    }

    fn stable_sort(&self, rows: &mut [u32]) {
        rows.sort_by(|&a, &b| Self::compare(&self.data[a as usize], &self.data[b as usize]));
    }

    fn serialize(&self) -> StorageDescriptor {
        StorageDescriptor::Numeric(NumericDescriptor {
            column_type: T::COLUMN_TYPE,
            values: bytemuck::cast_slice(&self.data[..]).to_vec(),
        })
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }
}
