//! Row filtering over columnar storage.
//!
//! A column is a stack of [`Storage`] layers: a leaf that holds values, such as
//! [`NumericStorage`], wrapped by overlays that add semantics, such as
//! [`DenseNullOverlay`] for nullable columns. A filter `column op value` is pushed
//! down the stack and answered with a [`RangeOrBitVector`]: a contiguous [`Range`]
//! of rows when the answer happens to be one, or a [`BitVector`] with one bit per row.
//!
//! Searches come in three shapes.
//! * [`Storage::search`] over a range of rows, answering in row space.
//! * [`Storage::index_search`] over an arbitrary list of rows, answering in position
//!   space: bit `k` is set when `indices[k]` matches.
//! * [`Storage::ordered_index_search`] over rows sorted by the column, answering with
//!   the range of matching positions.
//!
//! Leaf storages build their bit vectors through [`Builder`] and the comparison loops
//! in [`utils`], which append 64 results at a time once the builder is word aligned.

pub mod bits;
pub mod fake;
pub mod numeric;
pub mod overlay;
pub mod storage;
pub mod types;
pub mod utils;

mod observability;

pub use bits::{BitVector, Builder, BITS_IN_WORD};
pub use fake::{FakeStorage, SearchStrategy};
pub use numeric::{NumericStorage, NumericType};
pub use overlay::DenseNullOverlay;
pub use storage::{Storage, StorageDescriptor};
pub use types::{ColumnType, FilterOp, Indices, IndicesState, Range, RangeOrBitVector, SearchValidationResult, SqlValue};
