//! Batched dense tensors and cursor-carrying views.
//!
//! A tensor is indexed `[batch, level, row, column]`. For a fixed `(batch, level)` the
//! `row × column` block is contiguous and stored in row-major order, blocks of one batch
//! are stored level after level, and batches follow each other.
//!
//! Kernels never address a batch themselves. They work on the *current slice* of a
//! [`TensorView`] or [`TensorViewMut`], which the caller positions with `set_slice`
//! before invoking them.
use crate::error::{ErrorKind, TermError};
use crate::Real;
use nalgebra::{Dyn, MatrixView, MatrixViewMut, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A dense `row × column` block exposed as an `nalgebra` matrix view with row-major strides.
pub type BlockView<'a, T> = MatrixView<'a, T, Dyn, Dyn, Dyn, Dyn>;

/// Mutable counterpart of [`BlockView`].
pub type BlockViewMut<'a, T> = MatrixViewMut<'a, T, Dyn, Dyn, Dyn, Dyn>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape {
    pub n_batch: usize,
    pub n_level: usize,
    pub n_row: usize,
    pub n_col: usize,
}

impl TensorShape {
    pub const fn new(n_batch: usize, n_level: usize, n_row: usize, n_col: usize) -> Self {
        Self {
            n_batch,
            n_level,
            n_row,
            n_col,
        }
    }

    /// Number of values in a single `row × column` block.
    pub const fn block_len(&self) -> usize {
        self.n_row * self.n_col
    }

    /// Number of values in a single batch.
    pub const fn batch_len(&self) -> usize {
        self.n_level * self.block_len()
    }

    pub const fn len(&self) -> usize {
        self.n_batch * self.batch_len()
    }

    /// Like [`len`](Self::len), but `None` if the number of values overflows `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.n_row
            .checked_mul(self.n_col)?
            .checked_mul(self.n_level)?
            .checked_mul(self.n_batch)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The same shape restricted to a single batch.
    pub const fn single_batch(&self) -> Self {
        Self::new(1, self.n_level, self.n_row, self.n_col)
    }
}

impl Display for TensorShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.n_batch, self.n_level, self.n_row, self.n_col)
    }
}

fn check_len(operation: &'static str, shape: &TensorShape, len: usize) -> Result<(), TermError> {
    match shape.checked_len() {
        Some(expected) if expected == len => Ok(()),
        Some(expected) => Err(TermError::shape_mismatch(
            operation,
            "data",
            format!("{expected} values for shape {shape}"),
            format!("{len} values"),
        )),
        None => Err(TermError::shape_mismatch(
            operation,
            "data",
            "a number of values that fits in usize",
            format!("shape {shape}"),
        )),
    }
}

fn row_major_block<T: Scalar>(data: &[T], n_row: usize, n_col: usize) -> BlockView<'_, T> {
    BlockView::from_slice_with_strides_generic(data, Dyn(n_row), Dyn(n_col), Dyn(n_col), Dyn(1))
}

fn row_major_block_transposed<T: Scalar>(data: &[T], n_row: usize, n_col: usize) -> BlockView<'_, T> {
    BlockView::from_slice_with_strides_generic(data, Dyn(n_col), Dyn(n_row), Dyn(1), Dyn(n_col))
}

/// An owning batched tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedTensor<T> {
    shape: TensorShape,
    data: Vec<T>,
}

impl<T: Real> BatchedTensor<T> {
    /// Allocates a zero-filled tensor, reporting allocation failure instead of aborting.
    pub fn try_zeros(shape: TensorShape) -> Result<Self, TermError> {
        let allocation_error = |requested| TermError::new("allocate", ErrorKind::Allocation { requested });
        let len = shape
            .checked_len()
            .ok_or_else(|| allocation_error(usize::MAX))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| allocation_error(len))?;
        data.resize(len, T::zero());
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: TensorShape) -> Self {
        Self {
            shape,
            data: vec![T::zero(); shape.len()],
        }
    }
}

impl<T: Scalar> BatchedTensor<T> {
    pub fn from_vec(shape: TensorShape, data: Vec<T>) -> Result<Self, TermError> {
        check_len("BatchedTensor::from_vec", &shape, data.len())?;
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// A view with its cursor on the first batch.
    pub fn view(&self) -> TensorView<'_, T> {
        TensorView {
            data: &self.data,
            shape: self.shape,
            batch: 0,
        }
    }

    /// A mutable view with its cursor on the first batch.
    pub fn view_mut(&mut self) -> TensorViewMut<'_, T> {
        TensorViewMut {
            data: &mut self.data,
            shape: self.shape,
            batch: 0,
        }
    }

    /// The `row × column` block at the given batch and level.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn block(&self, batch: usize, level: usize) -> &[T] {
        self.view().at_batch(batch).level(level)
    }

    pub fn block_mut(&mut self, batch: usize, level: usize) -> &mut [T] {
        let shape = self.shape;
        let offset = block_offset(&shape, batch, level);
        &mut self.data[offset..offset + shape.block_len()]
    }
}

fn block_offset(shape: &TensorShape, batch: usize, level: usize) -> usize {
    assert!(
        batch < shape.n_batch,
        "Batch index {} out of bounds for tensor of shape {}",
        batch,
        shape
    );
    assert!(
        level < shape.n_level,
        "Level index {} out of bounds for tensor of shape {}",
        level,
        shape
    );
    batch * shape.batch_len() + level * shape.block_len()
}

/// A read-only view of a batched tensor with a batch cursor.
///
/// Views are cheap to copy, so each evaluation of an element positions its own copy.
#[derive(Debug)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    shape: TensorShape,
    batch: usize,
}

impl<'a, T> Clone for TensorView<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for TensorView<'a, T> {}

impl<'a, T: Scalar> TensorView<'a, T> {
    /// Wraps caller-owned data laid out as described in the [module docs](self).
    pub fn from_slice(data: &'a [T], shape: TensorShape) -> Result<Self, TermError> {
        check_len("TensorView::from_slice", &shape, data.len())?;
        Ok(Self { data, shape, batch: 0 })
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn n_batch(&self) -> usize {
        self.shape.n_batch
    }

    pub fn n_level(&self) -> usize {
        self.shape.n_level
    }

    pub fn n_row(&self) -> usize {
        self.shape.n_row
    }

    pub fn n_col(&self) -> usize {
        self.shape.n_col
    }

    /// The batch the cursor currently points at.
    pub fn batch_index(&self) -> usize {
        self.batch
    }

    /// Moves the cursor to the start of the given batch.
    ///
    /// # Panics
    ///
    /// Panics if `batch` is out of bounds.
    pub fn set_slice(&mut self, batch: usize) {
        assert!(
            batch < self.shape.n_batch,
            "Batch index {} out of bounds for tensor of shape {}",
            batch,
            self.shape
        );
        self.batch = batch;
    }

    /// A copy of this view with the cursor on the given batch.
    pub fn at_batch(mut self, batch: usize) -> Self {
        self.set_slice(batch);
        self
    }

    /// Like [`at_batch`](Self::at_batch), except that a tensor holding a single batch is
    /// treated as shared by all batches and left as is.
    pub fn at_batch_or_shared(self, batch: usize) -> Self {
        if self.shape.n_batch == 1 {
            self
        } else {
            self.at_batch(batch)
        }
    }

    /// All levels of the current batch.
    pub fn slice(&self) -> &'a [T] {
        let len = self.shape.batch_len();
        let start = self.batch * len;
        &self.data[start..start + len]
    }

    /// The block at the given level of the current batch.
    pub fn level(&self, level: usize) -> &'a [T] {
        let offset = block_offset(&self.shape, self.batch, level);
        &self.data[offset..offset + self.shape.block_len()]
    }

    /// The first block of the current batch.
    ///
    /// Used for operands that hold a single block shared by every level.
    pub fn current(&self) -> &'a [T] {
        self.level(0)
    }

    pub fn block(&self, level: usize) -> BlockView<'a, T> {
        row_major_block(self.level(level), self.shape.n_row, self.shape.n_col)
    }

    /// The transpose of the block at the given level, without copying.
    pub fn block_transposed(&self, level: usize) -> BlockView<'a, T> {
        row_major_block_transposed(self.level(level), self.shape.n_row, self.shape.n_col)
    }
}

/// A mutable view of a batched tensor with a batch cursor.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    data: &'a mut [T],
    shape: TensorShape,
    batch: usize,
}

impl<'a, T: Scalar> TensorViewMut<'a, T> {
    pub fn from_slice_mut(data: &'a mut [T], shape: TensorShape) -> Result<Self, TermError> {
        check_len("TensorViewMut::from_slice_mut", &shape, data.len())?;
        Ok(Self { data, shape, batch: 0 })
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn n_batch(&self) -> usize {
        self.shape.n_batch
    }

    pub fn n_level(&self) -> usize {
        self.shape.n_level
    }

    pub fn n_row(&self) -> usize {
        self.shape.n_row
    }

    pub fn n_col(&self) -> usize {
        self.shape.n_col
    }

    pub fn batch_index(&self) -> usize {
        self.batch
    }

    /// # Panics
    ///
    /// Panics if `batch` is out of bounds.
    pub fn set_slice(&mut self, batch: usize) {
        assert!(
            batch < self.shape.n_batch,
            "Batch index {} out of bounds for tensor of shape {}",
            batch,
            self.shape
        );
        self.batch = batch;
    }

    /// A read-only view of the same data, with the same cursor.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView {
            data: &*self.data,
            shape: self.shape,
            batch: self.batch,
        }
    }

    pub fn slice_mut(&mut self) -> &mut [T] {
        let len = self.shape.batch_len();
        let start = self.batch * len;
        &mut self.data[start..start + len]
    }

    pub fn level(&self, level: usize) -> &[T] {
        let offset = block_offset(&self.shape, self.batch, level);
        &self.data[offset..offset + self.shape.block_len()]
    }

    pub fn level_mut(&mut self, level: usize) -> &mut [T] {
        let offset = block_offset(&self.shape, self.batch, level);
        &mut self.data[offset..offset + self.shape.block_len()]
    }

    pub fn block_mut(&mut self, level: usize) -> BlockViewMut<'_, T> {
        let (n_row, n_col) = (self.shape.n_row, self.shape.n_col);
        BlockViewMut::from_slice_with_strides_generic(self.level_mut(level), Dyn(n_row), Dyn(n_col), Dyn(n_col), Dyn(1))
    }

    /// Overwrites every value of the current batch.
    pub fn fill(&mut self, value: T) {
        self.slice_mut().fill(value);
    }
}
