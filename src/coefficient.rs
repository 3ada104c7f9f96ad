//! Material coefficients with explicit per-element or shared cardinality.
use crate::error::TermError;
use crate::tensor::TensorView;
use crate::Real;

/// A material coefficient.
///
/// Each entry is a block of values (a scalar, a `dim × 1` vector or a `dim × dim` matrix)
/// that is either constant over an element (one level) or given per quadrature point
/// (`n_qp` levels).
#[derive(Debug, Copy, Clone)]
pub enum Coefficient<'a, T> {
    /// One entry per evaluated element, indexed by the position in the element list.
    PerElement(TensorView<'a, T>),
    /// A single entry shared by all elements.
    Shared(TensorView<'a, T>),
}

impl<'a, T: Real> Coefficient<'a, T> {
    /// The underlying tensor.
    pub fn tensor(&self) -> &TensorView<'a, T> {
        match self {
            Self::PerElement(view) | Self::Shared(view) => view,
        }
    }

    /// The entry to use for the element at the given position.
    pub fn at_element(&self, position: usize) -> TensorView<'a, T> {
        match *self {
            Self::PerElement(view) => view.at_batch(position),
            Self::Shared(view) => view,
        }
    }

    /// Checks cardinality, level count and block shape against what a term expects.
    pub fn validate(
        &self,
        operation: &'static str,
        n_elements: usize,
        n_qp: usize,
        block: (usize, usize),
    ) -> Result<(), TermError> {
        let view = self.tensor();
        let expected_batches = match self {
            Self::PerElement(_) => n_elements,
            Self::Shared(_) => 1,
        };
        if view.n_batch() != expected_batches {
            return Err(TermError::shape_mismatch(
                operation,
                "coefficient",
                format!("{expected_batches} batches"),
                format!("{} batches", view.n_batch()),
            ));
        }
        if view.n_level() != 1 && view.n_level() != n_qp {
            return Err(TermError::shape_mismatch(
                operation,
                "coefficient",
                format!("1 or {n_qp} levels"),
                format!("{} levels", view.n_level()),
            ));
        }
        if (view.n_row(), view.n_col()) != block {
            return Err(TermError::shape_mismatch(
                operation,
                "coefficient",
                format!("{} x {} blocks", block.0, block.1),
                format!("{} x {} blocks", view.n_row(), view.n_col()),
            ));
        }
        Ok(())
    }
}
