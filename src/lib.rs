//! Batched, element-local evaluation of diffusion-type weak form terms.
//!
//! Given per-element basis function gradients, material coefficients and quadrature weights,
//! the evaluators in [`terms`] compute element matrices (bilinear forms), element vectors
//! (residuals) or element scalars for Laplace, anisotropic diffusion, permeability,
//! diffusion coupling and surface flux terms. Global assembly, mesh management and basis
//! function evaluation are left to the caller.
//!
//! All data is carried by [`BatchedTensor`](tensor::BatchedTensor), a 4-axis container
//! indexed `[batch, level, row, column]` in which each `row × column` block is stored
//! contiguously in row-major order. Batches correspond to elements and levels to
//! quadrature points.
use nalgebra::RealField;

pub mod algebra;
pub mod coefficient;
pub mod error;
pub mod gather;
pub mod geometry;
pub mod gradient;
pub mod settings;
pub mod tensor;
pub mod terms;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;

pub use error::{ErrorKind, TermError};

/// Scalar type used by all kernels and evaluators.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
