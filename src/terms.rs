//! Element-level evaluators for diffusion-type weak form terms.
//!
//! Every term implements [`ElementTerm`]: it validates its operands once, allocates scratch
//! tensors for a single element, and evaluates one element at a time into a row of the
//! output tensor. [`evaluate_term`] and [`par_evaluate_term`] drive the element loop, and
//! [`Term`] dispatches over all available terms.
//!
//! The output tensor has shape `[n, 1, rows, cols]` where `n` is the number of evaluated
//! elements and `rows × cols` is given by [`ElementTerm::output_block`].
use crate::error::{check_shape, TermError};
use crate::settings::{EvaluationSettings, Execution};
use crate::tensor::{BatchedTensor, TensorShape, TensorView, TensorViewMut};
use crate::Real;
use log::{debug, warn};
use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

mod coupling;
mod diffusion;
mod flux;
mod laplace;
mod permeability;
mod velocity;

pub use coupling::*;
pub use diffusion::*;
pub use flux::*;
pub use laplace::*;
pub use permeability::*;
pub use velocity::*;

/// A weak form term that can be evaluated element by element.
pub trait ElementTerm<T: Real> {
    /// Scratch tensors needed to evaluate a single element.
    type Scratch;

    fn name(&self) -> &'static str;

    /// Number of elements the term is evaluated on, i.e. number of output batches.
    fn num_elements(&self) -> usize;

    /// Shape `(rows, cols)` of the block written for each element.
    fn output_block(&self) -> (usize, usize);

    /// Checks dimension and operand shapes before any element is processed.
    fn validate(&self) -> Result<(), TermError>;

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError>;

    /// Evaluates the element at `position` into the current slice of `out`.
    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError>;

    fn output_shape(&self) -> TensorShape {
        let (rows, cols) = self.output_block();
        TensorShape::new(self.num_elements(), 1, rows, cols)
    }
}

/// Allocates a zeroed output tensor of the right shape for the term.
pub fn allocate_output<T, E>(term: &E) -> Result<BatchedTensor<T>, TermError>
where
    T: Real,
    E: ElementTerm<T>,
{
    BatchedTensor::try_zeros(term.output_shape())
}

fn prepare<T, E>(term: &E, output: &BatchedTensor<T>) -> Result<(), TermError>
where
    T: Real,
    E: ElementTerm<T>,
{
    term.validate()?;
    check_shape("evaluate", "output", output.shape(), term.output_shape())
}

fn report_failure(name: &'static str, err: TermError) -> TermError {
    let err = err.in_term(name);
    warn!("Term evaluation failed: {}", err);
    err
}

/// Evaluates the term on all of its elements, one after the other.
pub fn evaluate_term<T, E>(term: &E, output: &mut BatchedTensor<T>) -> Result<(), TermError>
where
    T: Real,
    E: ElementTerm<T>,
{
    let name = term.name();
    prepare(term, output).map_err(|err| report_failure(name, err))?;
    let num_elements = term.num_elements();
    debug!("Evaluating {} on {} elements", name, num_elements);

    let mut scratch = term
        .allocate_scratch()
        .map_err(|err| report_failure(name, err))?;
    let mut out = output.view_mut();
    for position in 0..num_elements {
        out.set_slice(position);
        term.evaluate_element(position, &mut out, &mut scratch)
            .map_err(|err| report_failure(name, err))?;
    }

    debug!("Finished evaluating {}", name);
    Ok(())
}

/// Evaluates the term with elements partitioned across the rayon thread pool.
///
/// Each worker allocates its own scratch tensors and writes only the output rows of the
/// elements it processes. The per-element computation is identical to [`evaluate_term`].
pub fn par_evaluate_term<T, E>(term: &E, output: &mut BatchedTensor<T>) -> Result<(), TermError>
where
    T: Real + Send + Sync,
    E: ElementTerm<T> + Sync,
{
    let name = term.name();
    prepare(term, output).map_err(|err| report_failure(name, err))?;
    let shape = output.shape();
    debug!("Evaluating {} on {} elements in parallel", name, shape.n_batch);
    if shape.is_empty() {
        return Ok(());
    }

    let row_shape = shape.single_batch();
    output
        .as_mut_slice()
        .par_chunks_mut(shape.batch_len())
        .enumerate()
        .try_for_each_init(
            || term.allocate_scratch(),
            |scratch, (position, row)| {
                let scratch = scratch.as_mut().map_err(|err| err.clone())?;
                let mut out = TensorViewMut::from_slice_mut(row, row_shape)?;
                term.evaluate_element(position, &mut out, scratch)
            },
        )
        .map_err(|err| report_failure(name, err))?;

    debug!("Finished evaluating {}", name);
    Ok(())
}

pub fn evaluate_term_with<T, E>(
    term: &E,
    output: &mut BatchedTensor<T>,
    settings: &EvaluationSettings,
) -> Result<(), TermError>
where
    T: Real + Send + Sync,
    E: ElementTerm<T> + Sync,
{
    match settings.execution {
        Execution::Serial => evaluate_term(term, output),
        Execution::Parallel => par_evaluate_term(term, output),
    }
}

/// Checks a per-element field such as a gradient, `[n_elements, n_qp, rows, cols]`.
pub(crate) fn check_field<T: Real>(
    operation: &'static str,
    operand: &'static str,
    field: &TensorView<T>,
    n_elements: usize,
    n_qp: usize,
    block: (usize, usize),
) -> Result<(), TermError> {
    check_shape(
        operation,
        operand,
        field.shape(),
        TensorShape::new(n_elements, n_qp, block.0, block.1),
    )
}

/// Allocates a single-batch scratch tensor.
pub(crate) fn scratch<T: Real>(n_level: usize, n_row: usize, n_col: usize) -> Result<BatchedTensor<T>, TermError> {
    BatchedTensor::try_zeros(TensorShape::new(1, n_level, n_row, n_col))
}

/// Any of the available terms, each variant carrying exactly the operands it needs.
#[derive(Debug, Clone)]
pub enum Term<'a, T> {
    LaplaceMatrix(LaplaceMatrix<'a, T>),
    LaplaceResidual(LaplaceResidual<'a, T>),
    LaplaceValue(LaplaceValue<'a, T>),
    DiffusionMatrix(DiffusionMatrix<'a, T>),
    DiffusionResidual(DiffusionResidual<'a, T>),
    DiffusionValue(DiffusionValue<'a, T>),
    PermeabilityResidual(PermeabilityResidual<'a, T>),
    DiffusionCouplingMatrix(DiffusionCouplingMatrix<'a, T>),
    DiffusionCouplingResidual(DiffusionCouplingResidual<'a, T>),
    DiffusionCouplingValue(DiffusionCouplingValue<'a, T>),
    SurfaceFlux(SurfaceFlux<'a, T>),
    DiffusionVelocity(DiffusionVelocity<'a, T>),
}

macro_rules! dispatch {
    ($term:expr, $inner:ident => $body:expr) => {
        match $term {
            Term::LaplaceMatrix($inner) => $body,
            Term::LaplaceResidual($inner) => $body,
            Term::LaplaceValue($inner) => $body,
            Term::DiffusionMatrix($inner) => $body,
            Term::DiffusionResidual($inner) => $body,
            Term::DiffusionValue($inner) => $body,
            Term::PermeabilityResidual($inner) => $body,
            Term::DiffusionCouplingMatrix($inner) => $body,
            Term::DiffusionCouplingResidual($inner) => $body,
            Term::DiffusionCouplingValue($inner) => $body,
            Term::SurfaceFlux($inner) => $body,
            Term::DiffusionVelocity($inner) => $body,
        }
    };
}

impl<'a, T: Real + Send + Sync> Term<'a, T> {
    pub fn name(&self) -> &'static str {
        dispatch!(self, term => term.name())
    }

    pub fn output_shape(&self) -> TensorShape {
        dispatch!(self, term => term.output_shape())
    }

    pub fn allocate_output(&self) -> Result<BatchedTensor<T>, TermError> {
        BatchedTensor::try_zeros(self.output_shape())
    }

    pub fn evaluate(&self, output: &mut BatchedTensor<T>) -> Result<(), TermError> {
        self.evaluate_with(output, &EvaluationSettings::default())
    }

    pub fn evaluate_with(&self, output: &mut BatchedTensor<T>, settings: &EvaluationSettings) -> Result<(), TermError> {
        dispatch!(self, term => evaluate_term_with(term, output, settings))
    }
}
