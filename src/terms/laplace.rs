//! Laplace term `∫ c ∇q · ∇p` with a scalar diffusivity `c`.
//!
//! Without a coefficient the diffusivity is one.
use crate::algebra::{multiply_transpose_left, reduce_weighted_sum, scale, scale_in_place};
use crate::coefficient::Coefficient;
use crate::error::{check_dimension, TermError};
use crate::geometry::VolumeGeometry;
use crate::gradient::{apply_gradient_transposed, build_gram_from_gradient};
use crate::tensor::{BatchedTensor, TensorView, TensorViewMut};
use crate::terms::{check_field, scratch, ElementTerm};
use crate::Real;

fn validate_diffusivity<T: Real>(
    name: &'static str,
    coefficient: &Option<Coefficient<T>>,
    geometry: &VolumeGeometry<T>,
) -> Result<(), TermError> {
    check_dimension(name, geometry.dim())?;
    match coefficient {
        Some(c) => c.validate(name, geometry.n_elements(), geometry.n_qp(), (1, 1)),
        None => Ok(()),
    }
}

/// Element matrices of `dw_laplace`: `∫ c ∇φ_i · ∇φ_j`.
#[derive(Debug, Clone)]
pub struct LaplaceMatrix<'a, T> {
    pub coefficient: Option<Coefficient<'a, T>>,
    pub geometry: VolumeGeometry<'a, T>,
}

impl<'a, T: Real> ElementTerm<T> for LaplaceMatrix<'a, T> {
    type Scratch = BatchedTensor<T>;

    fn name(&self) -> &'static str {
        "dw_laplace"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.geometry.n_ep(), self.geometry.n_ep())
    }

    fn validate(&self) -> Result<(), TermError> {
        validate_diffusivity(self.name(), &self.coefficient, &self.geometry)
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        let n_ep = self.geometry.n_ep();
        scratch(self.geometry.n_qp(), n_ep, n_ep)
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        gtg: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(position);
        build_gram_from_gradient(&mut gtg.view_mut(), geometry.bf_gm())?;
        if let Some(c) = &self.coefficient {
            scale_in_place(&mut gtg.view_mut(), &c.at_element(position))?;
        }
        reduce_weighted_sum(out, &gtg.view(), geometry.det())
    }
}

/// Element residual vectors of `dw_laplace`: `∫ c ∇φ_i · ∇p` for a given gradient `∇p`
/// of shape `[n_el, n_qp, dim, 1]`.
#[derive(Debug, Clone)]
pub struct LaplaceResidual<'a, T> {
    pub grad: TensorView<'a, T>,
    pub coefficient: Option<Coefficient<'a, T>>,
    pub geometry: VolumeGeometry<'a, T>,
}

impl<'a, T: Real> ElementTerm<T> for LaplaceResidual<'a, T> {
    type Scratch = BatchedTensor<T>;

    fn name(&self) -> &'static str {
        "dw_laplace"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.geometry.n_ep(), 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let g = &self.geometry;
        validate_diffusivity(self.name(), &self.coefficient, g)?;
        check_field(self.name(), "grad", &self.grad, g.n_elements(), g.n_qp(), (g.dim(), 1))
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        scratch(self.geometry.n_qp(), self.geometry.n_ep(), 1)
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        gtgu: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(position);
        let grad = self.grad.at_batch(position);
        apply_gradient_transposed(&mut gtgu.view_mut(), geometry.bf_gm(), &grad)?;
        if let Some(c) = &self.coefficient {
            scale_in_place(&mut gtgu.view_mut(), &c.at_element(position))?;
        }
        reduce_weighted_sum(out, &gtgu.view(), geometry.det())
    }
}

/// Element values of `d_laplace`: `∫ c ∇p₁ · ∇p₂`.
#[derive(Debug, Clone)]
pub struct LaplaceValue<'a, T> {
    pub grad_p1: TensorView<'a, T>,
    pub grad_p2: TensorView<'a, T>,
    pub coefficient: Option<Coefficient<'a, T>>,
    pub geometry: VolumeGeometry<'a, T>,
}

#[derive(Debug)]
pub struct GradientContractionScratch<T> {
    dgp2: BatchedTensor<T>,
    gp1tdgp2: BatchedTensor<T>,
}

impl<T: Real> GradientContractionScratch<T> {
    pub(crate) fn allocate(n_qp: usize, dim: usize) -> Result<Self, TermError> {
        Ok(Self {
            dgp2: scratch(n_qp, dim, 1)?,
            gp1tdgp2: scratch(n_qp, 1, 1)?,
        })
    }

    pub(crate) fn buffers(&mut self) -> (&mut BatchedTensor<T>, &mut BatchedTensor<T>) {
        (&mut self.dgp2, &mut self.gp1tdgp2)
    }
}

impl<'a, T: Real> ElementTerm<T> for LaplaceValue<'a, T> {
    type Scratch = GradientContractionScratch<T>;

    fn name(&self) -> &'static str {
        "d_laplace"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (1, 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let g = &self.geometry;
        validate_diffusivity(self.name(), &self.coefficient, g)?;
        check_field(self.name(), "grad_p1", &self.grad_p1, g.n_elements(), g.n_qp(), (g.dim(), 1))?;
        check_field(self.name(), "grad_p2", &self.grad_p2, g.n_elements(), g.n_qp(), (g.dim(), 1))
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        GradientContractionScratch::allocate(self.geometry.n_qp(), self.geometry.dim())
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let det = self.geometry.det().at_batch(position);
        let grad_p1 = self.grad_p1.at_batch(position);
        let grad_p2 = self.grad_p2.at_batch(position);
        let (dgp2, gp1tdgp2) = scratch.buffers();

        match &self.coefficient {
            Some(c) => {
                scale(&mut dgp2.view_mut(), &grad_p2, &c.at_element(position))?;
                multiply_transpose_left(&mut gp1tdgp2.view_mut(), &grad_p1, &dgp2.view())?;
            }
            None => multiply_transpose_left(&mut gp1tdgp2.view_mut(), &grad_p1, &grad_p2)?,
        }
        reduce_weighted_sum(out, &gp1tdgp2.view(), &det)
    }
}
