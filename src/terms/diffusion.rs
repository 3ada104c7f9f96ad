//! Anisotropic diffusion term `∫ K_ij ∇_i q ∇_j p` with a `dim × dim` permeability `K`.
use crate::algebra::{multiply, multiply_transpose_left, reduce_weighted_sum};
use crate::coefficient::Coefficient;
use crate::error::{check_dimension, TermError};
use crate::geometry::VolumeGeometry;
use crate::tensor::{BatchedTensor, TensorView, TensorViewMut};
use crate::terms::{check_field, scratch, ElementTerm, GradientContractionScratch};
use crate::Real;

fn validate_permeability<T: Real>(
    name: &'static str,
    mtx_d: &Coefficient<T>,
    geometry: &VolumeGeometry<T>,
) -> Result<(), TermError> {
    let dim = geometry.dim();
    check_dimension(name, dim)?;
    mtx_d.validate(name, geometry.n_elements(), geometry.n_qp(), (dim, dim))
}

/// Element matrices of `dw_diffusion`: `∫ Gᵀ K G`.
#[derive(Debug, Clone)]
pub struct DiffusionMatrix<'a, T> {
    pub mtx_d: Coefficient<'a, T>,
    pub geometry: VolumeGeometry<'a, T>,
}

#[derive(Debug)]
pub struct DiffusionMatrixScratch<T> {
    gtd: BatchedTensor<T>,
    gtdg: BatchedTensor<T>,
}

impl<'a, T: Real> ElementTerm<T> for DiffusionMatrix<'a, T> {
    type Scratch = DiffusionMatrixScratch<T>;

    fn name(&self) -> &'static str {
        "dw_diffusion"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.geometry.n_ep(), self.geometry.n_ep())
    }

    fn validate(&self) -> Result<(), TermError> {
        validate_permeability(self.name(), &self.mtx_d, &self.geometry)
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        let g = &self.geometry;
        Ok(DiffusionMatrixScratch {
            gtd: scratch(g.n_qp(), g.n_ep(), g.dim())?,
            gtdg: scratch(g.n_qp(), g.n_ep(), g.n_ep())?,
        })
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(position);
        let mtx_d = self.mtx_d.at_element(position);
        let DiffusionMatrixScratch { gtd, gtdg } = scratch;

        multiply_transpose_left(&mut gtd.view_mut(), geometry.bf_gm(), &mtx_d)?;
        multiply(&mut gtdg.view_mut(), &gtd.view(), geometry.bf_gm())?;
        reduce_weighted_sum(out, &gtdg.view(), geometry.det())
    }
}

/// Element residual vectors of `dw_diffusion`: `∫ Gᵀ (K ∇p)` for a given gradient `∇p`
/// of shape `[n_el, n_qp, dim, 1]`.
#[derive(Debug, Clone)]
pub struct DiffusionResidual<'a, T> {
    pub grad: TensorView<'a, T>,
    pub mtx_d: Coefficient<'a, T>,
    pub geometry: VolumeGeometry<'a, T>,
}

#[derive(Debug)]
pub struct DiffusionResidualScratch<T> {
    dgp: BatchedTensor<T>,
    gtdgp: BatchedTensor<T>,
}

impl<'a, T: Real> ElementTerm<T> for DiffusionResidual<'a, T> {
    type Scratch = DiffusionResidualScratch<T>;

    fn name(&self) -> &'static str {
        "dw_diffusion"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.geometry.n_ep(), 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let g = &self.geometry;
        validate_permeability(self.name(), &self.mtx_d, g)?;
        check_field(self.name(), "grad", &self.grad, g.n_elements(), g.n_qp(), (g.dim(), 1))
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        let g = &self.geometry;
        Ok(DiffusionResidualScratch {
            dgp: scratch(g.n_qp(), g.dim(), 1)?,
            gtdgp: scratch(g.n_qp(), g.n_ep(), 1)?,
        })
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(position);
        let mtx_d = self.mtx_d.at_element(position);
        let grad = self.grad.at_batch(position);
        let DiffusionResidualScratch { dgp, gtdgp } = scratch;

        multiply(&mut dgp.view_mut(), &mtx_d, &grad)?;
        multiply_transpose_left(&mut gtdgp.view_mut(), geometry.bf_gm(), &dgp.view())?;
        reduce_weighted_sum(out, &gtdgp.view(), geometry.det())
    }
}

/// Element values of `d_diffusion`: `∫ ∇p₁ᵀ K ∇p₂`.
#[derive(Debug, Clone)]
pub struct DiffusionValue<'a, T> {
    pub grad_p1: TensorView<'a, T>,
    pub grad_p2: TensorView<'a, T>,
    pub mtx_d: Coefficient<'a, T>,
    pub geometry: VolumeGeometry<'a, T>,
}

impl<'a, T: Real> ElementTerm<T> for DiffusionValue<'a, T> {
    type Scratch = GradientContractionScratch<T>;

    fn name(&self) -> &'static str {
        "d_diffusion"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (1, 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let g = &self.geometry;
        validate_permeability(self.name(), &self.mtx_d, g)?;
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
        let mtx_d = self.mtx_d.at_element(position);
        let grad_p1 = self.grad_p1.at_batch(position);
        let grad_p2 = self.grad_p2.at_batch(position);
        let (dgp2, gp1tdgp2) = scratch.buffers();

        multiply(&mut dgp2.view_mut(), &mtx_d, &grad_p2)?;
        multiply_transpose_left(&mut gp1tdgp2.view_mut(), &grad_p1, &dgp2.view())?;
        reduce_weighted_sum(out, &gp1tdgp2.view(), &det)
    }
}
