//! Surface flux term `∫_Γ n · K ∇p` (`d_surface_flux`).
use crate::algebra::{multiply, multiply_transpose_left, reduce_weighted_sum, scale_by_constant};
use crate::coefficient::Coefficient;
use crate::error::{check_dimension, TermError};
use crate::geometry::SurfaceGeometry;
use crate::settings::IntegralMode;
use crate::tensor::{BatchedTensor, TensorView, TensorViewMut};
use crate::terms::{check_field, scratch, ElementTerm};
use crate::Real;

/// Flux of `K ∇p` through each facet, either in total or per unit area.
#[derive(Debug, Clone)]
pub struct SurfaceFlux<'a, T> {
    /// Gradient of `p` at the facet quadrature points, `[n_fa, n_qp, dim, 1]`.
    pub grad: TensorView<'a, T>,
    /// `dim × dim` permeability.
    pub mtx_d: Coefficient<'a, T>,
    pub geometry: SurfaceGeometry<'a, T>,
    pub mode: IntegralMode,
}

#[derive(Debug)]
pub struct SurfaceFluxScratch<T> {
    dgp: BatchedTensor<T>,
    ntdgp: BatchedTensor<T>,
}

impl<'a, T: Real> ElementTerm<T> for SurfaceFlux<'a, T> {
    type Scratch = SurfaceFluxScratch<T>;

    fn name(&self) -> &'static str {
        "d_surface_flux"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (1, 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let name = self.name();
        let g = &self.geometry;
        let dim = g.dim();
        check_dimension(name, dim)?;
        self.mtx_d
            .validate(name, g.n_elements(), g.n_qp(), (dim, dim))?;
        check_field(name, "grad", &self.grad, g.n_elements(), g.n_qp(), (dim, 1))
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        let g = &self.geometry;
        Ok(SurfaceFluxScratch {
            dgp: scratch(g.n_qp(), g.dim(), 1)?,
            ntdgp: scratch(g.n_qp(), 1, 1)?,
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
        let SurfaceFluxScratch { dgp, ntdgp } = scratch;

        multiply(&mut dgp.view_mut(), &mtx_d, &grad)?;
        multiply_transpose_left(&mut ntdgp.view_mut(), geometry.normal(), &dgp.view())?;
        reduce_weighted_sum(out, &ntdgp.view(), geometry.det())?;
        if self.mode == IntegralMode::ElementAverage {
            scale_by_constant(out, T::one() / geometry.area());
        }
        Ok(())
    }
}
