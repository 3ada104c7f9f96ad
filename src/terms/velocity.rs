//! Element-wise diffusive flux `∫ K ∇p`, as a total (`di_diffusion_integrate`) or as the
//! element-averaged diffusion velocity `-K ∇p` (`de_diffusion_velocity`).
use crate::algebra::{multiply, reduce_weighted_sum, scale_by_constant};
use crate::coefficient::Coefficient;
use crate::error::{check_dimension, TermError};
use crate::geometry::VolumeGeometry;
use crate::settings::IntegralMode;
use crate::tensor::{BatchedTensor, TensorView, TensorViewMut};
use crate::terms::{check_field, scratch, ElementTerm};
use crate::Real;
use numeric_literals::replace_float_literals;

/// Sign convention of the diffusive flux.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FluxSign {
    /// `K ∇p`
    Integrate,
    /// `-K ∇p`, the Darcy/Fick velocity.
    Velocity,
}

#[derive(Debug, Clone)]
pub struct DiffusionVelocity<'a, T> {
    /// Gradient of `p`, `[n_el, n_qp, dim, 1]`.
    pub grad: TensorView<'a, T>,
    /// `dim × dim` permeability.
    pub mtx_d: Coefficient<'a, T>,
    pub geometry: VolumeGeometry<'a, T>,
    pub sign: FluxSign,
    pub mode: IntegralMode,
}

impl<'a, T: Real> DiffusionVelocity<'a, T> {
    /// `de_diffusion_velocity`: the element average of `-K ∇p`.
    pub fn velocity(grad: TensorView<'a, T>, mtx_d: Coefficient<'a, T>, geometry: VolumeGeometry<'a, T>) -> Self {
        Self {
            grad,
            mtx_d,
            geometry,
            sign: FluxSign::Velocity,
            mode: IntegralMode::ElementAverage,
        }
    }

    /// `di_diffusion_integrate`: the integral of `K ∇p`.
    pub fn integrate(grad: TensorView<'a, T>, mtx_d: Coefficient<'a, T>, geometry: VolumeGeometry<'a, T>) -> Self {
        Self {
            grad,
            mtx_d,
            geometry,
            sign: FluxSign::Integrate,
            mode: IntegralMode::Integral,
        }
    }
}

impl<'a, T: Real> ElementTerm<T> for DiffusionVelocity<'a, T> {
    type Scratch = BatchedTensor<T>;

    fn name(&self) -> &'static str {
        match self.sign {
            FluxSign::Integrate => "di_diffusion_integrate",
            FluxSign::Velocity => "de_diffusion_velocity",
        }
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.geometry.dim(), 1)
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
        scratch(self.geometry.n_qp(), self.geometry.dim(), 1)
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        dgp: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(position);
        let mtx_d = self.mtx_d.at_element(position);
        let grad = self.grad.at_batch(position);

        multiply(&mut dgp.view_mut(), &mtx_d, &grad)?;
        reduce_weighted_sum(out, &dgp.view(), geometry.det())?;
        if self.sign == FluxSign::Velocity {
            scale_by_constant(out, -1.0);
        }
        if self.mode == IntegralMode::ElementAverage {
            scale_by_constant(out, 1.0 / geometry.volume());
        }
        Ok(())
    }
}
