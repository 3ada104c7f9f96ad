//! Right-hand side permeability term `∫ K_j ∇_j q` (`dw_permeability_r`, also known as
//! `dw_diffusion_r`), where `K` is a `dim × 1` vector.
use crate::algebra::{multiply_transpose_left, reduce_weighted_sum};
use crate::coefficient::Coefficient;
use crate::error::{check_dimension, TermError};
use crate::geometry::VolumeGeometry;
use crate::tensor::{BatchedTensor, TensorViewMut};
use crate::terms::{scratch, ElementTerm};
use crate::Real;

#[derive(Debug, Clone)]
pub struct PermeabilityResidual<'a, T> {
    pub mtx_d: Coefficient<'a, T>,
    pub geometry: VolumeGeometry<'a, T>,
}

impl<'a, T: Real> ElementTerm<T> for PermeabilityResidual<'a, T> {
    type Scratch = BatchedTensor<T>;

    fn name(&self) -> &'static str {
        "dw_permeability_r"
    }

    fn num_elements(&self) -> usize {
        self.geometry.n_elements()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.geometry.n_ep(), 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let g = &self.geometry;
        check_dimension(self.name(), g.dim())?;
        self.mtx_d
            .validate(self.name(), g.n_elements(), g.n_qp(), (g.dim(), 1))
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        scratch(self.geometry.n_qp(), self.geometry.n_ep(), 1)
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        gtd: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(position);
        let mtx_d = self.mtx_d.at_element(position);
        multiply_transpose_left(&mut gtd.view_mut(), geometry.bf_gm(), &mtx_d)?;
        reduce_weighted_sum(out, &gtd.view(), geometry.det())
    }
}
