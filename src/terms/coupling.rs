//! Diffusion coupling term `∫ p K_j ∇_j q` between two scalar fields.
//!
//! One field enters through its gradient (`bf_gm` of the geometry), the other through its
//! basis function values `bf`, with a `dim × 1` coefficient `K`. [`CouplingDirection`]
//! selects whether the test or the trial field is differentiated.
//!
//! Coupling terms are evaluated on an explicit [`ElementList`]. Geometry, basis values and
//! connectivity are addressed by element index, while the coefficient and the output are
//! addressed by position in the list.
use crate::algebra::{multiply, multiply_transpose_both, multiply_transpose_left, reduce_weighted_sum};
use crate::coefficient::Coefficient;
use crate::error::{check_dimension, TermError};
use crate::gather::{ElementList, NodalField};
use crate::geometry::VolumeGeometry;
use crate::settings::CouplingDirection;
use crate::tensor::{BatchedTensor, TensorView, TensorViewMut};
use crate::terms::{scratch, ElementTerm};
use crate::Real;

/// Operands shared by all diffusion coupling evaluators.
#[derive(Debug, Clone)]
pub struct DiffusionCoupling<'a, T> {
    /// `dim × 1` coefficient, one entry per listed element or shared.
    pub mtx_d: Coefficient<'a, T>,
    /// Basis function values of the non-differentiated field, `[n_el or 1, n_qp, 1, n_val]`.
    pub bf: TensorView<'a, T>,
    /// Geometry of the differentiated field.
    pub geometry: VolumeGeometry<'a, T>,
    pub elements: ElementList<'a>,
    pub direction: CouplingDirection,
}

impl<'a, T: Real> DiffusionCoupling<'a, T> {
    /// Number of basis functions of the differentiated field.
    pub fn n_grad(&self) -> usize {
        self.geometry.n_ep()
    }

    /// Number of basis functions of the field entering by value.
    pub fn n_val(&self) -> usize {
        self.bf.n_col()
    }

    pub fn test_nodes(&self) -> usize {
        match self.direction {
            CouplingDirection::TestGradient => self.n_grad(),
            CouplingDirection::TrialGradient => self.n_val(),
        }
    }

    pub fn trial_nodes(&self) -> usize {
        match self.direction {
            CouplingDirection::TestGradient => self.n_val(),
            CouplingDirection::TrialGradient => self.n_grad(),
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), TermError> {
        let g = &self.geometry;
        check_dimension(name, g.dim())?;
        self.elements.check_bounds(name, g.n_elements())?;
        self.mtx_d
            .validate(name, self.elements.len(), g.n_qp(), (g.dim(), 1))?;
        let bf = &self.bf;
        let batches_ok = bf.n_batch() == 1 || bf.n_batch() == g.n_elements();
        if !batches_ok || bf.n_level() != g.n_qp() || bf.n_row() != 1 {
            return Err(TermError::shape_mismatch(
                name,
                "bf",
                format!("[1 or {}, {}, 1, n_val]", g.n_elements(), g.n_qp()),
                bf.shape(),
            ));
        }
        Ok(())
    }

    fn check_field(
        &self,
        name: &'static str,
        operand: &'static str,
        field: &NodalField<T>,
        nodes: usize,
    ) -> Result<(), TermError> {
        if field.nodes_per_element() != nodes {
            return Err(TermError::shape_mismatch(
                name,
                operand,
                format!("{nodes} nodes per element"),
                format!("{} nodes per element", field.nodes_per_element()),
            ));
        }
        field.check_elements(name, &self.elements)
    }

    fn allocate_vector_scratch(&self) -> Result<CouplingVectorScratch<T>, TermError> {
        let n_qp = self.geometry.n_qp();
        let dim = self.geometry.dim();
        let (gp_rows, dgp_rows) = match self.direction {
            CouplingDirection::TestGradient => (1, dim),
            CouplingDirection::TrialGradient => (dim, 1),
        };
        Ok(CouplingVectorScratch {
            st: scratch(1, self.trial_nodes(), 1)?,
            gp: scratch(n_qp, gp_rows, 1)?,
            dgp: scratch(n_qp, dgp_rows, 1)?,
            gtdgp: scratch(n_qp, self.test_nodes(), 1)?,
        })
    }

    /// Computes the per-quadrature-point coupling vector for the trial values in `scratch.st`.
    fn evaluate_vector(
        &self,
        position: usize,
        element: usize,
        scratch: &mut CouplingVectorScratch<T>,
    ) -> Result<(), TermError> {
        let geometry = self.geometry.at_element(element);
        let bf = self.bf.at_batch_or_shared(element);
        let mtx_d = self.mtx_d.at_element(position);
        let CouplingVectorScratch { st, gp, dgp, gtdgp } = scratch;
        let st = st.view();

        match self.direction {
            CouplingDirection::TestGradient => {
                multiply(&mut gp.view_mut(), &bf, &st)?;
                multiply(&mut dgp.view_mut(), &mtx_d, &gp.view())?;
                multiply_transpose_left(&mut gtdgp.view_mut(), geometry.bf_gm(), &dgp.view())
            }
            CouplingDirection::TrialGradient => {
                multiply(&mut gp.view_mut(), geometry.bf_gm(), &st)?;
                multiply_transpose_left(&mut dgp.view_mut(), &mtx_d, &gp.view())?;
                multiply_transpose_left(&mut gtdgp.view_mut(), &bf, &dgp.view())
            }
        }
    }
}

#[derive(Debug)]
pub struct CouplingVectorScratch<T> {
    st: BatchedTensor<T>,
    gp: BatchedTensor<T>,
    dgp: BatchedTensor<T>,
    gtdgp: BatchedTensor<T>,
}

/// Element matrices of `dw_diffusion_coupling`, rows indexed by the test field.
#[derive(Debug, Clone)]
pub struct DiffusionCouplingMatrix<'a, T> {
    pub coupling: DiffusionCoupling<'a, T>,
}

#[derive(Debug)]
pub struct CouplingMatrixScratch<T> {
    gtd: BatchedTensor<T>,
    gtdg: BatchedTensor<T>,
}

impl<'a, T: Real> ElementTerm<T> for DiffusionCouplingMatrix<'a, T> {
    type Scratch = CouplingMatrixScratch<T>;

    fn name(&self) -> &'static str {
        "dw_diffusion_coupling"
    }

    fn num_elements(&self) -> usize {
        self.coupling.elements.len()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.coupling.test_nodes(), self.coupling.trial_nodes())
    }

    fn validate(&self) -> Result<(), TermError> {
        self.coupling.validate(self.name())
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        let n_qp = self.coupling.geometry.n_qp();
        let (rows, cols) = self.output_block();
        Ok(CouplingMatrixScratch {
            gtd: scratch(n_qp, self.coupling.n_grad(), 1)?,
            gtdg: scratch(n_qp, rows, cols)?,
        })
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let c = &self.coupling;
        let element = c.elements.element(position);
        let geometry = c.geometry.at_element(element);
        let bf = c.bf.at_batch_or_shared(element);
        let mtx_d = c.mtx_d.at_element(position);
        let CouplingMatrixScratch { gtd, gtdg } = scratch;

        multiply_transpose_left(&mut gtd.view_mut(), geometry.bf_gm(), &mtx_d)?;
        match c.direction {
            CouplingDirection::TestGradient => multiply(&mut gtdg.view_mut(), &gtd.view(), &bf)?,
            CouplingDirection::TrialGradient => multiply_transpose_both(&mut gtdg.view_mut(), &bf, &gtd.view())?,
        }
        reduce_weighted_sum(out, &gtdg.view(), geometry.det())
    }
}

/// Element residual vectors of `dw_diffusion_coupling` for a given trial field.
#[derive(Debug, Clone)]
pub struct DiffusionCouplingResidual<'a, T> {
    pub coupling: DiffusionCoupling<'a, T>,
    /// The trial (state) field.
    pub field: NodalField<'a, T>,
}

impl<'a, T: Real> ElementTerm<T> for DiffusionCouplingResidual<'a, T> {
    type Scratch = CouplingVectorScratch<T>;

    fn name(&self) -> &'static str {
        "dw_diffusion_coupling"
    }

    fn num_elements(&self) -> usize {
        self.coupling.elements.len()
    }

    fn output_block(&self) -> (usize, usize) {
        (self.coupling.test_nodes(), 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let name = self.name();
        self.coupling.validate(name)?;
        self.coupling
            .check_field(name, "field", &self.field, self.coupling.trial_nodes())
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        self.coupling.allocate_vector_scratch()
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let element = self.coupling.elements.element(position);
        self.field
            .gather_element(scratch.st.as_mut_slice(), element);
        self.coupling
            .evaluate_vector(position, element, scratch)?;
        let det = self.coupling.geometry.det().at_batch(element);
        reduce_weighted_sum(out, &scratch.gtdgp.view(), &det)
    }
}

/// Element values of `d_diffusion_coupling`: the residual for `p` contracted with the
/// nodal values of the test field `q`.
#[derive(Debug, Clone)]
pub struct DiffusionCouplingValue<'a, T> {
    pub coupling: DiffusionCoupling<'a, T>,
    pub p: NodalField<'a, T>,
    pub q: NodalField<'a, T>,
}

#[derive(Debug)]
pub struct CouplingValueScratch<T> {
    vector: CouplingVectorScratch<T>,
    sq: BatchedTensor<T>,
    aux: BatchedTensor<T>,
}

impl<'a, T: Real> ElementTerm<T> for DiffusionCouplingValue<'a, T> {
    type Scratch = CouplingValueScratch<T>;

    fn name(&self) -> &'static str {
        "d_diffusion_coupling"
    }

    fn num_elements(&self) -> usize {
        self.coupling.elements.len()
    }

    fn output_block(&self) -> (usize, usize) {
        (1, 1)
    }

    fn validate(&self) -> Result<(), TermError> {
        let name = self.name();
        let c = &self.coupling;
        c.validate(name)?;
        c.check_field(name, "p", &self.p, c.trial_nodes())?;
        c.check_field(name, "q", &self.q, c.test_nodes())
    }

    fn allocate_scratch(&self) -> Result<Self::Scratch, TermError> {
        Ok(CouplingValueScratch {
            vector: self.coupling.allocate_vector_scratch()?,
            sq: scratch(1, self.coupling.test_nodes(), 1)?,
            aux: scratch(self.coupling.geometry.n_qp(), 1, 1)?,
        })
    }

    fn evaluate_element(
        &self,
        position: usize,
        out: &mut TensorViewMut<T>,
        scratch: &mut Self::Scratch,
    ) -> Result<(), TermError> {
        let element = self.coupling.elements.element(position);
        let CouplingValueScratch { vector, sq, aux } = scratch;

        self.p.gather_element(vector.st.as_mut_slice(), element);
        self.coupling
            .evaluate_vector(position, element, vector)?;
        self.q.gather_element(sq.as_mut_slice(), element);
        multiply_transpose_left(&mut aux.view_mut(), &sq.view(), &vector.gtdgp.view())?;

        let det = self.coupling.geometry.det().at_batch(element);
        reduce_weighted_sum(out, &aux.view(), &det)
    }
}
