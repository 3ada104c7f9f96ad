//! Element geometry data consumed by the term evaluators.
use crate::error::{check_shape, TermError};
use crate::tensor::{TensorShape, TensorView};
use crate::Real;

/// Volume geometry of a set of elements.
///
/// - `bf_gm`: physical basis function gradients, `[n_el or 1, n_qp, dim, n_ep]`.
/// - `det`: Jacobian determinants times quadrature weights, `[n_el, n_qp, 1, 1]`.
#[derive(Debug, Copy, Clone)]
pub struct VolumeGeometry<'a, T> {
    bf_gm: TensorView<'a, T>,
    det: TensorView<'a, T>,
}

impl<'a, T: Real> VolumeGeometry<'a, T> {
    pub fn new(bf_gm: TensorView<'a, T>, det: TensorView<'a, T>) -> Result<Self, TermError> {
        let operation = "VolumeGeometry::new";
        let n_el = det.n_batch();
        let n_qp = bf_gm.n_level();
        check_shape(operation, "det", det.shape(), TensorShape::new(n_el, n_qp, 1, 1))?;
        if bf_gm.n_batch() != 1 && bf_gm.n_batch() != n_el {
            return Err(TermError::shape_mismatch(
                operation,
                "bf_gm",
                format!("1 or {n_el} batches"),
                format!("{} batches", bf_gm.n_batch()),
            ));
        }
        Ok(Self { bf_gm, det })
    }

    pub fn n_elements(&self) -> usize {
        self.det.n_batch()
    }

    pub fn n_qp(&self) -> usize {
        self.bf_gm.n_level()
    }

    pub fn dim(&self) -> usize {
        self.bf_gm.n_row()
    }

    /// Number of element nodes (basis functions).
    pub fn n_ep(&self) -> usize {
        self.bf_gm.n_col()
    }

    pub fn bf_gm(&self) -> &TensorView<'a, T> {
        &self.bf_gm
    }

    pub fn det(&self) -> &TensorView<'a, T> {
        &self.det
    }

    /// A copy with all cursors positioned on the given element.
    pub fn at_element(&self, element: usize) -> Self {
        Self {
            bf_gm: self.bf_gm.at_batch_or_shared(element),
            det: self.det.at_batch(element),
        }
    }

    /// Measure of the current element, `Σ_q det[q]`.
    pub fn volume(&self) -> T {
        self.det
            .slice()
            .iter()
            .fold(T::zero(), |volume, &det| volume + det)
    }
}

/// Surface geometry of a set of facets.
///
/// - `normal`: outward unit normals, `[n_fa, n_qp, dim, 1]`.
/// - `det`: surface Jacobian determinants times quadrature weights, `[n_fa, n_qp, 1, 1]`.
/// - `area`: facet areas, `[n_fa, 1, 1, 1]`.
#[derive(Debug, Copy, Clone)]
pub struct SurfaceGeometry<'a, T> {
    normal: TensorView<'a, T>,
    det: TensorView<'a, T>,
    area: TensorView<'a, T>,
}

impl<'a, T: Real> SurfaceGeometry<'a, T> {
    pub fn new(normal: TensorView<'a, T>, det: TensorView<'a, T>, area: TensorView<'a, T>) -> Result<Self, TermError> {
        let operation = "SurfaceGeometry::new";
        let n_fa = normal.n_batch();
        let n_qp = normal.n_level();
        if normal.n_col() != 1 {
            return Err(TermError::shape_mismatch(
                operation,
                "normal",
                format!("[{n_fa}, {n_qp}, dim, 1]"),
                normal.shape(),
            ));
        }
        check_shape(operation, "det", det.shape(), TensorShape::new(n_fa, n_qp, 1, 1))?;
        check_shape(operation, "area", area.shape(), TensorShape::new(n_fa, 1, 1, 1))?;
        Ok(Self { normal, det, area })
    }

    pub fn n_elements(&self) -> usize {
        self.normal.n_batch()
    }

    pub fn n_qp(&self) -> usize {
        self.normal.n_level()
    }

    pub fn dim(&self) -> usize {
        self.normal.n_row()
    }

    pub fn normal(&self) -> &TensorView<'a, T> {
        &self.normal
    }

    pub fn det(&self) -> &TensorView<'a, T> {
        &self.det
    }

    pub fn at_element(&self, element: usize) -> Self {
        Self {
            normal: self.normal.at_batch(element),
            det: self.det.at_batch(element),
            area: self.area.at_batch(element),
        }
    }

    /// Area of the current facet.
    pub fn area(&self) -> T {
        self.area.current()[0]
    }
}
