//! Proptest strategies for tensors and element geometry.
use crate::geometry::{SurfaceGeometry, VolumeGeometry};
use crate::tensor::{BatchedTensor, TensorShape};
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// Values in a reasonably small range, so that products of a few of them stay well
/// within the range where absolute tolerances are meaningful.
pub fn value() -> impl Strategy<Value = f64> {
    -10.0..10.0
}

/// Strictly positive integration weights.
pub fn weight() -> impl Strategy<Value = f64> {
    0.01..2.0
}

pub fn spatial_dim() -> impl Strategy<Value = usize> {
    2usize..=3
}

/// A tensor of the given shape with values drawn from [`value`].
pub fn batched_tensor(shape: TensorShape) -> impl Strategy<Value = BatchedTensor<f64>> {
    vec(value(), shape.len()).prop_map(move |data| BatchedTensor::from_vec(shape, data).unwrap())
}

/// Determinant weights `[n_el, n_qp, 1, 1]` drawn from [`weight`].
pub fn determinants(n_el: usize, n_qp: usize) -> impl Strategy<Value = BatchedTensor<f64>> {
    let shape = TensorShape::new(n_el, n_qp, 1, 1);
    vec(weight(), shape.len()).prop_map(move |data| BatchedTensor::from_vec(shape, data).unwrap())
}

/// Sizes of a small batch of elements.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ElementBatchSize {
    pub n_el: usize,
    pub n_qp: usize,
    pub dim: usize,
    pub n_ep: usize,
}

impl ElementBatchSize {
    pub fn gradient_shape(&self) -> TensorShape {
        TensorShape::new(self.n_el, self.n_qp, self.dim, self.n_ep)
    }

    /// Shape of a per-element field with the given block, e.g. `(dim, 1)` for a gradient.
    pub fn field_shape(&self, rows: usize, cols: usize) -> TensorShape {
        TensorShape::new(self.n_el, self.n_qp, rows, cols)
    }
}

impl Arbitrary for ElementBatchSize {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (1usize..=4, 1usize..=4, spatial_dim(), 1usize..=8)
            .prop_map(|(n_el, n_qp, dim, n_ep)| Self { n_el, n_qp, dim, n_ep })
            .boxed()
    }
}

/// Basis function gradients and determinants of a batch of elements.
#[derive(Debug, Clone)]
pub struct VolumeGeometryData {
    pub size: ElementBatchSize,
    pub bf_gm: BatchedTensor<f64>,
    pub det: BatchedTensor<f64>,
}

impl VolumeGeometryData {
    pub fn geometry(&self) -> VolumeGeometry<'_, f64> {
        VolumeGeometry::new(self.bf_gm.view(), self.det.view()).unwrap()
    }
}

pub fn volume_geometry_data(size: ElementBatchSize) -> impl Strategy<Value = VolumeGeometryData> {
    (batched_tensor(size.gradient_shape()), determinants(size.n_el, size.n_qp))
        .prop_map(move |(bf_gm, det)| VolumeGeometryData { size, bf_gm, det })
}

impl Arbitrary for VolumeGeometryData {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<ElementBatchSize>()
            .prop_flat_map(volume_geometry_data)
            .boxed()
    }
}

/// Facet normals, determinants and areas of a batch of surface elements.
#[derive(Debug, Clone)]
pub struct SurfaceGeometryData {
    pub n_fa: usize,
    pub n_qp: usize,
    pub dim: usize,
    pub normal: BatchedTensor<f64>,
    pub det: BatchedTensor<f64>,
    pub area: BatchedTensor<f64>,
}

impl SurfaceGeometryData {
    pub fn geometry(&self) -> SurfaceGeometry<'_, f64> {
        SurfaceGeometry::new(self.normal.view(), self.det.view(), self.area.view()).unwrap()
    }
}

impl Arbitrary for SurfaceGeometryData {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (1usize..=4, 1usize..=4, spatial_dim())
            .prop_flat_map(|(n_fa, n_qp, dim)| {
                let areas = TensorShape::new(n_fa, 1, 1, 1);
                (
                    batched_tensor(TensorShape::new(n_fa, n_qp, dim, 1)),
                    determinants(n_fa, n_qp),
                    vec(weight(), n_fa).prop_map(move |data| BatchedTensor::from_vec(areas, data).unwrap()),
                )
                    .prop_map(move |(normal, det, area)| Self {
                        n_fa,
                        n_qp,
                        dim,
                        normal,
                        det,
                        area,
                    })
            })
            .boxed()
    }
}
