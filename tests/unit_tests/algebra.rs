use crate::unit_tests::{block, scalar, tensor};
use fenris_terms::algebra::{
    multiply, multiply_transpose_both, multiply_transpose_left, multiply_transpose_right, reduce_weighted_sum, scale,
    scale_by_constant, scale_in_place,
};
use fenris_terms::proptest::{batched_tensor, determinants};
use fenris_terms::tensor::{BatchedTensor, TensorShape};
use fenris_terms::ErrorKind;
use matrixcompare::{assert_matrix_eq, prop_assert_matrix_eq};
use nalgebra::DMatrix;
use proptest::prelude::*;

fn zeros(shape: [usize; 4]) -> BatchedTensor<f64> {
    let [b, l, r, c] = shape;
    BatchedTensor::zeros(TensorShape::new(b, l, r, c))
}

#[test]
fn multiply_per_level() {
    #[rustfmt::skip]
    let a = tensor([1, 2, 2, 3], &[
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0,
        // Level 1
        -1.0, 0.0, 2.0,
        0.5, 1.0, -3.0,
    ]);
    #[rustfmt::skip]
    let b = tensor([1, 2, 3, 1], &[
        1.0, 1.0, 1.0,
        // Level 1
        2.0, -1.0, 0.0,
    ]);
    let mut out = zeros([1, 2, 2, 1]);
    multiply(&mut out.view_mut(), &a.view(), &b.view()).unwrap();

    for level in 0..2 {
        let expected = block(&a, 0, level) * block(&b, 0, level);
        assert_matrix_eq!(block(&out, 0, level), expected, comp = abs, tol = 1e-14);
    }
    assert_eq!(out.as_slice(), &[6.0, 15.0, -2.0, 0.0]);
}

#[test]
fn multiply_broadcasts_single_level_operands() {
    let a = tensor([1, 1, 2, 2], &[0.0, 1.0, 1.0, 0.0]);
    let b = tensor([1, 3, 2, 1], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    let mut out = zeros([1, 3, 2, 1]);
    multiply(&mut out.view_mut(), &a.view(), &b.view()).unwrap();
    assert_eq!(out.as_slice(), &[2.0, 1.0, 4.0, 3.0, 6.0, 5.0]);

    // Broadcasting on the right as well
    let mut out = zeros([1, 3, 1, 2]);
    let row = tensor([1, 3, 1, 2], &[1.0, 0.0, 0.0, 1.0, 2.0, 2.0]);
    multiply(&mut out.view_mut(), &row.view(), &a.view()).unwrap();
    assert_eq!(out.as_slice(), &[0.0, 1.0, 1.0, 0.0, 2.0, 2.0]);
}

#[test]
fn multiply_square_matrix_with_column_per_level() {
    #[rustfmt::skip]
    let k = tensor([1, 1, 3, 3], &[
        2.0, 1.0, 0.0,
        1.0, 3.0, -1.0,
        0.0, -1.0, 4.0,
    ]);
    let v = tensor([1, 2, 3, 1], &[1.0, 2.0, 3.0, -1.0, 0.0, 1.0]);
    let mut out = zeros([1, 2, 3, 1]);
    multiply(&mut out.view_mut(), &k.view(), &v.view()).unwrap();
    assert_eq!(out.as_slice(), &[4.0, 4.0, 10.0, -2.0, -2.0, 4.0]);
}

#[test]
fn multiply_uses_current_batch() {
    let a = tensor([2, 1, 1, 1], &[2.0, 3.0]);
    let b = tensor([2, 1, 1, 1], &[5.0, 7.0]);
    let mut out = zeros([2, 1, 1, 1]);
    let mut out_view = out.view_mut();
    out_view.set_slice(1);
    multiply(&mut out_view, &a.view().at_batch(1), &b.view().at_batch(0)).unwrap();
    assert_eq!(out.as_slice(), &[0.0, 15.0]);
}

#[test]
fn transposed_products_match_nalgebra() {
    let a = tensor([1, 1, 3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let b = tensor([1, 1, 3, 2], &[-1.0, 0.5, 2.0, 1.0, 0.0, -2.0]);
    let (a_mat, b_mat) = (block(&a, 0, 0), block(&b, 0, 0));

    let mut atb = zeros([1, 1, 2, 2]);
    multiply_transpose_left(&mut atb.view_mut(), &a.view(), &b.view()).unwrap();
    assert_matrix_eq!(block(&atb, 0, 0), a_mat.transpose() * &b_mat, comp = abs, tol = 1e-14);

    let mut abt = zeros([1, 1, 3, 3]);
    multiply_transpose_right(&mut abt.view_mut(), &a.view(), &b.view()).unwrap();
    assert_matrix_eq!(block(&abt, 0, 0), &a_mat * b_mat.transpose(), comp = abs, tol = 1e-14);

    let c = tensor([1, 1, 2, 3], &[1.0, 0.0, 2.0, -1.0, 3.0, 1.0]);
    let mut atct = zeros([1, 1, 2, 2]);
    multiply_transpose_both(&mut atct.view_mut(), &a.view(), &c.view()).unwrap();
    let expected = a_mat.transpose() * block(&c, 0, 0).transpose();
    assert_matrix_eq!(block(&atct, 0, 0), expected, comp = abs, tol = 1e-14);
}

#[test]
fn multiply_rejects_incompatible_shapes() {
    let a = tensor([1, 1, 2, 3], &[0.0; 6]);
    let b = tensor([1, 1, 2, 1], &[0.0; 2]);
    let mut out = zeros([1, 1, 2, 1]);
    let err = multiply(&mut out.view_mut(), &a.view(), &b.view()).unwrap_err();
    assert_eq!(err.operation(), "multiply");
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "b", .. }));

    let b = tensor([1, 1, 3, 1], &[0.0; 3]);
    let mut out = zeros([1, 1, 3, 1]);
    let err = multiply(&mut out.view_mut(), &a.view(), &b.view()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "out", .. }));

    // Neither per-level nor broadcast
    let a = tensor([1, 2, 1, 1], &[1.0, 2.0]);
    let b = tensor([1, 3, 1, 1], &[1.0, 2.0, 3.0]);
    let mut out = zeros([1, 3, 1, 1]);
    let err = multiply(&mut out.view_mut(), &a.view(), &b.view()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "a", .. }));
}

#[test]
fn scale_by_level_factors() {
    let a = tensor([1, 2, 1, 2], &[1.0, 2.0, 3.0, 4.0]);
    let factors = tensor([1, 2, 1, 1], &[10.0, -1.0]);
    let mut out = zeros([1, 2, 1, 2]);
    scale(&mut out.view_mut(), &a.view(), &factors.view()).unwrap();
    assert_eq!(out.as_slice(), &[10.0, 20.0, -3.0, -4.0]);

    scale(&mut out.view_mut(), &a.view(), &scalar(0.5).view()).unwrap();
    assert_eq!(out.as_slice(), &[0.5, 1.0, 1.5, 2.0]);

    scale_in_place(&mut out.view_mut(), &factors.view()).unwrap();
    assert_eq!(out.as_slice(), &[5.0, 10.0, -1.5, -2.0]);

    scale_by_constant(&mut out.view_mut(), 2.0);
    assert_eq!(out.as_slice(), &[10.0, 20.0, -3.0, -4.0]);
}

#[test]
fn scale_rejects_non_scalar_factors() {
    let a = tensor([1, 1, 1, 2], &[1.0, 2.0]);
    let factors = tensor([1, 1, 1, 2], &[1.0, 2.0]);
    let mut out = zeros([1, 1, 1, 2]);
    let err = scale(&mut out.view_mut(), &a.view(), &factors.view()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "factors", .. }));
    assert!(scale_in_place(&mut out.view_mut(), &factors.view()).is_err());
}

#[test]
fn reduce_weighted_sum_integrates_levels() {
    let a = tensor([1, 3, 1, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let weights = tensor([1, 3, 1, 1], &[0.5, 0.25, 2.0]);
    let mut out = tensor([1, 1, 1, 2], &[100.0, 100.0]);
    reduce_weighted_sum(&mut out.view_mut(), &a.view(), &weights.view()).unwrap();
    assert_eq!(out.as_slice(), &[0.5 + 0.75 + 10.0, 1.0 + 1.0 + 12.0]);
}

#[test]
fn reduce_weighted_sum_accumulates_in_ascending_order() {
    // Summation in any other order gives a different floating point result
    let a = tensor([1, 3, 1, 1], &[1.0, 1e16, -1e16]);
    let weights = tensor([1, 3, 1, 1], &[1.0, 1.0, 1.0]);
    let mut out = zeros([1, 1, 1, 1]);
    reduce_weighted_sum(&mut out.view_mut(), &a.view(), &weights.view()).unwrap();
    assert_eq!(out.as_slice(), &[((0.0 + 1.0) + 1e16) - 1e16]);
}

#[test]
fn reduce_weighted_sum_rejects_bad_operands() {
    let a = tensor([1, 2, 1, 1], &[1.0, 2.0]);
    let mut out = zeros([1, 2, 1, 1]);
    let weights = tensor([1, 2, 1, 1], &[1.0, 1.0]);
    let err = reduce_weighted_sum(&mut out.view_mut(), &a.view(), &weights.view()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "out", .. }));

    let mut out = zeros([1, 1, 1, 1]);
    let err = reduce_weighted_sum(&mut out.view_mut(), &a.view(), &scalar(1.0).view()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "weights", .. }));
}

proptest! {
    #[test]
    fn multiply_transpose_left_agrees_with_nalgebra(
        (a, b) in (1usize..4, 1usize..4, 1usize..4, 1usize..4)
            .prop_flat_map(|(l, k, m, n)| (
                batched_tensor(TensorShape::new(1, l, k, m)),
                batched_tensor(TensorShape::new(1, l, k, n))
            ))
    ) {
        let shape = a.shape();
        let mut out = zeros([1, shape.n_level, shape.n_col, b.shape().n_col]);
        multiply_transpose_left(&mut out.view_mut(), &a.view(), &b.view()).unwrap();
        for level in 0 .. shape.n_level {
            let expected: DMatrix<f64> = block(&a, 0, level).transpose() * block(&b, 0, level);
            prop_assert_matrix_eq!(block(&out, 0, level), expected, comp = abs, tol = 1e-12);
        }
    }

    #[test]
    fn multiply_and_transpose_right_agree_with_nalgebra(
        (a, b, c) in (1usize..4, 1usize..6, 1usize..6, 1usize..6)
            .prop_flat_map(|(l, m, k, n)| (
                batched_tensor(TensorShape::new(1, l, m, k)),
                batched_tensor(TensorShape::new(1, l, k, n)),
                batched_tensor(TensorShape::new(1, l, n, k)),
            ))
    ) {
        let (n_level, m, n) = (a.shape().n_level, a.shape().n_row, b.shape().n_col);
        let mut ab = zeros([1, n_level, m, n]);
        multiply(&mut ab.view_mut(), &a.view(), &b.view()).unwrap();
        let mut act = zeros([1, n_level, m, n]);
        multiply_transpose_right(&mut act.view_mut(), &a.view(), &c.view()).unwrap();
        for level in 0 .. n_level {
            let a_block = block(&a, 0, level);
            let expected: DMatrix<f64> = &a_block * block(&b, 0, level);
            prop_assert_matrix_eq!(block(&ab, 0, level), expected, comp = abs, tol = 1e-12);
            let expected: DMatrix<f64> = &a_block * block(&c, 0, level).transpose();
            prop_assert_matrix_eq!(block(&act, 0, level), expected, comp = abs, tol = 1e-12);
        }
    }

    #[test]
    fn reduce_weighted_sum_is_linear_in_weights(
        (a, weights) in (1usize..5, 1usize..4, 1usize..4)
            .prop_flat_map(|(l, r, c)| (batched_tensor(TensorShape::new(1, l, r, c)), determinants(1, l))),
        factor in 0.1 .. 10.0
    ) {
        let shape = a.shape();
        let mut out = zeros([1, 1, shape.n_row, shape.n_col]);
        reduce_weighted_sum(&mut out.view_mut(), &a.view(), &weights.view()).unwrap();

        let mut scaled_weights = weights.clone();
        scale_by_constant(&mut scaled_weights.view_mut(), factor);
        let mut scaled_out = out.clone();
        reduce_weighted_sum(&mut scaled_out.view_mut(), &a.view(), &scaled_weights.view()).unwrap();

        let expected = block(&out, 0, 0) * factor;
        prop_assert_matrix_eq!(block(&scaled_out, 0, 0), expected, comp = abs, tol = 1e-10);
    }
}
