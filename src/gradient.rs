//! Kernels specialized for stacked-gradient operands.
//!
//! A gradient operand holds, per level, a `dim × n_ep` block whose row `d` contains the
//! derivatives of all `n_ep` element basis functions along spatial direction `d`.
use crate::algebra::LevelMap;
use crate::error::{check_dimension, TermError};
use crate::tensor::{TensorView, TensorViewMut};
use crate::Real;

fn check_levels(
    operation: &'static str,
    out: &TensorViewMut<impl Real>,
    gradient_levels: usize,
) -> Result<(), TermError> {
    if out.n_level() == gradient_levels {
        Ok(())
    } else {
        Err(TermError::shape_mismatch(
            operation,
            "out",
            format!("{gradient_levels} levels"),
            format!("{} levels", out.n_level()),
        ))
    }
}

fn check_block(
    operation: &'static str,
    operand: &'static str,
    (rows, cols): (usize, usize),
    expected: (usize, usize),
) -> Result<(), TermError> {
    if (rows, cols) == expected {
        Ok(())
    } else {
        Err(TermError::shape_mismatch(
            operation,
            operand,
            format!("{} x {} blocks", expected.0, expected.1),
            format!("{rows} x {cols} blocks"),
        ))
    }
}

/// Computes the Gram matrix `out[i, j] = Σ_d g[d, i] g[d, j]` of the gradient operand
/// at every level.
pub fn build_gram_from_gradient<T: Real>(
    out: &mut TensorViewMut<T>,
    gradient: &TensorView<T>,
) -> Result<(), TermError> {
    let operation = "build_gram_from_gradient";
    let dim = gradient.n_row();
    let n_ep = gradient.n_col();
    check_dimension(operation, dim)?;
    check_block(operation, "out", (out.n_row(), out.n_col()), (n_ep, n_ep))?;
    check_levels(operation, out, gradient.n_level())?;

    for level in 0..gradient.n_level() {
        let g = gradient.level(level);
        let out_block = out.level_mut(level);
        for i in 0..n_ep {
            for j in 0..n_ep {
                let mut value = T::zero();
                for d in 0..dim {
                    value += g[d * n_ep + i] * g[d * n_ep + j];
                }
                out_block[i * n_ep + j] = value;
            }
        }
    }
    Ok(())
}

/// Applies the gradient operator to `matrix`: `out[d, c] = Σ_k g[d, k] matrix[k, c]`.
///
/// `matrix` holds `n_ep × n_col` blocks and either one block per level of the gradient or a
/// single block shared by all levels. The result holds `dim × n_col` blocks.
pub fn apply_gradient<T: Real>(
    out: &mut TensorViewMut<T>,
    gradient: &TensorView<T>,
    matrix: &TensorView<T>,
) -> Result<(), TermError> {
    let operation = "apply_gradient";
    let dim = gradient.n_row();
    let n_ep = gradient.n_col();
    let n_col = matrix.n_col();
    check_dimension(operation, dim)?;
    check_block(operation, "matrix", (matrix.n_row(), n_col), (n_ep, n_col))?;
    check_block(operation, "out", (out.n_row(), out.n_col()), (dim, n_col))?;
    check_levels(operation, out, gradient.n_level())?;
    let matrix_levels = LevelMap::resolve(operation, "matrix", matrix.n_level(), gradient.n_level())?;

    for level in 0..gradient.n_level() {
        let g = gradient.level(level);
        let m = matrix.level(matrix_levels.index(level));
        let out_block = out.level_mut(level);
        for d in 0..dim {
            let g_d = &g[d * n_ep..(d + 1) * n_ep];
            for c in 0..n_col {
                let mut value = T::zero();
                for (k, &g_dk) in g_d.iter().enumerate() {
                    value += g_dk * m[k * n_col + c];
                }
                out_block[d * n_col + c] = value;
            }
        }
    }
    Ok(())
}

/// Applies the transposed gradient operator to `matrix`:
/// `out[e, c] = Σ_d g[d, e] matrix[d, c]`.
///
/// `matrix` holds `dim × n_col` blocks and, unlike in [`apply_gradient`], must provide one
/// block per level. The result holds `n_ep × n_col` blocks.
pub fn apply_gradient_transposed<T: Real>(
    out: &mut TensorViewMut<T>,
    gradient: &TensorView<T>,
    matrix: &TensorView<T>,
) -> Result<(), TermError> {
    let operation = "apply_gradient_transposed";
    let dim = gradient.n_row();
    let n_ep = gradient.n_col();
    let n_col = matrix.n_col();
    check_dimension(operation, dim)?;
    check_block(operation, "matrix", (matrix.n_row(), n_col), (dim, n_col))?;
    check_block(operation, "out", (out.n_row(), out.n_col()), (n_ep, n_col))?;
    check_levels(operation, out, gradient.n_level())?;
    if matrix.n_level() != gradient.n_level() {
        return Err(TermError::shape_mismatch(
            operation,
            "matrix",
            format!("{} levels", gradient.n_level()),
            format!("{} levels", matrix.n_level()),
        ));
    }

    for level in 0..gradient.n_level() {
        let g = gradient.level(level);
        let m = matrix.level(level);
        let out_block = out.level_mut(level);
        for e in 0..n_ep {
            for c in 0..n_col {
                let mut value = T::zero();
                for d in 0..dim {
                    value += g[d * n_ep + e] * m[d * n_col + c];
                }
                out_block[e * n_col + c] = value;
            }
        }
    }
    Ok(())
}
