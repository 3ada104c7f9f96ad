//! Level-wise dense tensor algebra on the current batch slice of views.
//!
//! Every kernel operates on the current slice of each operand, level by level. An operand
//! with a single level is *broadcast*: its block is reused for every level of the output.
use crate::error::TermError;
use crate::tensor::{TensorView, TensorViewMut};
use crate::Real;
use itertools::izip;

/// How the levels of an operand map onto the levels of the output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum LevelMap {
    PerLevel,
    Broadcast,
}

impl LevelMap {
    pub(crate) fn resolve(
        operation: &'static str,
        operand: &'static str,
        operand_levels: usize,
        n_level: usize,
    ) -> Result<Self, TermError> {
        if operand_levels == n_level {
            Ok(Self::PerLevel)
        } else if operand_levels == 1 {
            Ok(Self::Broadcast)
        } else {
            Err(TermError::shape_mismatch(
                operation,
                operand,
                format!("1 or {n_level} levels"),
                format!("{operand_levels} levels"),
            ))
        }
    }

    pub(crate) fn index(self, level: usize) -> usize {
        match self {
            Self::PerLevel => level,
            Self::Broadcast => 0,
        }
    }
}

/// Maps an entry `(i, j)` of the block, as seen in the given orientation, to its offset in
/// the row-major storage of the block.
fn oriented_offset(n_col: usize, transposed: bool) -> impl Fn(usize, usize) -> usize {
    move |i, j| {
        if transposed {
            j * n_col + i
        } else {
            i * n_col + j
        }
    }
}

fn oriented_dims<T: Real>(view: &TensorView<T>, transposed: bool) -> (usize, usize) {
    if transposed {
        (view.n_col(), view.n_row())
    } else {
        (view.n_row(), view.n_col())
    }
}

fn product<T: Real>(
    operation: &'static str,
    out: &mut TensorViewMut<T>,
    a: &TensorView<T>,
    transpose_a: bool,
    b: &TensorView<T>,
    transpose_b: bool,
) -> Result<(), TermError> {
    let (a_rows, a_cols) = oriented_dims(a, transpose_a);
    let (b_rows, b_cols) = oriented_dims(b, transpose_b);
    if a_cols != b_rows {
        return Err(TermError::shape_mismatch(
            operation,
            "b",
            format!("{a_cols} (oriented) rows"),
            format!("{b_rows} (oriented) rows"),
        ));
    }
    if out.n_row() != a_rows || out.n_col() != b_cols {
        return Err(TermError::shape_mismatch(
            operation,
            "out",
            format!("{a_rows} x {b_cols} blocks"),
            format!("{} x {} blocks", out.n_row(), out.n_col()),
        ));
    }

    let n_level = out.n_level();
    let a_levels = LevelMap::resolve(operation, "a", a.n_level(), n_level)?;
    let b_levels = LevelMap::resolve(operation, "b", b.n_level(), n_level)?;

    let a_offset = oriented_offset(a.n_col(), transpose_a);
    let b_offset = oriented_offset(b.n_col(), transpose_b);
    for level in 0..n_level {
        let a_block = a.level(a_levels.index(level));
        let b_block = b.level(b_levels.index(level));
        let out_block = out.level_mut(level);
        for i in 0..a_rows {
            for j in 0..b_cols {
                let mut value = T::zero();
                for k in 0..a_cols {
                    value += a_block[a_offset(i, k)] * b_block[b_offset(k, j)];
                }
                out_block[i * b_cols + j] = value;
            }
        }
    }
    Ok(())
}

/// Computes `out = a * b` for every level.
pub fn multiply<T: Real>(out: &mut TensorViewMut<T>, a: &TensorView<T>, b: &TensorView<T>) -> Result<(), TermError> {
    product("multiply", out, a, false, b, false)
}

/// Computes `out = aᵀ * b` for every level.
pub fn multiply_transpose_left<T: Real>(
    out: &mut TensorViewMut<T>,
    a: &TensorView<T>,
    b: &TensorView<T>,
) -> Result<(), TermError> {
    product("multiply_transpose_left", out, a, true, b, false)
}

/// Computes `out = a * bᵀ` for every level.
pub fn multiply_transpose_right<T: Real>(
    out: &mut TensorViewMut<T>,
    a: &TensorView<T>,
    b: &TensorView<T>,
) -> Result<(), TermError> {
    product("multiply_transpose_right", out, a, false, b, true)
}

/// Computes `out = aᵀ * bᵀ` for every level.
pub fn multiply_transpose_both<T: Real>(
    out: &mut TensorViewMut<T>,
    a: &TensorView<T>,
    b: &TensorView<T>,
) -> Result<(), TermError> {
    product("multiply_transpose_both", out, a, true, b, true)
}

fn check_scalar_factors<T: Real>(
    operation: &'static str,
    factors: &TensorView<T>,
    n_level: usize,
) -> Result<LevelMap, TermError> {
    if factors.n_row() != 1 || factors.n_col() != 1 {
        return Err(TermError::shape_mismatch(
            operation,
            "factors",
            "1 x 1 blocks",
            format!("{} x {} blocks", factors.n_row(), factors.n_col()),
        ));
    }
    LevelMap::resolve(operation, "factors", factors.n_level(), n_level)
}

/// Computes `out[l] = factor[l] * a[l]`, where `factors` holds one scalar per level
/// (or a single scalar for all levels).
pub fn scale<T: Real>(out: &mut TensorViewMut<T>, a: &TensorView<T>, factors: &TensorView<T>) -> Result<(), TermError> {
    let operation = "scale";
    if out.n_row() != a.n_row() || out.n_col() != a.n_col() {
        return Err(TermError::shape_mismatch(
            operation,
            "out",
            format!("{} x {} blocks", a.n_row(), a.n_col()),
            format!("{} x {} blocks", out.n_row(), out.n_col()),
        ));
    }
    let n_level = out.n_level();
    let a_levels = LevelMap::resolve(operation, "a", a.n_level(), n_level)?;
    let factor_levels = check_scalar_factors(operation, factors, n_level)?;

    for level in 0..n_level {
        let factor = factors.level(factor_levels.index(level))[0];
        let a_block = a.level(a_levels.index(level));
        for (o, &x) in izip!(out.level_mut(level), a_block) {
            *o = x * factor;
        }
    }
    Ok(())
}

/// In-place variant of [`scale`].
pub fn scale_in_place<T: Real>(a: &mut TensorViewMut<T>, factors: &TensorView<T>) -> Result<(), TermError> {
    let n_level = a.n_level();
    let factor_levels = check_scalar_factors("scale_in_place", factors, n_level)?;
    for level in 0..n_level {
        let factor = factors.level(factor_levels.index(level))[0];
        for x in a.level_mut(level) {
            *x *= factor;
        }
    }
    Ok(())
}

/// Multiplies every value of the current slice by a constant.
pub fn scale_by_constant<T: Real>(a: &mut TensorViewMut<T>, factor: T) {
    for x in a.slice_mut() {
        *x *= factor;
    }
}

/// Integrates over levels: `out = Σ_l weights[l] * a[l]`.
///
/// `out` must have a single level with the block shape of `a`, and `weights` one `1 × 1`
/// block per level of `a`. Levels are accumulated one after the other in ascending order,
/// so results are reproducible to the last bit.
pub fn reduce_weighted_sum<T: Real>(
    out: &mut TensorViewMut<T>,
    a: &TensorView<T>,
    weights: &TensorView<T>,
) -> Result<(), TermError> {
    let operation = "reduce_weighted_sum";
    if out.n_level() != 1 || out.n_row() != a.n_row() || out.n_col() != a.n_col() {
        return Err(TermError::shape_mismatch(
            operation,
            "out",
            format!("1 level of {} x {} blocks", a.n_row(), a.n_col()),
            format!("{} levels of {} x {} blocks", out.n_level(), out.n_row(), out.n_col()),
        ));
    }
    if weights.n_level() != a.n_level() || weights.n_row() != 1 || weights.n_col() != 1 {
        return Err(TermError::shape_mismatch(
            operation,
            "weights",
            format!("{} levels of 1 x 1 blocks", a.n_level()),
            format!(
                "{} levels of {} x {} blocks",
                weights.n_level(),
                weights.n_row(),
                weights.n_col()
            ),
        ));
    }

    let out_block = out.level_mut(0);
    out_block.fill(T::zero());
    for (level, &weight) in weights.slice().iter().enumerate() {
        for (o, &x) in izip!(out_block.iter_mut(), a.level(level)) {
            *o += x * weight;
        }
    }
    Ok(())
}
