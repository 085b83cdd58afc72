//! Unblocked reference and blocked tiled algorithms for one matrix triple.
//!
//! [`serial_gemm`] is the single-entry entry point. It validates the call,
//! applies `beta` to C exactly once and then runs the selected [`Algo`]:
//!
//! - [`Algo::Unblocked`]: the triple loop, used as the correctness oracle.
//! - [`Algo::Blocked`]: walks the `ceil(m/MB) × ceil(n/NB)` output tiles and
//!   calls [`InnerGemm::invoke`] on interior tiles and
//!   [`InnerGemm::invoke_remainder`]'s unchecked core on boundary tiles.
//!
//! Tile shapes are const generics of the kernel. [`TileShape`] is the
//! runtime key that selects one of the instantiated shapes.

use std::cmp::min;
use std::fmt;

use tracing::trace;

use crate::error::{shape_error, unsupported, Result};
use crate::kernel::InnerGemm;
use crate::scalar::Scalar;
use crate::trans::Trans;
use crate::view::{MatrixView, MatrixViewMut};
use crate::{DEFAULT_MB, DEFAULT_NB};

/// Output tile extents of the blocked algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileShape {
    pub mb: usize,
    pub nb: usize,
}

impl TileShape {
    pub const DEFAULT: TileShape = TileShape::new(DEFAULT_MB, DEFAULT_NB);

    /// Shapes with an instantiated kernel.
    pub const SUPPORTED: [TileShape; 6] = [
        TileShape::new(2, 2),
        TileShape::new(3, 3),
        TileShape::new(4, 4),
        TileShape::new(5, 5),
        TileShape::new(4, 8),
        TileShape::new(8, 4),
    ];

    pub const fn new(mb: usize, nb: usize) -> Self {
        Self { mb, nb }
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl Default for TileShape {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TileShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.mb, self.nb)
    }
}

/// Algorithm used for each matrix triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algo {
    Unblocked,
    Blocked(TileShape),
}

impl Algo {
    /// Blocked algorithm with the default tile.
    pub const fn blocked() -> Self {
        Algo::Blocked(TileShape::DEFAULT)
    }

    /// Rejects tile shapes that have no kernel instantiation.
    pub fn check(&self) -> Result<()> {
        match self {
            Algo::Blocked(tile) if !tile.is_supported() => Err(unsupported(format!(
                "no inner kernel instantiated for tile {tile}; supported tiles are {}",
                TileShape::SUPPORTED
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for Algo {
    fn default() -> Self {
        Algo::blocked()
    }
}

impl fmt::Display for Algo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algo::Unblocked => write!(f, "unblocked"),
            Algo::Blocked(tile) => write!(f, "blocked({tile})"),
        }
    }
}

/// Validates transpose support and operand shapes for
/// `C(m×n) = op(A)(m×k) * op(B)(k×n)`; returns `(m, n, k)`.
pub(crate) fn check_shapes<T: Scalar>(
    trans_a: Trans,
    trans_b: Trans,
    a: (usize, usize),
    b: (usize, usize),
    c: (usize, usize),
) -> Result<(usize, usize, usize)> {
    trans_a.check::<T>()?;
    trans_b.check::<T>()?;

    let (m, n) = c;
    let (am, ak) = trans_a.op_shape(a.0, a.1);
    if am != m {
        return Err(shape_error("op(A)", (m, ak), (am, ak)));
    }
    let (bk, bn) = trans_b.op_shape(b.0, b.1);
    if (bk, bn) != (ak, n) {
        return Err(shape_error("op(B)", (ak, n), (bk, bn)));
    }
    Ok((m, n, ak))
}

/// One GEMM: `C := alpha * op(A) * op(B) + beta * C`.
///
/// `alpha` and `beta` may be of any type convertible into the element type,
/// so real coefficients can drive a complex problem. Every check happens
/// before C is written. `beta == 0` overwrites C without reading it.
#[allow(clippy::too_many_arguments)]
pub fn serial_gemm<T: Scalar, S: Into<T>>(
    trans_a: Trans,
    trans_b: Trans,
    algo: Algo,
    alpha: S,
    a: MatrixView<'_, T>,
    b: MatrixView<'_, T>,
    beta: S,
    c: &mut MatrixViewMut<'_, T>,
) -> Result<()> {
    check_shapes::<T>(trans_a, trans_b, a.shape(), b.shape(), c.shape())?;
    let routine = algo.routine::<T>()?;

    let (a, b) = (trans_a.op(a), trans_b.op(b));
    trace!(
        m = c.rows(),
        n = c.cols(),
        k = a.cols(),
        %trans_a,
        %trans_b,
        %algo,
        "serial gemm"
    );
    apply(routine, alpha.into(), a, b, beta.into(), c);
    Ok(())
}

/// Per-entry product routine: `C += alpha * A * B` on transposed operands.
pub(crate) type AlgoFn<T> =
    for<'a, 'b, 'c, 'd> fn(T, MatrixView<'a, T>, MatrixView<'b, T>, &'c mut MatrixViewMut<'d, T>);

impl Algo {
    /// Resolves the algorithm to its routine, instantiated for `T` and the
    /// tile shape.
    pub(crate) fn routine<T: Scalar>(&self) -> Result<AlgoFn<T>> {
        self.check()?;
        let routine: AlgoFn<T> = match *self {
            Algo::Unblocked => unblocked::<T>,
            Algo::Blocked(tile) => match (tile.mb, tile.nb) {
                (2, 2) => blocked::<T, 2, 2>,
                (3, 3) => blocked::<T, 3, 3>,
                (4, 4) => blocked::<T, 4, 4>,
                (5, 5) => blocked::<T, 5, 5>,
                (4, 8) => blocked::<T, 4, 8>,
                (8, 4) => blocked::<T, 8, 4>,
                _ => {
                    return Err(unsupported(format!(
                        "no inner kernel instantiated for tile {tile}"
                    )))
                }
            },
        };
        Ok(routine)
    }
}

/// Runs a validated GEMM on already transposed operands.
pub(crate) fn apply<T: Scalar>(
    routine: AlgoFn<T>,
    alpha: T,
    a: MatrixView<'_, T>,
    b: MatrixView<'_, T>,
    beta: T,
    c: &mut MatrixViewMut<'_, T>,
) {
    scale(beta, c);

    if c.rows() == 0 || c.cols() == 0 || a.cols() == 0 || alpha == T::zero() {
        return;
    }
    routine(alpha, a, b, c);
}

/// `C := beta * C`; `beta == 0` writes zeros without reading.
fn scale<T: Scalar>(beta: T, c: &mut MatrixViewMut<'_, T>) {
    if beta == T::one() {
        return;
    }
    if beta == T::zero() {
        c.fill(T::zero());
    } else {
        c.map_inplace(|x| beta * x);
    }
}

/// Reference triple loop: `C[i,j] += alpha * Σ_l A[i,l] * B[l,j]`.
fn unblocked<T: Scalar>(
    alpha: T,
    a: MatrixView<'_, T>,
    b: MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
) {
    let (m, n, k) = (c.rows(), c.cols(), a.cols());
    for i in 0..m {
        for j in 0..n {
            let mut sum = T::zero();
            for l in 0..k {
                sum += unsafe { a.get_unchecked(i, l) * b.get_unchecked(l, j) };
            }
            unsafe {
                let cij = c.get_unchecked(i, j);
                c.set_unchecked(i, j, cij + alpha * sum);
            }
        }
    }
}

/// Tiled algorithm over `MB × NB` output tiles.
///
/// Boundary tiles go straight to the remainder kernel; they are not split
/// further.
pub(crate) fn blocked<T: Scalar, const MB: usize, const NB: usize>(
    alpha: T,
    a: MatrixView<'_, T>,
    b: MatrixView<'_, T>,
    c: &mut MatrixViewMut<'_, T>,
) {
    let (m, n, k) = (c.rows(), c.cols(), a.cols());
    let kernel = InnerGemm::<MB, NB>::new(
        a.row_stride(),
        a.col_stride(),
        b.row_stride(),
        b.col_stride(),
        c.row_stride(),
        c.col_stride(),
    )
    .with_conj(a.is_conj(), b.is_conj());

    for i0 in (0..m).step_by(MB) {
        let mi = min(MB, m - i0);
        let a_panel = a.ptr_at(i0, 0);
        for j0 in (0..n).step_by(NB) {
            let nj = min(NB, n - j0);
            let b_panel = b.ptr_at(0, j0);
            let c_tile = c.ptr_at(i0, j0);
            // SAFETY: the views were bounds-checked at construction and the
            // tile lies inside C; A and B panels cover rows i0..i0+mi and
            // columns j0..j0+nj over the whole reduction.
            unsafe {
                if mi == MB && nj == NB {
                    kernel.invoke(alpha, a_panel, b_panel, k, c_tile);
                } else {
                    kernel.remainder_unchecked(alpha, a_panel, b_panel, mi, nj, k, c_tile);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GemmError;
    use num::complex::Complex64;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vec(len: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    fn run_both(
        trans_a: Trans,
        trans_b: Trans,
        tile: TileShape,
        m: usize,
        n: usize,
        k: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(42);
        let (ar, ac) = trans_a.op_shape(m, k);
        let (br, bc) = trans_b.op_shape(k, n);
        let a = random_vec(ar * ac, &mut rng);
        let b = random_vec(br * bc, &mut rng);
        let c0 = random_vec(m * n, &mut rng);
        let mut c1 = c0.clone();
        let mut c2 = c0.clone();

        let av = MatrixView::from_row_major(&a, ar, ac).unwrap();
        let bv = MatrixView::from_row_major(&b, br, bc).unwrap();
        let mut cv1 = MatrixViewMut::from_row_major(&mut c1, m, n).unwrap();
        let mut cv2 = MatrixViewMut::from_row_major(&mut c2, m, n).unwrap();

        serial_gemm(trans_a, trans_b, Algo::Unblocked, 1.5, av, bv, 3.0, &mut cv1).unwrap();
        serial_gemm(trans_a, trans_b, Algo::Blocked(tile), 1.5, av, bv, 3.0, &mut cv2).unwrap();
        (c1, c2)
    }

    #[test]
    fn test_blocked_matches_unblocked_all_tiles() {
        for tile in TileShape::SUPPORTED {
            for (m, n, k) in [(1, 1, 1), (7, 9, 5), (8, 8, 8), (13, 3, 11)] {
                for ta in Trans::REAL {
                    for tb in Trans::REAL {
                        let (c1, c2) = run_both(ta, tb, tile, m, n, k);
                        for (x, y) in c1.iter().zip(&c2) {
                            assert!(
                                (x - y).abs() < 1e-12,
                                "tile {tile} {ta}{tb} ({m},{n},{k}): {x} != {y}"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Plain row-major `alpha * op(A) * op(B) + beta * C`, indexing storage directly.
    #[allow(clippy::too_many_arguments)]
    fn naive_gemm(
        trans_a: Trans,
        trans_b: Trans,
        (m, n, k): (usize, usize, usize),
        alpha: f64,
        a: &[f64],
        b: &[f64],
        beta: f64,
        c: &[f64],
    ) -> Vec<f64> {
        let a_at = |i: usize, l: usize| match trans_a {
            Trans::NoTranspose => a[i * k + l],
            _ => a[l * m + i],
        };
        let b_at = |l: usize, j: usize| match trans_b {
            Trans::NoTranspose => b[l * n + j],
            _ => b[j * k + l],
        };
        let mut out = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let dot: f64 = (0..k).map(|l| a_at(i, l) * b_at(l, j)).sum();
                out[i * n + j] = alpha * dot + beta * c[i * n + j];
            }
        }
        out
    }

    #[test]
    fn test_blocked_matches_naive_reference() {
        let (m, n, k) = (13, 11, 7);
        let mut rng = StdRng::seed_from_u64(7);
        let a = random_vec(m * k, &mut rng);
        let b = random_vec(k * n, &mut rng);
        let c0 = random_vec(m * n, &mut rng);

        for tile in [TileShape::new(4, 8), TileShape::DEFAULT, TileShape::new(3, 3)] {
            for ta in Trans::REAL {
                for tb in Trans::REAL {
                    let (ar, ac) = ta.op_shape(m, k);
                    let (br, bc) = tb.op_shape(k, n);
                    let av = MatrixView::from_row_major(&a, ar, ac).unwrap();
                    let bv = MatrixView::from_row_major(&b, br, bc).unwrap();
                    let mut c = c0.clone();
                    let mut cv = MatrixViewMut::from_row_major(&mut c, m, n).unwrap();
                    serial_gemm(ta, tb, Algo::Blocked(tile), 0.75, av, bv, -1.25, &mut cv)
                        .unwrap();

                    let expected = naive_gemm(ta, tb, (m, n, k), 0.75, &a, &b, -1.25, &c0);
                    for (idx, (x, y)) in c.iter().zip(&expected).enumerate() {
                        assert!(
                            (x - y).abs() < 1e-12,
                            "Mismatch at index {idx} tile {tile} {ta}{tb}: {x} != {y}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_two_by_two_transpose() {
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]]; A^T * B = [[26, 30], [38, 44]].
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        for algo in [Algo::Unblocked, Algo::Blocked(TileShape::new(2, 2))] {
            let mut c = [0.0; 4];
            let av = MatrixView::from_row_major(&a, 2, 2).unwrap();
            let bv = MatrixView::from_row_major(&b, 2, 2).unwrap();
            let mut cv = MatrixViewMut::from_row_major(&mut c, 2, 2).unwrap();
            serial_gemm(Trans::Transpose, Trans::NoTranspose, algo, 1.0, av, bv, 0.0, &mut cv)
                .unwrap();
            assert_eq!(c, [26.0, 30.0, 38.0, 44.0], "{algo}");
        }
    }

    #[test]
    fn test_beta_zero_ignores_nan() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [1.0, 0.0, 0.0, 1.0];
        for algo in [Algo::Unblocked, Algo::blocked()] {
            let mut c = [f64::NAN; 4];
            let av = MatrixView::from_row_major(&a, 2, 2).unwrap();
            let bv = MatrixView::from_row_major(&b, 2, 2).unwrap();
            let mut cv = MatrixViewMut::from_row_major(&mut c, 2, 2).unwrap();
            serial_gemm(Trans::NoTranspose, Trans::NoTranspose, algo, 2.0, av, bv, 0.0, &mut cv)
                .unwrap();
            assert_eq!(c, [2.0, 4.0, 6.0, 8.0]);
        }
    }

    #[test]
    fn test_zero_k_only_scales() {
        let a: [f64; 0] = [];
        let b: [f64; 0] = [];
        let mut c = [1.0, 2.0, 3.0];
        let av = MatrixView::from_row_major(&a, 3, 0).unwrap();
        let bv = MatrixView::from_row_major(&b, 0, 1).unwrap();
        let mut cv = MatrixViewMut::from_row_major(&mut c, 3, 1).unwrap();
        let (ta, tb) = (Trans::NoTranspose, Trans::NoTranspose);
        serial_gemm(ta, tb, Algo::blocked(), 1.0, av, bv, 2.0, &mut cv).unwrap();
        assert_eq!(c, [2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_shape_mismatch_leaves_c_untouched() {
        let a = [1.0; 6];
        let b = [1.0; 6];
        let mut c = [9.0; 4];
        let av = MatrixView::from_row_major(&a, 2, 3).unwrap();
        let bv = MatrixView::from_row_major(&b, 2, 3).unwrap();
        let mut cv = MatrixViewMut::from_row_major(&mut c, 2, 2).unwrap();
        let (ta, tb) = (Trans::NoTranspose, Trans::NoTranspose);
        let err = serial_gemm(ta, tb, Algo::Unblocked, 1.0, av, bv, 0.0, &mut cv).unwrap_err();
        assert!(matches!(err, GemmError::ShapeMismatch { operand: "op(B)", .. }));
        assert_eq!(c, [9.0; 4]);
    }

    #[test]
    fn test_unsupported_tile_reported() {
        let a = [1.0; 4];
        let mut c = [9.0; 4];
        let av = MatrixView::from_row_major(&a, 2, 2).unwrap();
        let mut cv = MatrixViewMut::from_row_major(&mut c, 2, 2).unwrap();
        let err = serial_gemm(
            Trans::NoTranspose,
            Trans::NoTranspose,
            Algo::Blocked(TileShape::new(7, 7)),
            1.0,
            av,
            av,
            0.0,
            &mut cv,
        )
        .unwrap_err();
        assert!(err.to_string().contains("tile 7x7"));
        assert_eq!(c, [9.0; 4]);
    }

    #[test]
    fn test_conj_transpose_real_rejected() {
        let a = [1.0; 4];
        let mut c = [0.0; 4];
        let av = MatrixView::from_row_major(&a, 2, 2).unwrap();
        let mut cv = MatrixViewMut::from_row_major(&mut c, 2, 2).unwrap();
        let (ta, tb) = (Trans::ConjTranspose, Trans::NoTranspose);
        let err = serial_gemm(ta, tb, Algo::Unblocked, 1.0, av, av, 0.0, &mut cv).unwrap_err();
        assert!(matches!(err, GemmError::Unsupported { .. }));
    }

    #[test]
    fn test_complex_with_real_coefficients() {
        let a = [Complex64::new(0.0, 1.0)];
        let b = [Complex64::new(0.0, 1.0)];
        let mut c = [Complex64::new(1.0, 1.0)];
        let av = MatrixView::from_row_major(&a, 1, 1).unwrap();
        let bv = MatrixView::from_row_major(&b, 1, 1).unwrap();
        let mut cv = MatrixViewMut::from_row_major(&mut c, 1, 1).unwrap();
        // 2 * (i * i) + 3 * (1 + i) = 1 + 3i
        let (ta, tb) = (Trans::NoTranspose, Trans::NoTranspose);
        serial_gemm(ta, tb, Algo::blocked(), 2.0, av, bv, 3.0, &mut cv).unwrap();
        assert_eq!(c[0], Complex64::new(1.0, 3.0));
    }

    #[test]
    fn test_algo_display_and_check() {
        assert_eq!(Algo::Unblocked.to_string(), "unblocked");
        assert_eq!(Algo::blocked().to_string(), "blocked(5x5)");
        assert!(Algo::Blocked(TileShape::new(8, 4)).check().is_ok());
        assert!(Algo::Blocked(TileShape::new(0, 4)).check().is_err());
    }
}
