//! Batch driver.
//!
//! Applies the single-entry algorithm to every `(A[k], B[k], C[k])` triple.
//! Entries share no state: each reads only its own A and B and writes only
//! its own C, so they may run in any order and on any thread. Parallel
//! execution uses rayon's global pool.

use rayon::prelude::*;
use tracing::debug;

use crate::algo::{apply, check_shapes};
use crate::config::GemmConfig;
use crate::error::{GemmError, Result};
use crate::scalar::Scalar;
use crate::trans::Trans;
use crate::view::{BatchView, BatchViewMut};

/// Batched `C[k] := alpha * op(A[k]) * op(B[k]) + beta * C[k]` with the
/// default [`GemmConfig`].
pub fn gemm<T: Scalar, S: Into<T>>(
    trans_a: Trans,
    trans_b: Trans,
    alpha: S,
    a: &BatchView<'_, T>,
    b: &BatchView<'_, T>,
    beta: S,
    c: &mut BatchViewMut<'_, T>,
) -> Result<()> {
    gemm_with(&GemmConfig::default(), trans_a, trans_b, alpha, a, b, beta, c)
}

/// Batched GEMM with an explicit configuration.
///
/// All validation (batch counts, transpose support, shapes, tile support)
/// happens before the first entry is touched, so an error leaves every
/// `C[k]` unchanged. An empty batch is valid and does nothing.
#[allow(clippy::too_many_arguments)]
pub fn gemm_with<T: Scalar, S: Into<T>>(
    config: &GemmConfig,
    trans_a: Trans,
    trans_b: Trans,
    alpha: S,
    a: &BatchView<'_, T>,
    b: &BatchView<'_, T>,
    beta: S,
    c: &mut BatchViewMut<'_, T>,
) -> Result<()> {
    if a.len() != c.len() || b.len() != c.len() {
        return Err(GemmError::BatchMismatch {
            a: a.len(),
            b: b.len(),
            c: c.len(),
        });
    }
    let (m, n, k) = check_shapes::<T>(
        trans_a,
        trans_b,
        (a.rows(), a.cols()),
        (b.rows(), b.cols()),
        (c.rows(), c.cols()),
    )?;
    let routine = config.algo.routine::<T>()?;

    let len = c.len();
    let parallel = config.runs_parallel(len);
    debug!(
        batch = len,
        m,
        n,
        k,
        %trans_a,
        %trans_b,
        algo = %config.algo,
        parallel,
        "batched gemm"
    );
    if len == 0 {
        return Ok(());
    }

    let (alpha, beta): (T, T) = (alpha.into(), beta.into());
    let c = &*c;
    let run = |idx: usize| {
        // SAFETY: idx < len for every operand (checked above), and each
        // index is visited exactly once, so every C entry has one writer.
        unsafe {
            let a_k = trans_a.op(a.entry_unchecked(idx));
            let b_k = trans_b.op(b.entry_unchecked(idx));
            let mut c_k = c.entry_shared(idx);
            apply(routine, alpha, a_k, b_k, beta, &mut c_k);
        }
    };

    if parallel {
        (0..len).into_par_iter().for_each(run);
    } else {
        (0..len).for_each(run);
    }
    Ok(())
}
