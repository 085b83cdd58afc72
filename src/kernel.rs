//! Fixed-size inner tile kernel.
//!
//! [`InnerGemm`] performs the panel × panel → tile update that the blocked
//! algorithm is built from:
//!
//! ```text
//! C[0:MB, 0:NB] += alpha * A[0:MB, 0:k] * B[0:k, 0:NB]
//! ```
//!
//! The tile extents are const generics, so the accumulator is a
//! `[[T; NB]; MB]` array the compiler can keep in registers and fully
//! unroll. `k` is the full reduction length. Edge tiles of a problem that
//! is not a multiple of the tile go through [`InnerGemm::invoke_remainder`].
//!
//! Accumulation order is fixed: for each `(i, j)` the products are summed
//! with `l` ascending, then scaled by `alpha` and added to C once.

use crate::error::{GemmError, Result};
use crate::scalar::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerGemm<const MB: usize, const NB: usize> {
    as0: isize,
    as1: isize,
    bs0: isize,
    bs1: isize,
    cs0: isize,
    cs1: isize,
    conj_a: bool,
    conj_b: bool,
}

#[inline(always)]
unsafe fn load<T: Scalar>(p: *const T, offset: isize, conj: bool) -> T {
    let v = *p.offset(offset);
    if conj {
        v.conj()
    } else {
        v
    }
}

impl<const MB: usize, const NB: usize> InnerGemm<MB, NB> {
    /// Kernel for operands with the given `(row, col)` strides.
    pub fn new(as0: isize, as1: isize, bs0: isize, bs1: isize, cs0: isize, cs1: isize) -> Self {
        Self {
            as0,
            as1,
            bs0,
            bs1,
            cs0,
            cs1,
            conj_a: false,
            conj_b: false,
        }
    }

    /// Conjugate every element read from A and/or B.
    pub fn with_conj(self, conj_a: bool, conj_b: bool) -> Self {
        Self {
            conj_a,
            conj_b,
            ..self
        }
    }

    pub const fn tile(&self) -> (usize, usize) {
        (MB, NB)
    }

    /// Full `MB × NB` tile update over a reduction of length `k`.
    ///
    /// # Safety
    ///
    /// With the construction-time strides, `a` must address `MB × k`
    /// readable elements, `b` must address `k × NB` readable elements and
    /// `c` must address `MB × NB` distinct writable elements that alias
    /// neither `a` nor `b`.
    pub unsafe fn invoke<T: Scalar>(
        &self,
        alpha: T,
        a: *const T,
        b: *const T,
        k: usize,
        c: *mut T,
    ) {
        if k == 0 {
            return;
        }

        let mut acc = [[T::zero(); NB]; MB];
        let mut a_col = [T::zero(); MB];

        for l in 0..k {
            let l = l as isize;
            for (i, a_i) in a_col.iter_mut().enumerate() {
                *a_i = load(a, i as isize * self.as0 + l * self.as1, self.conj_a);
            }
            for j in 0..NB {
                let b_lj = load(b, l * self.bs0 + j as isize * self.bs1, self.conj_b);
                for i in 0..MB {
                    acc[i][j] += a_col[i] * b_lj;
                }
            }
        }

        for (i, row) in acc.iter().enumerate() {
            for (j, &sum) in row.iter().enumerate() {
                let p = c.offset(i as isize * self.cs0 + j as isize * self.cs1);
                *p = *p + alpha * sum;
            }
        }
    }

    /// Edge tile update for `m ≤ MB`, `n ≤ NB`.
    ///
    /// Zero `m`, `n` or `k` leaves C untouched.
    ///
    /// # Safety
    ///
    /// As for [`InnerGemm::invoke`] with `m × k`, `k × n` and `m × n`
    /// extents.
    pub unsafe fn invoke_remainder<T: Scalar>(
        &self,
        alpha: T,
        a: *const T,
        b: *const T,
        m: usize,
        n: usize,
        k: usize,
        c: *mut T,
    ) -> Result<()> {
        if m > MB || n > NB {
            return Err(GemmError::TileOverflow {
                m,
                n,
                mb: MB,
                nb: NB,
            });
        }
        self.remainder_unchecked(alpha, a, b, m, n, k, c);
        Ok(())
    }

    /// # Safety
    ///
    /// As for [`InnerGemm::invoke_remainder`], and `m ≤ MB`, `n ≤ NB`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) unsafe fn remainder_unchecked<T: Scalar>(
        &self,
        alpha: T,
        a: *const T,
        b: *const T,
        m: usize,
        n: usize,
        k: usize,
        c: *mut T,
    ) {
        if m == 0 || n == 0 || k == 0 {
            return;
        }

        let mut acc = [[T::zero(); NB]; MB];
        let mut a_col = [T::zero(); MB];

        for l in 0..k {
            let l = l as isize;
            for (i, a_i) in a_col.iter_mut().enumerate().take(m) {
                *a_i = load(a, i as isize * self.as0 + l * self.as1, self.conj_a);
            }
            for j in 0..n {
                let b_lj = load(b, l * self.bs0 + j as isize * self.bs1, self.conj_b);
                for i in 0..m {
                    acc[i][j] += a_col[i] * b_lj;
                }
            }
        }

        for (i, row) in acc.iter().enumerate().take(m) {
            for (j, &sum) in row.iter().enumerate().take(n) {
                let p = c.offset(i as isize * self.cs0 + j as isize * self.cs1);
                *p = *p + alpha * sum;
            }
        }
    }
}
