//! Operand traversal tags.
//!
//! A tag never moves data: it swaps the row/column roles of a
//! [`MatrixView`] and, for [`Trans::ConjTranspose`], marks the view so that
//! every read is conjugated.

use std::fmt;

use crate::error::{unsupported, Result};
use crate::scalar::Scalar;
use crate::view::MatrixView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trans {
    #[default]
    NoTranspose,
    Transpose,
    ConjTranspose,
}

impl Trans {
    /// Combinations every scalar type supports.
    pub const REAL: [Trans; 2] = [Trans::NoTranspose, Trans::Transpose];

    #[inline(always)]
    pub fn is_transposed(self) -> bool {
        !matches!(self, Trans::NoTranspose)
    }

    #[inline(always)]
    pub fn is_conj(self) -> bool {
        matches!(self, Trans::ConjTranspose)
    }

    /// Rejects tags that have no meaning for `T`.
    pub fn check<T: Scalar>(self) -> Result<()> {
        if self.is_conj() && !T::IS_COMPLEX {
            return Err(unsupported(format!(
                "conjugate transpose requested for real scalar type {}",
                std::any::type_name::<T>()
            )));
        }
        Ok(())
    }

    /// Logical shape of `op(X)` for a stored `rows × cols` operand.
    #[inline(always)]
    pub fn op_shape(self, rows: usize, cols: usize) -> (usize, usize) {
        if self.is_transposed() {
            (cols, rows)
        } else {
            (rows, cols)
        }
    }

    /// `op(view)`.
    pub fn op<'a, T: Scalar>(self, view: MatrixView<'a, T>) -> MatrixView<'a, T> {
        match self {
            Trans::NoTranspose => view,
            Trans::Transpose => view.transposed(),
            Trans::ConjTranspose => view.transposed().conjugated(),
        }
    }

    /// BLAS character code.
    pub fn code(self) -> char {
        match self {
            Trans::NoTranspose => 'N',
            Trans::Transpose => 'T',
            Trans::ConjTranspose => 'C',
        }
    }
}

impl fmt::Display for Trans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::complex::Complex64;

    #[test]
    fn test_check_conj_requires_complex() {
        assert!(Trans::ConjTranspose.check::<f64>().is_err());
        assert!(Trans::ConjTranspose.check::<f32>().is_err());
        assert!(Trans::ConjTranspose.check::<Complex64>().is_ok());
        for t in Trans::REAL {
            assert!(t.check::<f64>().is_ok());
        }
    }

    #[test]
    fn test_op_shape() {
        assert_eq!(Trans::NoTranspose.op_shape(2, 5), (2, 5));
        assert_eq!(Trans::Transpose.op_shape(2, 5), (5, 2));
        assert_eq!(Trans::ConjTranspose.op_shape(2, 5), (5, 2));
    }

    #[test]
    fn test_op_applies_conjugate_transpose() {
        let data = vec![
            Complex64::new(1.0, 1.0),
            Complex64::new(2.0, -2.0),
            Complex64::new(3.0, 0.5),
        ];
        let v = MatrixView::from_row_major(&data, 1, 3).unwrap();
        let h = Trans::ConjTranspose.op(v);
        assert_eq!(h.shape(), (3, 1));
        assert_eq!(h.get(1, 0), Some(Complex64::new(2.0, 2.0)));

        let t = Trans::Transpose.op(v);
        assert_eq!(t.get(1, 0), Some(Complex64::new(2.0, -2.0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Trans::NoTranspose.to_string(), "N");
        assert_eq!(Trans::Transpose.to_string(), "T");
        assert_eq!(Trans::ConjTranspose.to_string(), "C");
        assert_eq!(Trans::default(), Trans::NoTranspose);
    }
}
