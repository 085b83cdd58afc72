//! Element types accepted by the kernels.
//!
//! Real (`f32`, `f64`) and complex (`Complex<f32>`, `Complex<f64>`) values
//! share one trait so that a single generic kernel serves all four. The
//! trait carries what the kernels and the verification harness need beyond
//! plain arithmetic: conjugation, a magnitude in the underlying real type,
//! and that type's machine epsilon.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Sub};

use num::complex::Complex;
use num::{Float, One, Zero};
use rand::Rng;

pub trait Scalar:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + AddAssign
    + 'static
{
    /// Real type underlying the scalar (itself for real scalars).
    type Real: Float + Debug + Send + Sync + AddAssign + Into<f64>;

    /// `true` for complex scalars; gates conjugate-transpose support.
    const IS_COMPLEX: bool;

    /// Complex conjugate. Identity for real scalars.
    fn conj(self) -> Self;

    /// Absolute value (modulus for complex scalars).
    fn magnitude(self) -> Self::Real;

    /// Machine epsilon of [`Scalar::Real`].
    fn epsilon() -> Self::Real;

    /// Draws a value with every real component uniform in `[0, range)`.
    fn sample<R: Rng + ?Sized>(rng: &mut R, range: f64) -> Self;
}

macro_rules! impl_real_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            type Real = $t;
            const IS_COMPLEX: bool = false;

            #[inline(always)]
            fn conj(self) -> Self {
                self
            }

            #[inline(always)]
            fn magnitude(self) -> Self::Real {
                self.abs()
            }

            #[inline(always)]
            fn epsilon() -> Self::Real {
                <$t>::EPSILON
            }

            fn sample<R: Rng + ?Sized>(rng: &mut R, range: f64) -> Self {
                rng.random_range(0.0..range as $t)
            }
        }
    )*};
}

macro_rules! impl_complex_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for Complex<$t> {
            type Real = $t;
            const IS_COMPLEX: bool = true;

            #[inline(always)]
            fn conj(self) -> Self {
                Complex::new(self.re, -self.im)
            }

            #[inline(always)]
            fn magnitude(self) -> Self::Real {
                self.norm()
            }

            #[inline(always)]
            fn epsilon() -> Self::Real {
                <$t>::EPSILON
            }

            fn sample<R: Rng + ?Sized>(rng: &mut R, range: f64) -> Self {
                let re = rng.random_range(0.0..range as $t);
                let im = rng.random_range(0.0..range as $t);
                Complex::new(re, im)
            }
        }
    )*};
}

impl_real_scalar!(f32, f64);
impl_complex_scalar!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_scalar<T: Scalar>() {}

    #[test]
    fn test_standard_types() {
        assert_scalar::<f32>();
        assert_scalar::<f64>();
        assert_scalar::<Complex<f32>>();
        assert_scalar::<Complex<f64>>();
    }

    #[test]
    fn test_conj_is_identity_for_reals() {
        assert_eq!(Scalar::conj(-2.5f64), -2.5);
        assert_eq!(Scalar::conj(7.0f32), 7.0);
        assert!(!f64::IS_COMPLEX);
    }

    #[test]
    fn test_conj_negates_imaginary_part() {
        let z = Complex::new(1.0f64, 2.0);
        assert_eq!(Scalar::conj(z), Complex::new(1.0, -2.0));
        assert!(<Complex<f64> as Scalar>::IS_COMPLEX);
    }

    #[test]
    fn test_magnitude() {
        assert_eq!((-3.0f64).magnitude(), 3.0);
        assert_relative_eq!(Complex::new(3.0f64, -4.0).magnitude(), 5.0);
    }

    #[test]
    fn test_epsilon_follows_real_type() {
        assert_eq!(<Complex<f32> as Scalar>::epsilon(), f32::EPSILON);
        assert_eq!(<f64 as Scalar>::epsilon(), f64::EPSILON);
    }

    #[test]
    fn test_sample_range() {
        let mut rng = StdRng::seed_from_u64(13718);
        for _ in 0..1000 {
            let x = f64::sample(&mut rng, 1.0);
            assert!((0.0..1.0).contains(&x));
            let z = Complex::<f32>::sample(&mut rng, 2.0);
            assert!((0.0..2.0).contains(&z.re));
            assert!((0.0..2.0).contains(&z.im));
        }
    }
}
