//! Blocked vs unblocked agreement checks on randomized batches.
//!
//! A [`Scenario`] fixes batch size, block size, layout, transpose tags and
//! tile; [`compare_algorithms`] fills A, B and C with seeded uniform values
//! in `[0, 1)`, runs both algorithms on copies of C and measures
//!
//! ```text
//! Σ |C_blocked - C_unblocked| / (1 + Σ |C_unblocked|)
//! ```
//!
//! per batch entry and over the whole batch. Both must stay below
//! `1000 · eps` of the scalar's real type.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::algo::TileShape;
use crate::batch::gemm_with;
use crate::config::{Exec, GemmConfig};
use crate::error::Result;
use crate::scalar::Scalar;
use crate::trans::Trans;
use crate::view::{BatchView, BatchViewMut, Layout};

pub const DEFAULT_SEED: u64 = 13718;

/// Multiple of machine epsilon the relative difference must stay under.
pub const TOLERANCE_FACTOR: f64 = 1.0e3;

/// `1000 · eps` for the real type underlying `T`.
pub fn tolerance<T: Scalar>() -> f64 {
    let eps: f64 = T::epsilon().into();
    TOLERANCE_FACTOR * eps
}

/// `len` values with every real component uniform in `[0, 1)`.
pub fn random_values<T: Scalar, R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<T> {
    (0..len).map(|_| T::sample(rng, 1.0)).collect()
}

/// `Σ |candidate - reference| / (1 + Σ |reference|)`.
pub fn relative_diff<T: Scalar>(reference: &[T], candidate: &[T]) -> f64 {
    let mut diff = 0.0f64;
    let mut sum = 1.0f64;
    for (&r, &c) in reference.iter().zip(candidate) {
        let d: f64 = (c - r).magnitude().into();
        let m: f64 = r.magnitude().into();
        diff += d;
        sum += m;
    }
    diff / sum
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub len: usize,
    pub blk: usize,
    pub layout: Layout,
    pub trans_a: Trans,
    pub trans_b: Trans,
    pub tile: TileShape,
    pub exec: Exec,
    pub seed: u64,
}

impl Scenario {
    /// `len` square `blk × blk` problems, row-major, no transposes.
    pub fn new(len: usize, blk: usize) -> Self {
        Self {
            len,
            blk,
            layout: Layout::Right,
            trans_a: Trans::NoTranspose,
            trans_b: Trans::NoTranspose,
            tile: TileShape::DEFAULT,
            exec: Exec::Auto,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_trans(mut self, trans_a: Trans, trans_b: Trans) -> Self {
        self.trans_a = trans_a;
        self.trans_b = trans_b;
        self
    }

    pub fn with_tile(mut self, tile: TileShape) -> Self {
        self.tile = tile;
        self
    }

    pub fn with_exec(mut self, exec: Exec) -> Self {
        self.exec = exec;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N={} blk={} layout={:?} op={}{} tile={}",
            self.len, self.blk, self.layout, self.trans_a, self.trans_b, self.tile
        )
    }
}

/// Outcome of one [`compare_algorithms`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub scenario: Scenario,
    /// Largest per-entry relative difference (0 for an empty batch).
    pub max_entry_diff: f64,
    /// Relative difference over the whole batch.
    pub total_diff: f64,
    pub tolerance: f64,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.max_entry_diff < self.tolerance && self.total_diff < self.tolerance
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: max entry diff {:.3e}, total diff {:.3e}, tolerance {:.3e} [{}]",
            self.scenario,
            self.max_entry_diff,
            self.total_diff,
            self.tolerance,
            if self.passed() { "ok" } else { "FAILED" }
        )
    }
}

/// Runs `scenario` through both algorithms on identical inputs and reports
/// how far the blocked result lies from the unblocked one.
pub fn compare_algorithms<T: Scalar, S: Into<T> + Copy>(
    scenario: &Scenario,
    alpha: S,
    beta: S,
) -> Result<Report> {
    let Scenario { len, blk, layout, .. } = *scenario;
    let size = len * blk * blk;

    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let a: Vec<T> = random_values(&mut rng, size);
    let b: Vec<T> = random_values(&mut rng, size);
    let c: Vec<T> = random_values(&mut rng, size);

    let reference_config = GemmConfig::new().unblocked().with_exec(scenario.exec);
    let blocked_config = GemmConfig::new()
        .with_tile(scenario.tile)
        .with_exec(scenario.exec);

    let av = BatchView::new(&a, layout, len, blk, blk)?;
    let bv = BatchView::new(&b, layout, len, blk, blk)?;

    let mut c_ref = c.clone();
    let (ta, tb) = (scenario.trans_a, scenario.trans_b);
    let mut cv = BatchViewMut::new(&mut c_ref, layout, len, blk, blk)?;
    gemm_with(&reference_config, ta, tb, alpha, &av, &bv, beta, &mut cv)?;

    let mut c_blk = c;
    let mut cv = BatchViewMut::new(&mut c_blk, layout, len, blk, blk)?;
    gemm_with(&blocked_config, ta, tb, alpha, &av, &bv, beta, &mut cv)?;

    let strides = layout.strides(len, blk, blk);
    let entry = |data: &[T], k: usize| -> Vec<T> {
        let mut out = Vec::with_capacity(blk * blk);
        for i in 0..blk {
            for j in 0..blk {
                let p = k as isize * strides[0]
                    + i as isize * strides[1]
                    + j as isize * strides[2];
                out.push(data[p as usize]);
            }
        }
        out
    };
    let max_entry_diff = (0..len)
        .map(|k| relative_diff(&entry(&c_ref, k), &entry(&c_blk, k)))
        .fold(0.0f64, f64::max);

    let report = Report {
        scenario: *scenario,
        max_entry_diff,
        total_diff: relative_diff(&c_ref, &c_blk),
        tolerance: tolerance::<T>(),
    };
    debug!(%report, "algorithm comparison");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num::complex::Complex64;

    #[test]
    fn test_tolerance() {
        assert_relative_eq!(tolerance::<f64>(), 1000.0 * f64::EPSILON);
        assert_relative_eq!(tolerance::<f32>(), 1000.0 * f32::EPSILON as f64);
        assert_relative_eq!(tolerance::<Complex64>(), 1000.0 * f64::EPSILON);
    }

    #[test]
    fn test_relative_diff_seeded_with_one() {
        let reference = vec![1.0f64, 2.0, 3.0];
        let candidate = vec![1.0f64, 2.5, 3.0];
        // 0.5 / (1 + 6)
        assert_relative_eq!(relative_diff(&reference, &candidate), 0.5 / 7.0);
        assert_eq!(relative_diff::<f64>(&[], &[]), 0.0);
    }

    #[test]
    fn test_random_values_are_seeded() {
        let mut r1 = StdRng::seed_from_u64(DEFAULT_SEED);
        let mut r2 = StdRng::seed_from_u64(DEFAULT_SEED);
        let x: Vec<f64> = random_values(&mut r1, 64);
        let y: Vec<f64> = random_values(&mut r2, 64);
        assert_eq!(x, y);
        assert!(x.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_compare_passes() {
        let scenario = Scenario::new(10, 15)
            .with_layout(Layout::Left)
            .with_trans(Trans::Transpose, Trans::Transpose);
        let report = compare_algorithms::<f64, _>(&scenario, 1.5, 3.0).unwrap();
        assert!(report.passed(), "{report}");
        assert!(report.max_entry_diff >= 0.0);
    }

    #[test]
    fn test_empty_batch_report() {
        let report = compare_algorithms::<f32, _>(&Scenario::new(0, 10), 1.5f32, 3.0f32).unwrap();
        assert_eq!(report.max_entry_diff, 0.0);
        assert_eq!(report.total_diff, 0.0);
        assert!(report.passed());
    }

    #[test]
    fn test_report_display() {
        let report = Report {
            scenario: Scenario::new(4, 3),
            max_entry_diff: 1.0,
            total_diff: 0.0,
            tolerance: 0.5,
        };
        let text = report.to_string();
        assert!(text.starts_with("N=4 blk=3 layout=Right op=NN tile=5x5"));
        assert!(text.ends_with("[FAILED]"));
    }
}
