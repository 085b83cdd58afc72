//! Runtime configuration of the batch driver.

use crate::algo::{Algo, TileShape};
use crate::PARALLEL_BATCH_THRESHOLD;

/// How batch entries are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Exec {
    /// One entry after another on the calling thread.
    Serial,
    /// Entries spread over rayon's global pool.
    Parallel,
    /// Parallel once the batch reaches [`GemmConfig::par_threshold`].
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmConfig {
    pub algo: Algo,
    pub exec: Exec,
    pub par_threshold: usize,
}

impl Default for GemmConfig {
    fn default() -> Self {
        Self {
            algo: Algo::blocked(),
            exec: Exec::Auto,
            par_threshold: PARALLEL_BATCH_THRESHOLD,
        }
    }
}

impl GemmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algo(mut self, algo: Algo) -> Self {
        self.algo = algo;
        self
    }

    /// Blocked algorithm with `tile`.
    pub fn with_tile(self, tile: TileShape) -> Self {
        self.with_algo(Algo::Blocked(tile))
    }

    pub fn unblocked(self) -> Self {
        self.with_algo(Algo::Unblocked)
    }

    pub fn with_exec(mut self, exec: Exec) -> Self {
        self.exec = exec;
        self
    }

    pub fn with_par_threshold(mut self, par_threshold: usize) -> Self {
        self.par_threshold = par_threshold;
        self
    }

    /// Whether a batch of `len` entries is handed to rayon.
    pub fn runs_parallel(&self, len: usize) -> bool {
        match self.exec {
            Exec::Serial => false,
            Exec::Parallel => len > 1,
            Exec::Auto => len >= self.par_threshold.max(2),
        }
    }
}
