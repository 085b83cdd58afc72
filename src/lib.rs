//! Batched dense matrix multiply over strided views.
//!
//! Every batch entry computes `C := alpha * op(A) * op(B) + beta * C`. Two
//! interchangeable algorithms are provided: a reference triple loop
//! ([`Algo::Unblocked`]) and a tiled decomposition built on the fixed-size
//! [`InnerGemm`] kernel ([`Algo::Blocked`]).
//!
//! ```
//! use tilegemm::{gemm, BatchView, BatchViewMut, Layout, Trans};
//!
//! let (n, blk) = (2, 3);
//! let a = vec![1.0f64; n * blk * blk];
//! let b = vec![2.0f64; n * blk * blk];
//! let mut c = vec![0.0f64; n * blk * blk];
//!
//! let av = BatchView::new(&a, Layout::Right, n, blk, blk).unwrap();
//! let bv = BatchView::new(&b, Layout::Right, n, blk, blk).unwrap();
//! let mut cv = BatchViewMut::new(&mut c, Layout::Right, n, blk, blk).unwrap();
//!
//! gemm(Trans::NoTranspose, Trans::NoTranspose, 1.0, &av, &bv, 0.0, &mut cv).unwrap();
//! assert!(c.iter().all(|&x| x == 6.0));
//! ```

pub mod algo;
pub mod batch;
pub mod config;
pub mod error;
pub mod kernel;
pub mod scalar;
pub mod trans;
pub mod verify;
pub mod view;

pub use algo::{serial_gemm, Algo, TileShape};
pub use batch::{gemm, gemm_with};
pub use config::{Exec, GemmConfig};
pub use error::{GemmError, Result};
pub use kernel::InnerGemm;
pub use scalar::Scalar;
pub use trans::Trans;
pub use view::{BatchView, BatchViewMut, Layout, MatrixView, MatrixViewMut};

/// Default tile rows of the blocked algorithm.
pub const DEFAULT_MB: usize = 5;
/// Default tile columns of the blocked algorithm.
pub const DEFAULT_NB: usize = 5;

/// Batch size from which [`Exec::Auto`] hands entries to rayon.
pub const PARALLEL_BATCH_THRESHOLD: usize = 64;
