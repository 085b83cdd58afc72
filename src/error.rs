//! Error types for batched GEMM.
//!
//! Every precondition is checked before C is written, so an `Err` always
//! means the output buffer was left untouched.

use thiserror::Error;

/// Errors that can occur while setting up or dispatching a GEMM call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GemmError {
    /// Operand extents are incompatible after applying the transpose tags.
    #[error("Shape mismatch in {operand}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// The operand whose shape was rejected.
        operand: &'static str,
        /// Shape implied by the other operands.
        expected: String,
        /// Shape actually supplied.
        found: String,
    },
    /// A, B and C do not hold the same number of batch entries.
    #[error("Batch size mismatch: A has {a} entries, B has {b}, C has {c}")]
    BatchMismatch { a: usize, b: usize, c: usize },
    /// The requested combination has no kernel (conjugation of a real type,
    /// tile shape outside the dispatch table).
    #[error("Unsupported configuration: {message}")]
    Unsupported { message: String },
    /// The remainder kernel was handed a shape larger than its tile.
    #[error("Remainder tile {m}x{n} exceeds kernel tile {mb}x{nb}")]
    TileOverflow {
        m: usize,
        n: usize,
        mb: usize,
        nb: usize,
    },
    /// View extents and strides leave the borrowed buffer, or a mutable view
    /// maps two indices onto the same element.
    #[error("Invalid view: {message}")]
    InvalidView { message: String },
}

/// Result type alias for GEMM operations.
pub type Result<T> = std::result::Result<T, GemmError>;

/// Creates a shape mismatch error.
pub fn shape_error(
    operand: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> GemmError {
    GemmError::ShapeMismatch {
        operand,
        expected: format!("{}x{}", expected.0, expected.1),
        found: format!("{}x{}", found.0, found.1),
    }
}

/// Creates an unsupported configuration error.
pub fn unsupported(message: impl Into<String>) -> GemmError {
    GemmError::Unsupported {
        message: message.into(),
    }
}

/// Creates an invalid view error.
pub fn view_error(message: impl Into<String>) -> GemmError {
    GemmError::InvalidView {
        message: message.into(),
    }
}
