//! Error types for profile editing and path generation.

use crate::geometry::CurveId;
use thiserror::Error;

/// Input-validation failures. Every variant is raised before any state is
/// mutated, so the caller can surface the message and carry on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HotwireError {
    /// The XY and UV profiles must contain the same number of curves.
    #[error("curve count mismatch: XY has {xy} curves, UV has {uv}")]
    CurveCountMismatch { xy: usize, uv: usize },

    /// Auto-ordering needs exactly one seed curve.
    #[error("select exactly one seed curve (got {count})")]
    SeedSelection { count: usize },

    /// An operation needs a minimum number of selected curves.
    #[error("select at least {needed} curves (got {count})")]
    SelectionTooSmall { needed: usize, count: usize },

    #[error("unknown curve {0}")]
    UnknownCurve(CurveId),

    /// Splitting is only possible at an interior point.
    #[error("cannot split curve {id} at point {index} of {len}")]
    InvalidSplit { id: CurveId, index: usize, len: usize },

    /// A work plane sits outside the drive-plane span.
    #[error("invalid machine geometry: {0}")]
    MachineGeometry(String),

    /// A named setting (feed mode, speed reference) is not one of the known labels.
    #[error("unknown {kind}: {value}")]
    InvalidSetting { kind: &'static str, value: String },

    #[error("invalid offset table: {0}")]
    OffsetTable(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file extension: {0}")]
    WrongExtension(String),

    /// Something escaped an operation unexpectedly; details go to the error log.
    #[error("operation '{0}' failed, see the error log")]
    OperationFailed(String),
}

/// Result type for profile and path operations.
pub type Result<T> = std::result::Result<T, HotwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_counts() {
        let err = HotwireError::CurveCountMismatch { xy: 3, uv: 2 };
        assert_eq!(err.to_string(), "curve count mismatch: XY has 3 curves, UV has 2");

        let err = HotwireError::SeedSelection { count: 0 };
        assert!(err.to_string().contains("got 0"));
    }
}
