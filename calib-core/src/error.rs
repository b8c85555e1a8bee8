use thiserror::Error;

/// Errors reported by the calibration routines.
///
/// Input cardinality problems are reported before any computation starts. Numerical
/// problems are reported by the top-level entry points; robust estimators treat them as a
/// failed sample instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibError {
    #[error("{operation} requires at least {required} inputs, got {actual}")]
    NotEnoughData {
        operation: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("{operation} got inputs of different lengths ({left} and {right})")]
    LengthMismatch {
        operation: &'static str,
        left: usize,
        right: usize,
    },
    #[error("singular value decomposition did not converge during {0}")]
    SvdFailed(&'static str),
    #[error("linear system for {0} is rank deficient")]
    RankDeficient(&'static str),
    #[error("degenerate configuration: {0}")]
    Degenerate(&'static str),
}

pub type Result<T, E = CalibError> = core::result::Result<T, E>;

impl CalibError {
    /// Fails with [`CalibError::NotEnoughData`] when `actual < required`.
    pub fn require(operation: &'static str, required: usize, actual: usize) -> Result<()> {
        if actual < required {
            Err(Self::NotEnoughData {
                operation,
                required,
                actual,
            })
        } else {
            Ok(())
        }
    }

    /// Fails with [`CalibError::LengthMismatch`] when `left != right`.
    pub fn require_same_len(operation: &'static str, left: usize, right: usize) -> Result<()> {
        if left != right {
            Err(Self::LengthMismatch {
                operation,
                left,
                right,
            })
        } else {
            Ok(())
        }
    }
}
