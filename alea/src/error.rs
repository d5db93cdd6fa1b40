/// Errors raised synchronously by accumulators, results and configuration.
///
/// A failing call never leaves an accumulator half-updated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AleaError {
    #[error("sample has {actual} components, accumulator expects {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("incompatible accumulators: {0}")]
    IncompatibleAccumulator(String),

    #[error("insufficient data: need at least {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AleaError>;

/// Check `actual` against an established dimension, or validate it as the
/// first dimension when none is established yet.
pub(crate) fn check_dimension(established: Option<usize>, actual: usize) -> Result<()> {
    match established {
        Some(expected) if expected != actual => Err(AleaError::Dimension { expected, actual }),
        None if actual == 0 => Err(AleaError::Dimension {
            expected: 1,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Resolve the dimension two merge partners share, if any.
pub(crate) fn merged_dimension(a: Option<usize>, b: Option<usize>) -> Result<Option<usize>> {
    match (a, b) {
        (Some(x), Some(y)) if x != y => Err(AleaError::IncompatibleAccumulator(format!(
            "dimension {x} vs {y}"
        ))),
        (Some(x), _) | (None, Some(x)) => Ok(Some(x)),
        (None, None) => Ok(None),
    }
}

pub(crate) fn require(required: usize, actual: usize) -> Result<()> {
    if actual < required {
        return Err(AleaError::InsufficientData { required, actual });
    }
    Ok(())
}
