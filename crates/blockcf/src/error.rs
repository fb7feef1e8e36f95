// The error type follows the same layout as the rest of the workspace: the
// public crate defines an opaque `Error` that wraps a private `ErrorKind`,
// and the no_std crate keeps returning `&'static str` (those get wrapped by
// `Error::internal`).
//
// Statistical degeneracies (too few points to form a pair, empty resamples)
// are NOT errors. They flow through the calculations as `NaN`.

use thiserror::Error as ThisError;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug, ThisError)]
enum ErrorKind {
    /// An error that occurs when a problematic bin edge is specified
    #[error(transparent)]
    BinEdge(BinEdgeError),
    /// An error that occurs when a resampling scheme is handed an empty
    /// catalog
    #[error(transparent)]
    EmptyInput(EmptyInputError),
    /// An error that occurs when an unknown estimator name is specified
    #[error(transparent)]
    EstimatorName(NameError),
    /// An error that occurs when an integer lies outside of the acceptable
    /// range of values
    #[error(transparent)]
    IntegerRange(IntegerRangeError),
    /// An error that occurs within `blockcf_nostd_internal`
    #[error("{0}")]
    Internal(&'static str),
    /// An error that occurs when two quantities that must agree in shape
    /// (or in binning metadata) don't
    #[error(transparent)]
    Mismatch(MismatchError),
    /// An error that occurs when a point set doesn't have 3 columns
    #[error(transparent)]
    PointShape(PointShapeError),
    /// An error that occurs when an unknown statistic name is specified
    #[error(transparent)]
    StatisticName(NameError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that a problematic bin edge was specified
    pub(crate) fn bin_edge(who: impl Into<String>, what: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::BinEdge(BinEdgeError {
                who: who.into(),
                what: what.into(),
            }),
        }
    }

    /// produce an error indicating that a catalog was unexpectedly empty
    pub(crate) fn empty_input(who: &'static str) -> Self {
        Error {
            kind: ErrorKind::EmptyInput(EmptyInputError { who }),
        }
    }

    /// produce an error indicating that an unknown estimator name was
    /// specified
    pub(crate) fn estimator_name(actual: String, choices: Vec<String>) -> Self {
        Error {
            kind: ErrorKind::EstimatorName(NameError {
                what: "estimator",
                actual,
                choices,
            }),
        }
    }

    /// produce an error indicating that an integer lies outside the acceptable
    /// range of values
    pub(crate) fn integer_range(
        description: &'static str,
        actual: i64,
        min_val: i64,
        max_val: i64,
    ) -> Self {
        Error {
            kind: ErrorKind::IntegerRange(IntegerRangeError {
                description,
                actual,
                min_val,
                max_val,
            }),
        }
    }

    /// wraps an error string from `blockcf_nostd_internal`
    pub(crate) fn internal(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::Internal(message),
        }
    }

    /// produce an error indicating that two quantities disagree
    pub(crate) fn mismatch(what: impl Into<String>, expected: String, actual: String) -> Self {
        Error {
            kind: ErrorKind::Mismatch(MismatchError {
                what: what.into(),
                expected,
                actual,
            }),
        }
    }

    /// produce an error indicating that a point set has the wrong number of
    /// columns
    pub(crate) fn point_shape(who: &'static str, shape: &[usize]) -> Self {
        Error {
            kind: ErrorKind::PointShape(PointShapeError {
                who,
                shape: shape.to_vec(),
            }),
        }
    }

    /// produce an error indicating that an unknown statistic name was
    /// specified
    pub(crate) fn statistic_name(actual: String, choices: Vec<String>) -> Self {
        Error {
            kind: ErrorKind::StatisticName(NameError {
                what: "statistic",
                actual,
                choices,
            }),
        }
    }

    /// Returns true when the error stems from an empty catalog
    pub fn is_empty_input(&self) -> bool {
        matches!(self.kind, ErrorKind::EmptyInput(_))
    }

    /// Returns true when the error stems from an unrecognized estimator or
    /// statistic name
    pub fn is_unknown_name(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::EstimatorName(_) | ErrorKind::StatisticName(_)
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// An error that occurs when a problematic bin edge is specified
#[derive(Clone, Debug, ThisError)]
#[error("problem with {who}: {what}")]
struct BinEdgeError {
    who: String,
    what: String,
}

#[derive(Clone, Debug, ThisError)]
#[error("{who} must hold at least one point")]
struct EmptyInputError {
    who: &'static str,
}

/// An error that occurs when an integer lies outside of the acceptable
/// range of values
#[derive(Clone, Debug, ThisError)]
#[error(
    "{description} has a value of {actual}. The value should be no less than \
     {min_val} and not exceed {max_val}"
)]
struct IntegerRangeError {
    description: &'static str,
    actual: i64,
    min_val: i64,
    max_val: i64,
}

#[derive(Clone, Debug, ThisError)]
#[error("{what} mismatch: expected {expected}, got {actual}")]
struct MismatchError {
    what: String,
    expected: String,
    actual: String,
}

/// An error occurs when an unknown name is specified
#[derive(Clone, Debug, ThisError)]
#[error("{actual:?} is not a known {what} name. Choices include: {choices:?}")]
struct NameError {
    what: &'static str,
    actual: String,
    choices: Vec<String>,
}

#[derive(Clone, Debug, ThisError)]
#[error("{who} must have shape (n_points, 3), not {shape:?}")]
struct PointShapeError {
    who: &'static str,
    shape: Vec<usize>,
}
