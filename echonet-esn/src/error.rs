use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EsnError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The masked reservoir matrix has no usable spectrum, so it cannot be
    /// rescaled to the target radius.
    #[error(
        "degenerate reservoir: sparsity={sparsity} left a matrix with spectral radius ~0, \
         cannot rescale to {spectral_radius}"
    )]
    DegenerateReservoir { sparsity: f64, spectral_radius: f64 },

    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    Shape {
        what: &'static str,
        expected: String,
        found: String,
    },

    #[error("target sequence has zero variance, NRMSE is undefined")]
    ZeroVariance,

    /// The linear-algebra backend refused the problem (not rank deficiency,
    /// which falls back to a least-norm solve).
    #[error("solver failure: {0}")]
    Solver(String),

    #[error("sequence too short: need at least {needed} samples, got {got}")]
    EmptySequence { needed: usize, got: usize },
}

impl EsnError {
    pub(crate) fn shape(what: &'static str, expected: impl ToString, found: impl ToString) -> Self {
        EsnError::Shape {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EsnError>;
