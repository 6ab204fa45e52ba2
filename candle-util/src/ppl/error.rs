//! Error and warning types for model and guide evaluation.

use thiserror::Error;

/// Errors that abort a model or guide evaluation.
#[derive(Debug, Error)]
pub enum PplError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("parameter store conflict for '{name}': stored {stored:?}, requested {requested:?}")]
    ParameterStoreConflict {
        name: String,
        stored: Vec<usize>,
        requested: Vec<usize>,
    },

    #[error("tensor backend: {0}")]
    Candle(#[from] candle_core::Error),
}

pub type PplResult<T> = std::result::Result<T, PplError>;

impl PplError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Non-fatal configuration problems; evaluation proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Noise prior hyperparameters were given together with a known noise
    /// standard deviation, so the prior is ignored.
    UnusedNoisePrior,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnusedNoisePrior => write!(
                f,
                "values of `alpha_0` and `beta_0` unused because `obs_sd` was specified already"
            ),
        }
    }
}
