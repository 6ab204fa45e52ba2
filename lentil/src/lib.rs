//! Bayesian linear models with fixed and random effects, their matched
//! normal / inverse-Gamma variational guides, and ready-made presets.

pub mod config;
pub mod elbo;
pub mod guide;
pub mod model;
pub mod presets;

pub use config::{
    CoefficientGroup, FixedEffect, GammaPrior, GuideConfig, ModelConfig, RandomEffect, Response,
};
pub use elbo::{elbo, elbo_loss, elbo_traces, ElboTraces};
pub use guide::normal_inv_gamma_family_guide;
pub use model::bayesian_linear_model;
