//! Single-sample evidence lower bound
//!
//! ```text
//! ELBO = log p(y, z) - log q(z),   z ~ q
//! ```
//!
//! The guide is evaluated first; the model then replays its latent values
//! with the response conditioned on the observations, so gradients flow
//! back into the guide parameters through the reparameterized draws.

use candle_core::Tensor;
use candle_util::ppl::{ParamStore, PplError, PplResult, Trace};
use log::trace;

use crate::config::{GuideConfig, ModelConfig};
use crate::guide::normal_inv_gamma_family_guide;
use crate::model::bayesian_linear_model;

/// Model and guide traces of one ELBO evaluation
pub struct ElboTraces {
    pub model: Trace,
    pub guide: Trace,
}

/// Run guide then model on the same design, returning both traces
pub fn elbo_traces(
    params: &ParamStore,
    design: &Tensor,
    model_config: &ModelConfig,
    guide_config: &GuideConfig,
    observed: &Tensor,
) -> PplResult<ElboTraces> {
    let mut guide = Trace::new();
    normal_inv_gamma_family_guide(&mut guide, params, design, guide_config)?;

    if guide.contains(&model_config.response_label) {
        return Err(PplError::invalid(format!(
            "guide draws the response site '{}'",
            model_config.response_label
        )));
    }

    let mut model = Trace::new()
        .replay(&guide)
        .condition(&model_config.response_label, observed.clone());
    bayesian_linear_model(&mut model, design, model_config)?;

    for (name, _) in model.latent_shapes() {
        if !guide.contains(&name) {
            return Err(PplError::invalid(format!(
                "latent site '{}' of the model has no counterpart in the guide",
                name
            )));
        }
    }

    Ok(ElboTraces { model, guide })
}

/// Monte Carlo estimate of the ELBO from one joint draw, a scalar
pub fn elbo(
    params: &ParamStore,
    design: &Tensor,
    model_config: &ModelConfig,
    guide_config: &GuideConfig,
    observed: &Tensor,
) -> PplResult<Tensor> {
    let traces = elbo_traces(params, design, model_config, guide_config, observed)?;
    let log_p = traces.model.log_prob_sum()?;
    let log_q = traces.guide.log_prob_sum()?;
    let elbo = (log_p - log_q)?;
    trace!("elbo {:?}", elbo.to_dtype(candle_core::DType::F64)?.to_scalar::<f64>());
    Ok(elbo)
}

/// Negative ELBO, the quantity to minimize
pub fn elbo_loss(
    params: &ParamStore,
    design: &Tensor,
    model_config: &ModelConfig,
    guide_config: &GuideConfig,
    observed: &Tensor,
) -> PplResult<Tensor> {
    Ok(elbo(params, design, model_config, guide_config, observed)?.neg()?)
}
