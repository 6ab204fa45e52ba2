//! Bayesian linear regression with fixed and random effects.
//!
//! ```text
//! τ ~ Gamma(α₀, β₀),  σ = 1/√τ                 (unless σ is known)
//! w_g ~ N(μ_g, σ / √λ_g)                         fixed-effect groups
//! G_h ~ 1/√Gamma(α_h, β_h),  u_h ~ N(0, G_h)     random-effect groups
//! w = [w_1, ..., u_1, ...]                       in registration order
//! y ~ N(xw, σ²)  or  y ~ Bernoulli(logits = xw)
//! ```

use candle_core::Tensor;
use candle_util::ppl::shape::{broadcast_pair, concat_dims, design_dims, expand};
use candle_util::ppl::{
    Bernoulli, ConfigWarning, Distribution, Gamma, Normal, PplError, PplResult, Trace,
};
use log::debug;

use crate::config::{CoefficientGroup, FixedEffect, ModelConfig, RandomEffect, Response};

/// Run the generative model forward and return the response.
///
/// Every draw is registered in `trace`: `"tau"` when the noise is unknown,
/// one site per fixed-effect group, `"G_<label>"` and `<label>` per
/// random-effect group, and finally `config.response_label`.
///
/// # Arguments
/// * `trace` - sampling context
/// * `design` - `(*batch, n, p)`; `p` must equal the total width of the
///   coefficient groups, in the same column order
/// * `config` - priors, groups and response
///
/// # Returns
/// The response, shape `(*batch, n)`
pub fn bayesian_linear_model(
    trace: &mut Trace,
    design: &Tensor,
    config: &ModelConfig,
) -> PplResult<Tensor> {
    let (batch, n, p) = design_dims(design)?;
    let design = design.contiguous()?;
    debug!("linear model: batch {:?}, n = {}, p = {}", batch, n, p);

    if config.groups.is_empty() {
        return Err(PplError::invalid("no coefficient groups"));
    }

    let obs_sd = match (&config.known_noise_sd, &config.noise_prior) {
        (Some(sd), prior) => {
            if prior.is_some() {
                trace.warn(ConfigWarning::UnusedNoisePrior);
            }
            like(sd, &design)?
        }
        (None, Some(prior)) => {
            let alpha = expand(&like(&prior.alpha, &design)?, &batch)?;
            let beta = expand(&like(&prior.beta, &design)?, &batch)?;
            let tau = trace.sample("tau", &Gamma::new(&alpha, &beta)?)?;
            tau.sqrt()?.recip()?
        }
        (None, None) => {
            return Err(PplError::invalid(
                "either a known noise sd or a Gamma prior on the noise precision is required",
            ))
        }
    };

    // (*batch, 1) so it broadcasts over coefficients and observations
    let obs_sd = expand(&obs_sd, &batch)?.unsqueeze(batch.len())?;

    let mut coefs = Vec::with_capacity(config.groups.len());
    for group in &config.groups {
        let w = match group {
            CoefficientGroup::Fixed(fe) => sample_fixed_effect(trace, fe, &obs_sd, &design)?,
            CoefficientGroup::Random(re) => sample_random_effect(trace, re, &batch, &design)?,
        };
        if w.rank() != batch.len() + 1 || &w.dims()[..batch.len()] != batch.as_slice() {
            return Err(PplError::invalid(format!(
                "group '{}' has shape {:?}, expected batch {:?} plus one feature axis",
                group.label(),
                w.dims(),
                batch
            )));
        }
        coefs.push(w.unsqueeze(batch.len() + 1)?);
    }

    // (*batch, p, 1)
    let w = Tensor::cat(&coefs, batch.len())?.contiguous()?;
    let width = w.dim(batch.len())?;
    if width != p {
        return Err(PplError::invalid(format!(
            "coefficient groups have {} features in total but the design has {}",
            width, p
        )));
    }

    let prediction_mean = design.matmul(&w)?.squeeze(batch.len() + 1)?;

    let label = config.response_label.as_str();
    match config.response {
        Response::Normal => {
            let emission = Normal::new(&prediction_mean, &obs_sd)?.to_event(1);
            trace.sample(label, &emission)
        }
        Response::Bernoulli => {
            let emission = Bernoulli::from_logits(&prediction_mean).to_event(1);
            trace.sample(label, &emission)
        }
    }
}

/// w ~ N(mean, σ / √λ) as one vector-valued site
fn sample_fixed_effect(
    trace: &mut Trace,
    fe: &FixedEffect,
    obs_sd: &Tensor,
    design: &Tensor,
) -> PplResult<Tensor> {
    let sqrt_lambda = like(&fe.sqrt_lambda, design)?;
    let (sd, sqrt_lambda) = broadcast_pair(obs_sd, &sqrt_lambda)?;
    let scale = (sd / sqrt_lambda)?;
    let prior = Normal::new(&like(&fe.mean, design)?, &scale)?.to_event(1);
    trace.sample(&fe.label, &prior)
}

/// G ~ 1/√Gamma(α, β) once per group, then u ~ N(0, G repeated)
fn sample_random_effect(
    trace: &mut Trace,
    re: &RandomEffect,
    batch: &[usize],
    design: &Tensor,
) -> PplResult<Tensor> {
    if re.group_size == 0 {
        return Err(PplError::invalid(format!(
            "random effect '{}' needs a positive group size",
            re.label
        )));
    }

    let g_shape = concat_dims(batch, &[re.group_width()?]);
    let alpha = expand(&like(&re.alpha, design)?, &g_shape)?;
    let beta = expand(&like(&re.beta, design)?, &g_shape)?;
    let precision = trace.sample(&re.precision_label(), &Gamma::new(&alpha, &beta)?)?;
    let g = precision.sqrt()?.recip()?;

    // tile along the last axis: [g_1 .. g_k, g_1 .. g_k, ...]
    let mut repeats = vec![1usize; batch.len()];
    repeats.push(re.group_size);
    let g = g.repeat(repeats)?;

    let prior = Normal::new(&g.zeros_like()?, &g)?.to_event(1);
    trace.sample(&re.label, &prior)
}

/// `x` on the design's device with the design's dtype
pub(crate) fn like(x: &Tensor, design: &Tensor) -> PplResult<Tensor> {
    Ok(x.to_dtype(design.dtype())?.to_device(design.device())?)
}
