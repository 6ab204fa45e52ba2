//! Normal / inverse-Gamma variational family matched to
//! [`crate::model::bayesian_linear_model`].

use candle_core::Tensor;
use candle_util::ppl::shape::{concat_dims, design_dims, expand};
use candle_util::ppl::{
    Distribution, Gamma, Normal, ParamStore, PplError, PplResult, Trace, Transform,
};
use log::debug;

use crate::config::GuideConfig;
use crate::model::like;

/// Draw every latent site of the matching model from the learnable family
///
/// ```text
/// τ ~ Gamma(softplus(a), softplus(b)),  σ = 1/√τ     (unless σ is known)
/// G ~ Gamma(softplus(a_G), softplus(b_G))             per precision site
/// w ~ N(m, σ / softplus(s))                           per coefficient site
/// ```
///
/// Parameters live in `params` under `invsoftplus_alpha`,
/// `invsoftplus_beta`, `invsoftplus_alpha_<site>`, `invsoftplus_beta_<site>`,
/// `<label>_guide_mean` and `<label>_guide_sqrtlambda`. All of them carry the
/// design's batch dims, so changing the batch shape of the design against
/// the same store is a [`PplError::ParameterStoreConflict`].
pub fn normal_inv_gamma_family_guide(
    trace: &mut Trace,
    params: &ParamStore,
    design: &Tensor,
    config: &GuideConfig,
) -> PplResult<()> {
    let (batch, _, _) = design_dims(design)?;

    let obs_sd = match &config.known_noise_sd {
        Some(sd) => like(sd, design)?,
        None => {
            let tau = sample_gamma(trace, params, "tau", "", &batch, design, config.init)?;
            tau.sqrt()?.recip()?
        }
    };
    let obs_sd = expand(&obs_sd, &batch)?.unsqueeze(batch.len())?;

    for (site, shape) in &config.precision_shapes {
        check_rank(site, shape)?;
        let shape = concat_dims(&batch, shape);
        let suffix = format!("_{}", site);
        sample_gamma(trace, params, site, &suffix, &shape, design, config.init)?;
    }

    for (label, shape) in &config.coefficient_shapes {
        check_rank(label, shape)?;
        let shape = concat_dims(&batch, shape);

        let mean = params.param(
            &format!("{}_guide_mean", label),
            &Tensor::zeros(shape.as_slice(), design.dtype(), design.device())?,
            Transform::Identity,
        )?;
        let sqrt_lambda = params.param(
            &format!("{}_guide_sqrtlambda", label),
            &constant(&shape, config.init, design)?,
            Transform::Softplus,
        )?;

        let scale = obs_sd.broadcast_div(&sqrt_lambda)?;
        let q = Normal::new(&mean, &scale)?.to_event(1);
        trace.sample(label, &q)?;
    }

    debug!(
        "guide: {} precision site(s), {} coefficient site(s)",
        config.precision_shapes.len(),
        config.coefficient_shapes.len()
    );
    Ok(())
}

/// Gamma(softplus(invsoftplus_alpha<suffix>), softplus(invsoftplus_beta<suffix>))
fn sample_gamma(
    trace: &mut Trace,
    params: &ParamStore,
    site: &str,
    suffix: &str,
    shape: &[usize],
    design: &Tensor,
    init: f64,
) -> PplResult<Tensor> {
    let init = constant(shape, init, design)?;
    let alpha = params.param(
        &format!("invsoftplus_alpha{}", suffix),
        &init,
        Transform::Softplus,
    )?;
    let beta = params.param(
        &format!("invsoftplus_beta{}", suffix),
        &init,
        Transform::Softplus,
    )?;
    trace.sample(site, &Gamma::new(&alpha, &beta)?)
}

fn constant(shape: &[usize], value: f64, design: &Tensor) -> PplResult<Tensor> {
    Ok(Tensor::ones(shape, design.dtype(), design.device())?.affine(0., value)?)
}

fn check_rank(label: &str, shape: &[usize]) -> PplResult<()> {
    if shape.len() != 1 {
        return Err(PplError::invalid(format!(
            "site '{}' must have exactly one feature axis, got shape {:?}",
            label, shape
        )));
    }
    Ok(())
}
