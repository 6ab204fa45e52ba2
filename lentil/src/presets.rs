//! Ready-made model and guide configurations.
//!
//! Coefficient sites are named `"w"` (or `"w1"`, `"w2"` for two groups, `"u"`
//! for the random effect) and the response `"y"`; the returned configs are
//! plain structs and may be relabeled afterwards.

use candle_core::{DType, Tensor};
use candle_util::ppl::shape::{broadcast_pair, expand};
use candle_util::ppl::PplResult;
use matrix_util::dmatrix_util::DMatrix;
use matrix_util::prior_covariance_from_sd;

use crate::config::{CoefficientGroup, GuideConfig, ModelConfig, Response, DEFAULT_COEF_LABEL};

/// Gaussian linear model with known noise and independent Gaussian
/// coefficients, for which the posterior is available in closed form
#[derive(Debug, Clone)]
pub struct KnownCovarianceModel {
    pub config: ModelConfig,
    pub obs_sd: Tensor,
    /// prior standard deviation of each coefficient group, in column order
    pub coef_sds: Vec<(String, Tensor)>,
}

impl KnownCovarianceModel {
    /// `diag(sd²)` over all coefficients, in column order
    pub fn prior_covariance(&self) -> PplResult<DMatrix<f64>> {
        let mut sds = vec![];
        for ((_, sd), group) in self.coef_sds.iter().zip(self.config.groups.iter()) {
            let width = group.width()?;
            let sd = expand(&sd.to_dtype(DType::F64)?, &[width])?;
            sds.extend(sd.to_vec1::<f64>()?);
        }
        Ok(prior_covariance_from_sd(&sds))
    }

    /// Prior mean over all coefficients, in column order
    pub fn prior_mean(&self) -> PplResult<Vec<f64>> {
        let mut means = vec![];
        for group in &self.config.groups {
            if let CoefficientGroup::Fixed(fe) = group {
                let mean = expand(&fe.mean.to_dtype(DType::F64)?, &[fe.width()?])?;
                means.extend(mean.to_vec1::<f64>()?);
            }
        }
        Ok(means)
    }

    pub fn obs_sd_f64(&self) -> PplResult<f64> {
        Ok(self.obs_sd.to_dtype(DType::F64)?.to_scalar::<f64>()?)
    }
}

/// `w ~ N(coef_mean, coef_sd)`, `y ~ N(xw, obs_sd)`
pub fn known_covariance_linear_model(
    coef_mean: &Tensor,
    coef_sd: &Tensor,
    obs_sd: &Tensor,
) -> PplResult<KnownCovarianceModel> {
    let config = ModelConfig::new()
        .with_fixed_effect(
            DEFAULT_COEF_LABEL,
            coef_mean.clone(),
            sqrt_lambda_for(coef_sd, obs_sd)?,
        )
        .with_known_noise(obs_sd.clone());

    Ok(KnownCovarianceModel {
        config,
        obs_sd: obs_sd.clone(),
        coef_sds: vec![(DEFAULT_COEF_LABEL.to_string(), coef_sd.clone())],
    })
}

/// Guide for [`known_covariance_linear_model`]
pub fn normal_guide(obs_sd: &Tensor, coef_width: usize) -> GuideConfig {
    GuideConfig::new(Some(obs_sd.clone())).with_coefficients(DEFAULT_COEF_LABEL, &[coef_width])
}

/// Two fixed-effect groups `w1`, `w2` placed side by side in the design
pub fn group_linear_model(
    coef1_mean: &Tensor,
    coef1_sd: &Tensor,
    coef2_mean: &Tensor,
    coef2_sd: &Tensor,
    obs_sd: &Tensor,
) -> PplResult<KnownCovarianceModel> {
    let config = ModelConfig::new()
        .with_fixed_effect("w1", coef1_mean.clone(), sqrt_lambda_for(coef1_sd, obs_sd)?)
        .with_fixed_effect("w2", coef2_mean.clone(), sqrt_lambda_for(coef2_sd, obs_sd)?)
        .with_known_noise(obs_sd.clone());

    Ok(KnownCovarianceModel {
        config,
        obs_sd: obs_sd.clone(),
        coef_sds: vec![
            ("w1".to_string(), coef1_sd.clone()),
            ("w2".to_string(), coef2_sd.clone()),
        ],
    })
}

/// Guide for [`group_linear_model`]
pub fn group_normal_guide(obs_sd: &Tensor, coef1_width: usize, coef2_width: usize) -> GuideConfig {
    GuideConfig::new(Some(obs_sd.clone()))
        .with_coefficients("w1", &[coef1_width])
        .with_coefficients("w2", &[coef2_width])
}

/// Zero prior mean and unit noise; `coef_sd` has one entry per feature
pub fn zero_mean_unit_obs_sd_lm(
    coef_sd: &Tensor,
) -> PplResult<(KnownCovarianceModel, GuideConfig)> {
    let dev = coef_sd.device();
    let zero = Tensor::new(0f32, dev)?.to_dtype(coef_sd.dtype())?;
    let one = Tensor::new(1f32, dev)?.to_dtype(coef_sd.dtype())?;
    let model = known_covariance_linear_model(&zero, coef_sd, &one)?;
    let width = coef_sd.dims().last().copied().unwrap_or(1);
    Ok((model, normal_guide(&one, width)))
}

/// Unknown noise: `τ ~ Gamma(alpha, beta)`, `w ~ N(coef_mean, 1/√(τ λ))`
pub fn normal_inverse_gamma_linear_model(
    coef_mean: &Tensor,
    coef_sqrtlambda: &Tensor,
    alpha: &Tensor,
    beta: &Tensor,
) -> ModelConfig {
    ModelConfig::new()
        .with_fixed_effect(DEFAULT_COEF_LABEL, coef_mean.clone(), coef_sqrtlambda.clone())
        .with_noise_prior(alpha.clone(), beta.clone())
}

/// Guide for [`normal_inverse_gamma_linear_model`]
pub fn normal_inverse_gamma_guide(coef_width: usize) -> GuideConfig {
    GuideConfig::new(None).with_coefficients(DEFAULT_COEF_LABEL, &[coef_width])
}

/// `w ~ N(coef_mean, coef_sd)`, `y ~ Bernoulli(logits = xw)`
pub fn logistic_regression_model(coef_mean: &Tensor, coef_sd: &Tensor) -> PplResult<ModelConfig> {
    let one = Tensor::ones((), coef_sd.dtype(), coef_sd.device())?;
    Ok(ModelConfig::new()
        .with_fixed_effect(DEFAULT_COEF_LABEL, coef_mean.clone(), coef_sd.recip()?)
        .with_known_noise(one)
        .with_response(Response::Bernoulli))
}

/// Mixed model: zero-mean fixed effects `w` with sd `fixed_effects_sd`,
/// then a random effect `u` over `n_groups` groups with Gamma precisions
pub fn lmer_model(
    fixed_effects_sd: &Tensor,
    n_groups: usize,
    random_effects_alpha: &Tensor,
    random_effects_beta: &Tensor,
    response: Response,
) -> PplResult<ModelConfig> {
    let dev = fixed_effects_sd.device();
    let dtype = fixed_effects_sd.dtype();
    Ok(ModelConfig::new()
        .with_fixed_effect(
            DEFAULT_COEF_LABEL,
            Tensor::zeros((), dtype, dev)?,
            fixed_effects_sd.recip()?,
        )
        .with_random_effect(
            "u",
            n_groups,
            random_effects_alpha.clone(),
            random_effects_beta.clone(),
        )
        .with_known_noise(Tensor::ones((), dtype, dev)?)
        .with_response(response))
}

/// √λ such that `obs_sd / √λ = coef_sd`
fn sqrt_lambda_for(coef_sd: &Tensor, obs_sd: &Tensor) -> PplResult<Tensor> {
    let (obs_sd, coef_sd) = broadcast_pair(obs_sd, coef_sd)?;
    Ok((obs_sd / coef_sd)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn known_covariance_prior() -> PplResult<()> {
        let dev = Device::Cpu;
        let model = known_covariance_linear_model(
            &Tensor::new(0f32, &dev)?,
            &Tensor::new(&[1f32, 2., 0.5], &dev)?,
            &Tensor::new(2f32, &dev)?,
        )?;
        let cov = model.prior_covariance()?;
        assert_eq!(cov.shape(), (3, 3));
        assert!((cov[(0, 0)] - 1.).abs() < 1e-6);
        assert!((cov[(1, 1)] - 4.).abs() < 1e-6);
        assert!((cov[(2, 2)] - 0.25).abs() < 1e-6);
        assert_eq!(cov[(0, 1)], 0.);
        assert_eq!(model.prior_mean()?, vec![0.; 3]);
        assert!((model.obs_sd_f64()? - 2.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn lmer_layout() -> PplResult<()> {
        let dev = Device::Cpu;
        let config = lmer_model(
            &Tensor::ones(2, DType::F32, &dev)?,
            5,
            &Tensor::new(&[1f32], &dev)?,
            &Tensor::new(&[2f32], &dev)?,
            Response::Normal,
        )?;
        assert_eq!(config.num_features()?, 2 + 5);
        let labels: Vec<&str> = config.groups.iter().map(|g| g.label()).collect();
        assert_eq!(labels, vec!["w", "u"]);
        Ok(())
    }
}
