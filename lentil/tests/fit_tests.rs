use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use candle_util::ppl::{softplus, ParamStore, Trace};
use lentil::presets::{
    normal_inverse_gamma_guide, normal_inverse_gamma_linear_model, zero_mean_unit_obs_sd_lm,
};
use lentil::{elbo_loss, normal_inv_gamma_family_guide};
use matrix_util::dmatrix_util::{DMatrix, DVector};
use matrix_util::traits::ConvertMatOps;
use matrix_util::{analytic_posterior_cov, analytic_posterior_mean};

const NUM_COPIES: usize = 64;
const NUM_STEPS: usize = 1500;

/// Fit the matched guide in the conjugate regime, one independent copy of
/// the guide per batch element, and compare the averaged estimates with the
/// closed-form posterior.
#[test]
fn guide_fit_approaches_analytic_posterior() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dev = Device::Cpu;

    // xᵗx = 4 I, so the posterior factorizes over coefficients
    let x_rows = [[1f32, 1.], [1., -1.], [-1., 1.], [-1., -1.]];
    let y_obs = [1.5f32, 0.3, -0.2, -1.1];
    let (n, p) = (x_rows.len(), 2);

    let (model, guide_config) = zero_mean_unit_obs_sd_lm(&Tensor::ones(p, DType::F32, &dev)?)?;

    let design = Tensor::new(&x_rows, &dev)?
        .unsqueeze(0)?
        .broadcast_as((NUM_COPIES, n, p))?
        .contiguous()?;
    let y = Tensor::new(&y_obs, &dev)?
        .unsqueeze(0)?
        .broadcast_as((NUM_COPIES, n))?
        .contiguous()?;

    let params = ParamStore::new();
    normal_inv_gamma_family_guide(&mut Trace::new(), &params, &design, &guide_config)?;
    let mut opt = AdamW::new(
        params.all_vars(),
        ParamsAdamW {
            lr: 0.02,
            weight_decay: 0.,
            ..Default::default()
        },
    )?;

    for step in 0..NUM_STEPS {
        let loss = elbo_loss(&params, &design, &model.config, &guide_config, &y)?;
        opt.backward_step(&(&loss / NUM_COPIES as f64)?)?;
        if step % 500 == 0 {
            log::info!("step {}: loss {}", step, loss.to_scalar::<f32>()?);
        }
    }

    let fitted_mean = params
        .get("w_guide_mean")?
        .ok_or_else(|| anyhow::anyhow!("missing w_guide_mean"))?
        .mean(0)?
        .to_vec1::<f32>()?;

    // guide sd = obs_sd / softplus(s) = 1 / sqrtlambda
    let sqrt_lambda = params
        .unconstrained("w_guide_sqrtlambda")?
        .ok_or_else(|| anyhow::anyhow!("missing w_guide_sqrtlambda"))?;
    let fitted_sd = softplus(sqrt_lambda.as_tensor())?
        .recip()?
        .mean(0)?
        .to_vec1::<f32>()?;

    let x = DMatrix::<f64>::from_tensor(&design.get(0)?)?;
    let y = DVector::<f64>::from_iterator(n, y_obs.iter().map(|&v| v as f64));
    let prior_cov = model.prior_covariance()?;
    let prior_mean = DVector::<f64>::from_vec(model.prior_mean()?);
    let obs_sd = model.obs_sd_f64()?;

    let post_cov = analytic_posterior_cov(&prior_cov, &x, obs_sd)?;
    let post_mean = analytic_posterior_mean(&prior_mean, &prior_cov, &x, &y, obs_sd)?;

    for j in 0..p {
        let sd = post_cov[(j, j)].sqrt() as f32;
        assert!(
            (fitted_mean[j] - post_mean[j] as f32).abs() < 0.08,
            "mean[{}]: {} vs {}",
            j,
            fitted_mean[j],
            post_mean[j]
        );
        assert!(
            (fitted_sd[j] - sd).abs() < 0.06,
            "sd[{}]: {} vs {}",
            j,
            fitted_sd[j],
            sd
        );
    }
    Ok(())
}

/// Normal-inverse-Gamma regression: the guide family contains the exact
/// posterior, τ | y ~ Gamma(α₀ + n/2, β₀ + ½(yᵗy - μₙᵗΛₙμₙ)) with
/// Λₙ = xᵗx + λ²I and μₙ = Λₙ⁻¹xᵗy for a zero prior mean.
#[test]
fn noise_precision_guide_approaches_conjugate_posterior() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dev = Device::Cpu;

    // xᵗx = 8 I
    let x_rows = [
        [1f32, 1.],
        [1., -1.],
        [-1., 1.],
        [-1., -1.],
        [1., 1.],
        [1., -1.],
        [-1., 1.],
        [-1., -1.],
    ];
    let y_obs = [2.1f32, 0.4, -0.3, -1.6, 1.7, 0.2, 0.5, -2.2];
    let (n, p) = (x_rows.len(), 2);
    let (alpha0, beta0) = (3f64, 2f64);

    let model_config = normal_inverse_gamma_linear_model(
        &Tensor::new(0f32, &dev)?,
        &Tensor::ones(p, DType::F32, &dev)?,
        &Tensor::new(alpha0 as f32, &dev)?,
        &Tensor::new(beta0 as f32, &dev)?,
    );
    let guide_config = normal_inverse_gamma_guide(p);

    let design = Tensor::new(&x_rows, &dev)?
        .unsqueeze(0)?
        .broadcast_as((NUM_COPIES, n, p))?
        .contiguous()?;
    let y = Tensor::new(&y_obs, &dev)?
        .unsqueeze(0)?
        .broadcast_as((NUM_COPIES, n))?
        .contiguous()?;

    let params = ParamStore::new();
    normal_inv_gamma_family_guide(&mut Trace::new(), &params, &design, &guide_config)?;
    let mut opt = AdamW::new(
        params.all_vars(),
        ParamsAdamW {
            lr: 0.02,
            weight_decay: 0.,
            ..Default::default()
        },
    )?;

    for step in 0..(2 * NUM_STEPS) {
        let loss = elbo_loss(&params, &design, &model_config, &guide_config, &y)?;
        opt.backward_step(&(&loss / NUM_COPIES as f64)?)?;
        if step % 500 == 0 {
            log::info!("step {}: loss {}", step, loss.to_scalar::<f32>()?);
        }
    }

    let get = |name: &str| {
        params
            .get(name)?
            .ok_or_else(|| anyhow::anyhow!("missing {}", name))
    };
    // E_q[τ] = α / β per copy, averaged over copies
    let fitted_tau = (get("invsoftplus_alpha")? / get("invsoftplus_beta")?)?
        .mean_all()?
        .to_scalar::<f32>()? as f64;
    let fitted_mean = get("w_guide_mean")?.mean(0)?.to_vec1::<f32>()?;

    let x = DMatrix::<f64>::from_tensor(&design.get(0)?)?;
    let yv = DVector::<f64>::from_iterator(n, y_obs.iter().map(|&v| v as f64));
    let precision = x.transpose() * &x + DMatrix::<f64>::identity(p, p);
    let post_mean = precision
        .clone()
        .try_inverse()
        .ok_or_else(|| anyhow::anyhow!("singular posterior precision"))?
        * (x.transpose() * &yv);
    let quad = yv.dot(&yv) - post_mean.dot(&(&precision * &post_mean));
    let alpha_n = alpha0 + n as f64 / 2.;
    let beta_n = beta0 + quad / 2.;
    let post_tau = alpha_n / beta_n;

    assert!(
        (fitted_tau - post_tau).abs() < 0.15 * post_tau,
        "E[tau]: {} vs {}",
        fitted_tau,
        post_tau
    );
    for j in 0..p {
        assert!(
            (fitted_mean[j] as f64 - post_mean[j]).abs() < 0.1,
            "mean[{}]: {} vs {}",
            j,
            fitted_mean[j],
            post_mean[j]
        );
    }
    Ok(())
}
