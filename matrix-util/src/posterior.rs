//! Closed-form posterior moments of the Gaussian linear model with known
//! noise,
//!
//! ```text
//! w ~ N(μ₀, Σ₀),  y | w ~ N(x w, σ² I)
//! ```
//!
//! Valid only with known noise, Gaussian response and no random effects;
//! nothing here checks that the model it is compared with satisfies this.

use crate::dmatrix_util::{DMatrix, DVector};
use candle_util::ppl::{PplError, PplResult};
use nalgebra::RealField;

/// Posterior covariance Σ₁ of the regression coefficient
///
/// ```text
/// Σ₁ = Σ₀ - (Σ₀xᵗx + σ²I)⁻¹ Σ₀xᵗx Σ₀
/// ```
///
/// which equals `(Σ₀⁻¹ + xᵗx / σ²)⁻¹` without inverting Σ₀.
///
/// # Arguments
/// * `prior_cov` - `p x p` prior covariance Σ₀
/// * `x` - `n x p` realized design
/// * `obs_sd` - known observation standard deviation σ
pub fn analytic_posterior_cov<T>(
    prior_cov: &DMatrix<T>,
    x: &DMatrix<T>,
    obs_sd: T,
) -> PplResult<DMatrix<T>>
where
    T: RealField + Copy,
{
    let p = check_dims(prior_cov, x)?;

    let sigma_xx = prior_cov * (x.transpose() * x);
    let lhs = &sigma_xx + DMatrix::<T>::identity(p, p) * (obs_sd * obs_sd);
    let lhs_inv = lhs
        .try_inverse()
        .ok_or_else(|| PplError::invalid("Σ₀xᵗx + σ²I is singular"))?;

    Ok(prior_cov - lhs_inv * (sigma_xx * prior_cov))
}

/// Posterior mean of the regression coefficient
///
/// ```text
/// μ₁ = μ₀ + Σ₀xᵗ (xΣ₀xᵗ + σ²I)⁻¹ (y - xμ₀)
/// ```
pub fn analytic_posterior_mean<T>(
    prior_mean: &DVector<T>,
    prior_cov: &DMatrix<T>,
    x: &DMatrix<T>,
    y: &DVector<T>,
    obs_sd: T,
) -> PplResult<DVector<T>>
where
    T: RealField + Copy,
{
    let p = check_dims(prior_cov, x)?;
    let n = x.nrows();
    if prior_mean.len() != p || y.len() != n {
        return Err(PplError::invalid(format!(
            "prior mean has {} entries and y {}, expected {} and {}",
            prior_mean.len(),
            y.len(),
            p,
            n
        )));
    }

    let sigma_xt = prior_cov * x.transpose();
    let gram = x * &sigma_xt + DMatrix::<T>::identity(n, n) * (obs_sd * obs_sd);
    let gram_inv = gram
        .try_inverse()
        .ok_or_else(|| PplError::invalid("xΣ₀xᵗ + σ²I is singular"))?;
    let resid = y - x * prior_mean;

    Ok(prior_mean + sigma_xt * (gram_inv * resid))
}

/// `diag(coef_sd²)`, the prior covariance of independent coefficients
pub fn prior_covariance_from_sd<T>(coef_sd: &[T]) -> DMatrix<T>
where
    T: RealField + Copy,
{
    let var = DVector::<T>::from_iterator(coef_sd.len(), coef_sd.iter().map(|&s| s * s));
    DMatrix::<T>::from_diagonal(&var)
}

fn check_dims<T: RealField + Copy>(prior_cov: &DMatrix<T>, x: &DMatrix<T>) -> PplResult<usize> {
    let p = prior_cov.nrows();
    if prior_cov.ncols() != p {
        return Err(PplError::invalid(format!(
            "prior covariance must be square, got {:?}",
            prior_cov.shape()
        )));
    }
    if x.ncols() != p {
        return Err(PplError::invalid(format!(
            "design has {} columns, prior covariance is {} x {}",
            x.ncols(),
            p,
            p
        )));
    }
    Ok(p)
}
