//! Special functions on tensors, differentiable through candle ops.

use candle_core::{Result, Tensor};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// log Γ(x) for x > 0.
///
/// Shifts the argument by 6 with the recurrence `Γ(x+1) = x Γ(x)` and
/// evaluates the Stirling series at `z = x + 6`:
///
/// ```text
/// lgamma(z) ≈ (z - 1/2) log z - z + log √(2π) + 1/(12z) - 1/(360z³) + 1/(1260z⁵)
/// lgamma(x) = lgamma(x + 6) - log(x (x+1) ... (x+5))
/// ```
pub fn lgamma(x: &Tensor) -> Result<Tensor> {
    let x_safe = x.clamp(1e-6f32, f32::MAX)?;

    let mut prod = x_safe.clone();
    for k in 1..6 {
        prod = (prod * (&x_safe + k as f64)?)?;
    }
    let log_shift = prod.log()?;

    let z = (&x_safe + 6.0)?;
    let zinv = z.recip()?;
    let zinv2 = zinv.sqr()?;

    // 1/(12z) - 1/(360z³) + 1/(1260z⁵)
    let series = ((&zinv2 * (1.0 / 1260.0))? - (1.0 / 360.0))?;
    let series = ((&zinv2 * series)? + (1.0 / 12.0))?;
    let series = (&zinv * series)?;

    let stirling = (((&z - 0.5)? * z.log()?)? - &z)?;
    let stirling = ((stirling + LN_SQRT_2PI)? + series)?;

    stirling - log_shift
}
