use candle_core::{DType, Tensor};
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use super::Distribution;
use crate::ppl::error::{PplError, PplResult};
use crate::ppl::shape::broadcast_pair;
use crate::ppl::special::lgamma;

/// Gamma(α, β) with shape α and rate β,
///
/// `p(x) = β^α x^(α-1) exp(-βx) / Γ(α)`
///
/// Draws are reparameterized, so gradients reach α and β through them.
#[derive(Debug, Clone)]
pub struct Gamma {
    concentration: Tensor,
    rate: Tensor,
}

impl Gamma {
    pub fn new(concentration: &Tensor, rate: &Tensor) -> PplResult<Self> {
        let (concentration, rate) = broadcast_pair(concentration, rate)?;
        Ok(Self {
            concentration,
            rate,
        })
    }

    pub fn concentration(&self) -> &Tensor {
        &self.concentration
    }

    pub fn rate(&self) -> &Tensor {
        &self.rate
    }

    /// α / β
    pub fn mean(&self) -> PplResult<Tensor> {
        Ok((&self.concentration / &self.rate)?)
    }
}

impl Distribution for Gamma {
    /// Reparameterized draw, differentiable in both α and β
    ///
    /// ```text
    /// d = α' - 1/3,  c = 1/√(9d)
    /// x = d (1 + c ε)³ · U^(1/α) / β
    /// ```
    ///
    /// where ε is the accepted normal proposal of Marsaglia and Tsang's
    /// rejection sampler for Gamma(α', 1), and for α < 1 the shape is
    /// boosted, α' = α + 1, with U ~ U(0,1) (U = 1 otherwise). Only ε and U
    /// are drawn on the host; the transform runs on tensors, so gradients
    /// flow back into α and β.
    fn sample(&self) -> PplResult<Tensor> {
        let shape_vec = self
            .concentration
            .to_dtype(DType::F64)?
            .flatten_all()?
            .to_vec1::<f64>()?;
        let rate_vec = self
            .rate
            .to_dtype(DType::F64)?
            .flatten_all()?
            .to_vec1::<f64>()?;

        let noise = shape_vec
            .par_iter()
            .zip(rate_vec.par_iter())
            .map_init(rand::rng, |rng, (&a, &b)| {
                if !(a.is_finite() && b.is_finite() && a > 0.0 && b > 0.0) {
                    return Err(PplError::invalid(format!(
                        "Gamma(shape={}, rate={}) needs positive finite parameters",
                        a, b
                    )));
                }
                Ok(marsaglia_tsang_noise(rng, a))
            })
            .collect::<PplResult<Vec<GammaNoise>>>()?;

        let dims = self.concentration.dims();
        let dev = self.concentration.device();
        let dtype = self.concentration.dtype();
        let host = |v: Vec<f64>| -> PplResult<Tensor> {
            Ok(Tensor::from_vec(v, dims, dev)?.to_dtype(dtype)?)
        };
        let eps = host(noise.iter().map(|n| n.eps).collect())?;
        let ln_u = host(noise.iter().map(|n| n.ln_u).collect())?;
        let boost = host(noise.iter().map(|n| n.boost).collect())?;

        let alpha = &self.concentration;
        let d = ((alpha + boost)? - 1.0 / 3.0)?;
        let c = d.affine(9.0, 0.0)?.sqrt()?.recip()?;
        let t = ((c * &eps)? + 1.0)?;
        let g = (&d * (t.sqr()? * &t)?)?;
        let g = (g * (ln_u / alpha)?.exp()?)?;
        let x = (g / &self.rate)?;
        Ok(x.maximum(f32::MIN_POSITIVE as f64)?)
    }

    /// α log β + (α - 1) log x - βx - log Γ(α)
    fn log_prob(&self, value: &Tensor) -> PplResult<Tensor> {
        let alpha = &self.concentration;
        let beta = &self.rate;
        let normalizer = ((alpha * beta.log()?)? - lgamma(alpha)?)?;
        let kernel = value
            .log()?
            .broadcast_mul(&(alpha - 1.0)?)?
            .broadcast_sub(&value.broadcast_mul(beta)?)?;
        Ok(kernel.broadcast_add(&normalizer)?)
    }

    fn shape(&self) -> &[usize] {
        self.concentration.dims()
    }
}

/// Host-side randomness of one reparameterized Gamma draw
struct GammaNoise {
    eps: f64,
    ln_u: f64,
    boost: f64,
}

fn marsaglia_tsang_noise<R: Rng>(rng: &mut R, shape: f64) -> GammaNoise {
    let (shape, ln_u, boost) = if shape < 1.0 {
        (shape + 1.0, (1.0 - rng.random::<f64>()).ln(), 1.0)
    } else {
        (shape, 0.0, 0.0)
    };
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let eps: f64 = rng.sample(StandardNormal);
        let t = 1.0 + c * eps;
        if t <= 0.0 {
            continue;
        }
        let v = t * t * t;
        let u = 1.0 - rng.random::<f64>();
        if u < 1.0 - 0.0331 * eps.powi(4) || u.ln() < 0.5 * eps * eps + d * (1.0 - v + v.ln()) {
            return GammaNoise { eps, ln_u, boost };
        }
    }
}
