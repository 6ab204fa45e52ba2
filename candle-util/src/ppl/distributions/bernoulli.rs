use candle_core::Tensor;

use super::Distribution;
use crate::ppl::error::PplResult;
use crate::ppl::transform::softplus;

/// Bernoulli parameterized by logits; draws are 0/1 in the logits' dtype.
#[derive(Debug, Clone)]
pub struct Bernoulli {
    logits: Tensor,
}

impl Bernoulli {
    pub fn from_logits(logits: &Tensor) -> Self {
        Self {
            logits: logits.clone(),
        }
    }

    pub fn logits(&self) -> &Tensor {
        &self.logits
    }

    pub fn probs(&self) -> PplResult<Tensor> {
        Ok(candle_nn::ops::sigmoid(&self.logits)?)
    }
}

impl Distribution for Bernoulli {
    fn sample(&self) -> PplResult<Tensor> {
        let probs = self.probs()?.detach();
        let u = probs.rand_like(0.0, 1.0)?;
        Ok(u.lt(&probs)?.to_dtype(self.logits.dtype())?)
    }

    /// y η - log(1 + exp(η))
    fn log_prob(&self, value: &Tensor) -> PplResult<Tensor> {
        let y_eta = value.broadcast_mul(&self.logits)?;
        Ok(y_eta.broadcast_sub(&softplus(&self.logits)?)?)
    }

    fn shape(&self) -> &[usize] {
        self.logits.dims()
    }
}
