use candle_core::Tensor;

use super::Distribution;
use crate::ppl::error::PplResult;
use crate::ppl::shape::broadcast_pair;

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Normal(μ, σ) with elementwise location and scale.
#[derive(Debug, Clone)]
pub struct Normal {
    loc: Tensor,
    scale: Tensor,
}

impl Normal {
    pub fn new(loc: &Tensor, scale: &Tensor) -> PplResult<Self> {
        let (loc, scale) = broadcast_pair(loc, scale)?;
        Ok(Self { loc, scale })
    }

    pub fn loc(&self) -> &Tensor {
        &self.loc
    }

    pub fn scale(&self) -> &Tensor {
        &self.scale
    }
}

impl Distribution for Normal {
    /// μ + σ ε, ε ~ N(0, 1)
    fn sample(&self) -> PplResult<Tensor> {
        let eps = self.loc.randn_like(0.0, 1.0)?;
        Ok(((eps * &self.scale)? + &self.loc)?)
    }

    /// -½ ((x - μ)/σ)² - log σ - log √(2π)
    fn log_prob(&self, value: &Tensor) -> PplResult<Tensor> {
        let z = value
            .broadcast_sub(&self.loc)?
            .broadcast_div(&self.scale)?;
        let quad = (z.sqr()? * (-0.5))?;
        let lp = quad.broadcast_sub(&self.scale.log()?)?;
        Ok((lp - LN_SQRT_2PI)?)
    }

    fn shape(&self) -> &[usize] {
        self.loc.dims()
    }
}
