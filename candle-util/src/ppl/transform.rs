use candle_core::{Result, Tensor};

/// Reparameterization from an unconstrained learnable tensor to the
/// parameter's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    Identity,
    /// `log(1 + exp(x))`, strictly positive
    Softplus,
}

impl Transform {
    /// unconstrained -> constrained
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        match self {
            Self::Identity => Ok(x.clone()),
            Self::Softplus => softplus(x),
        }
    }
}

/// Numerically stable softplus: `max(x, 0) + log(1 + exp(-|x|))`
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    let tail = (x.abs()?.neg()?.exp()? + 1.0)?.log()?;
    x.relu()? + tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn softplus_matches_closed_form() -> Result<()> {
        let x = Tensor::new(&[-30f32, -1.0, 0.0, 3.0, 40.0], &Device::Cpu)?;
        let y: Vec<f32> = softplus(&x)?.to_vec1()?;
        let expected = [0.0f32, 0.3132617, std::f32::consts::LN_2, 3.0485873, 40.0];
        for (a, b) in y.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
        }
        assert!(y.iter().all(|&v| v >= 0.0));
        Ok(())
    }
}
