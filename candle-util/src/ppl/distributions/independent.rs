use candle_core::Tensor;

use super::Distribution;
use crate::ppl::error::{PplError, PplResult};

/// Treats the last `reinterpreted` batch dimensions of `base` as one event:
/// the joint density is the product over those axes.
#[derive(Debug, Clone)]
pub struct Independent<D> {
    base: D,
    reinterpreted: usize,
}

impl<D: Distribution> Independent<D> {
    pub fn new(base: D, reinterpreted: usize) -> Self {
        Self {
            base,
            reinterpreted,
        }
    }

    pub fn base(&self) -> &D {
        &self.base
    }
}

impl<D: Distribution> Distribution for Independent<D> {
    fn sample(&self) -> PplResult<Tensor> {
        self.base.sample()
    }

    fn log_prob(&self, value: &Tensor) -> PplResult<Tensor> {
        let mut lp = self.base.log_prob(value)?;
        if lp.rank() < self.reinterpreted {
            return Err(PplError::invalid(format!(
                "cannot reinterpret {} dims of a log density with shape {:?}",
                self.reinterpreted,
                lp.dims()
            )));
        }
        for _ in 0..self.reinterpreted {
            lp = lp.sum(lp.rank() - 1)?;
        }
        Ok(lp)
    }

    fn shape(&self) -> &[usize] {
        self.base.shape()
    }

    fn event_dims(&self) -> usize {
        self.base.event_dims() + self.reinterpreted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppl::distributions::Normal;
    use candle_core::{DType, Device};

    #[test]
    fn sums_over_last_axis() -> PplResult<()> {
        let dev = Device::Cpu;
        let loc = Tensor::zeros((2, 3), DType::F64, &dev)?;
        let scale = Tensor::ones((2, 3), DType::F64, &dev)?;
        let base = Normal::new(&loc, &scale)?;
        let x = Tensor::randn(0f64, 1f64, (2, 3), &dev)?;

        let elementwise: Vec<Vec<f64>> = base.log_prob(&x)?.to_vec2()?;
        let joint = base.clone().to_event(1);
        assert_eq!(joint.event_dims(), 1);
        let lp: Vec<f64> = joint.log_prob(&x)?.to_vec1()?;

        assert_eq!(lp.len(), 2);
        for (row, total) in elementwise.iter().zip(lp.iter()) {
            assert!((row.iter().sum::<f64>() - total).abs() < 1e-10);
        }
        Ok(())
    }

    #[test]
    fn too_many_event_dims() -> PplResult<()> {
        let dev = Device::Cpu;
        let base = Normal::new(&Tensor::new(0f32, &dev)?, &Tensor::new(1f32, &dev)?)?;
        let x = Tensor::new(0.5f32, &dev)?;
        assert!(base.to_event(1).log_prob(&x).is_err());
        Ok(())
    }
}
