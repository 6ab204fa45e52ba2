use candle_core::{Device, Tensor};
use candle_util::ppl::PplResult;

/// Reading off from and writing to `Tensor`
pub trait ConvertMatOps {
    type Mat;
    type Scalar;

    fn from_tensor(_: &Tensor) -> PplResult<Self::Mat>;
    fn to_tensor(&self, dev: &Device) -> PplResult<Tensor>;
}

/// Operations to sample random matrices
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm(dd: usize, nn: usize) -> Self::Mat;
}
