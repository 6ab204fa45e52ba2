use crate::traits::*;
use candle_core::{Device, Tensor, WithDType};
use candle_util::ppl::{PplError, PplResult};
pub use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

impl SampleOps for DMatrix<f32> {
    type Mat = Self;
    type Scalar = f32;

    /// Sample d,n matrix from N(0,1)
    fn rnorm(dd: usize, nn: usize) -> Self::Mat {
        let rvec = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| rng.sample::<f32, _>(StandardNormal))
            .collect();

        DMatrix::<f32>::from_vec(dd, nn, rvec)
    }
}

impl<T> ConvertMatOps for DMatrix<T>
where
    T: WithDType + nalgebra::Scalar,
{
    type Mat = Self;
    type Scalar = T;

    fn from_tensor(x: &Tensor) -> PplResult<Self::Mat> {
        let (nrows, ncols) = x.dims2().map_err(|_| {
            PplError::invalid(format!("expected a 2D tensor, got {:?}", x.dims()))
        })?;
        let rows: Vec<Vec<T>> = x.to_dtype(T::DTYPE)?.to_vec2()?;
        Ok(DMatrix::<T>::from_row_iterator(
            nrows,
            ncols,
            rows.into_iter().flatten(),
        ))
    }

    fn to_tensor(&self, dev: &Device) -> PplResult<Tensor> {
        let (nrows, ncols) = self.shape();
        // row-major
        let data: Vec<T> = (0..nrows)
            .flat_map(|i| (0..ncols).map(move |j| self[(i, j)]))
            .collect();
        Ok(Tensor::from_vec(data, (nrows, ncols), dev)?)
    }
}
