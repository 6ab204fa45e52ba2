//! Distribution primitives with batched parameters.
//!
//! Parameters are broadcast against each other once, at construction, with
//! the checked rules in [`crate::ppl::shape`]. Every family reports the full
//! `batch ++ event` shape of its draws; [`Independent`] moves trailing batch
//! dimensions into the event so that `log_prob` sums over them.

mod bernoulli;
mod gamma;
mod independent;
mod normal;

pub use bernoulli::Bernoulli;
pub use gamma::Gamma;
pub use independent::Independent;
pub use normal::Normal;

use candle_core::Tensor;

use super::error::PplResult;

pub trait Distribution {
    /// Draw one value of shape [`Distribution::shape`]. Reparameterized
    /// families keep the draw attached to the parameters' graph.
    fn sample(&self) -> PplResult<Tensor>;

    /// Log density of `value`, reduced over the event dimensions.
    fn log_prob(&self, value: &Tensor) -> PplResult<Tensor>;

    /// `batch ++ event` shape of one draw
    fn shape(&self) -> &[usize];

    /// Number of trailing dimensions that belong to one event
    fn event_dims(&self) -> usize {
        0
    }

    /// Reinterpret the last `n` batch dimensions as event dimensions.
    fn to_event(self, n: usize) -> Independent<Self>
    where
        Self: Sized,
    {
        Independent::new(self, n)
    }
}
