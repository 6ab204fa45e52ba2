//! Probabilistic-programming primitives on candle tensors.
//!
//! A model or guide is an ordinary function that draws named random
//! variables through a [`Trace`] and, for guides, looks its learnable
//! parameters up in a [`ParamStore`]:
//!
//! ```ignore
//! use candle_util::ppl::{Distribution, Normal, ParamStore, Trace, Transform};
//!
//! let params = ParamStore::new();
//! let mut guide = Trace::new();
//! let m = params.param("w_mean", &zeros, Transform::Identity)?;
//! let s = params.param("w_scale", &ones, Transform::Softplus)?;
//! guide.sample("w", &Normal::new(&m, &s)?.to_event(1))?;
//!
//! // score the model at the guide's draw
//! let mut model = Trace::new().replay(&guide).condition("y", y);
//! ...
//! let elbo = (model.log_prob_sum()? - guide.log_prob_sum()?)?;
//! ```

pub mod distributions;
pub mod error;
pub mod param_store;
pub mod shape;
pub mod special;
pub mod trace;
pub mod transform;

pub use distributions::{Bernoulli, Distribution, Gamma, Independent, Normal};
pub use error::{ConfigWarning, PplError, PplResult};
pub use param_store::ParamStore;
pub use trace::{Site, Trace};
pub use transform::{softplus, Transform};
