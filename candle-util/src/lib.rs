pub mod ppl;

pub use candle_core;
pub use candle_nn;
