pub mod design;
pub mod dmatrix_util;
pub mod posterior;
pub mod traits;

pub use design::{batched_group_assignment, group_assignment_matrix, group_assignment_tensor};
pub use posterior::{analytic_posterior_cov, analytic_posterior_mean, prior_covariance_from_sd};
