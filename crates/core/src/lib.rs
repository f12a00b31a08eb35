pub mod discrete;
pub mod error;
pub mod precision;
pub mod quantile;
pub mod special;

pub use discrete::{
    Discretization, Distribution, Family, Mode, Request, discrete_beta_rates,
    discrete_gamma_rates, discretize, discretize_batch, discretize_with,
};
pub use error::{DiscretizeError, Result};
pub use precision::Precision;
pub use quantile::{
    beta_quantile, beta_quantile_with, chi_squared_quantile, gamma_quantile, gamma_quantile_with,
    invert,
};
pub use special::{
    beta_density, gamma_density, regularized_incomplete_beta,
    regularized_incomplete_beta_complement, regularized_lower_gamma, regularized_upper_gamma,
};
