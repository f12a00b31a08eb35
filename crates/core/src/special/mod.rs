mod density;
mod pbeta;
mod pgamma;
mod terms;

pub use density::{beta_density, gamma_density};
pub use pbeta::{
    beta_tails_with, regularized_incomplete_beta, regularized_incomplete_beta_complement,
    regularized_incomplete_beta_with,
};
pub use pgamma::{
    gamma_tails_with, regularized_lower_gamma, regularized_lower_gamma_with,
    regularized_upper_gamma,
};

pub(crate) use density::{beta_density_raw, gamma_density_raw};
pub(crate) use pbeta::beta_tails_split;
