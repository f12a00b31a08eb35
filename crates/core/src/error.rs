use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscretizeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscretizeError {
    #[error("invalid parameter `{name}` = {value}: must be {constraint}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        constraint: &'static str,
    },

    #[error("{routine} did not converge within {iterations} iterations")]
    Convergence {
        routine: &'static str,
        iterations: usize,
    },

    #[error("category rates sum to {total}; cannot normalize")]
    Normalization { total: f64 },

    // Internal: only reachable if bracket selection is wrong.
    #[error("target {target} is not bracketed by [{lo}, {hi}]")]
    RootNotBracketed { target: f64, lo: f64, hi: f64 },
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(DiscretizeError::InvalidParameter {
            name,
            value,
            constraint: "finite and > 0",
        })
    }
}

pub(crate) fn probability(name: &'static str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DiscretizeError::InvalidParameter {
            name,
            value,
            constraint: "in [0, 1]",
        })
    }
}
