use crate::error::{DiscretizeError, Result, positive};
use crate::special::terms::{beta_power_term, gamma_power_term};

// Unit-scale Gamma(shape) density.
pub fn gamma_density(x: f64, shape: f64) -> Result<f64> {
    let shape = positive("shape", shape)?;
    if x.is_nan() {
        return Err(DiscretizeError::InvalidParameter {
            name: "x",
            value: x,
            constraint: "a number",
        });
    }
    Ok(gamma_density_raw(x, shape))
}

pub fn beta_density(x: f64, a: f64, b: f64) -> Result<f64> {
    let a = positive("a", a)?;
    let b = positive("b", b)?;
    if x.is_nan() {
        return Err(DiscretizeError::InvalidParameter {
            name: "x",
            value: x,
            constraint: "a number",
        });
    }
    Ok(beta_density_raw(x, a, b))
}

// Shape already validated by the caller.
pub(crate) fn gamma_density_raw(x: f64, shape: f64) -> f64 {
    if x < 0.0 || x.is_infinite() {
        return 0.0;
    }
    if x == 0.0 {
        return if shape < 1.0 {
            f64::INFINITY
        } else if shape > 1.0 {
            0.0
        } else {
            1.0
        };
    }
    gamma_power_term(shape, x) / x
}

pub(crate) fn beta_density_raw(x: f64, a: f64, b: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return 0.0;
    }
    if x == 0.0 {
        if a < 1.0 {
            return f64::INFINITY;
        }
        if a > 1.0 {
            return 0.0;
        }
        // 1 / B(1, b)
        return b;
    }
    if x == 1.0 {
        if b < 1.0 {
            return f64::INFINITY;
        }
        if b > 1.0 {
            return 0.0;
        }
        return a;
    }

    let y = 1.0 - x;
    beta_power_term(x, y, a, b) / (x * y)
}
