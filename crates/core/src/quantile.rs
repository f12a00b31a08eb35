// Quantiles by bracketed root finding: Newton steps on the density while they
// stay inside the bracket and keep halving the miss, bisection otherwise.

use tracing::{debug, trace};

use crate::error::{DiscretizeError, Result, positive, probability};
use crate::precision::Precision;
use crate::special::{beta_density_raw, beta_tails_with, gamma_density_raw, gamma_tails_with};

pub(crate) const MAX_STEPS: usize = 2_000;
const MAX_DOUBLINGS: usize = 1_100;
const MAX_NEWTON_STALLS: usize = 4;

// Bisect in log space while the bracket spans more than this ratio.
const GEOMETRIC_RATIO: f64 = 4.0;
// First trial point when the bracket starts at 0.
const ZERO_TRIAL: f64 = 2.328_306_436_538_696_3e-10; // 2^-32

/// Finds `x` in `[lo, hi]` with `cdf(x) ≈ target`.
///
/// `cdf` must be non-decreasing on the bracket and `cdf(lo) <= target <= cdf(hi)`.
/// `density`, when given, is the derivative of `cdf` and enables Newton steps.
pub fn invert<F>(
    prec: &Precision,
    cdf: F,
    density: Option<&dyn Fn(f64) -> f64>,
    target: f64,
    lo: f64,
    hi: f64,
) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    invert_capped(prec, cdf, density, target, (lo, hi), MAX_STEPS)
}

fn invert_capped<F>(
    prec: &Precision,
    cdf: F,
    density: Option<&dyn Fn(f64) -> f64>,
    target: f64,
    (lo, hi): (f64, f64),
    max_steps: usize,
) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    let not_bracketed = DiscretizeError::RootNotBracketed { target, lo, hi };
    if target.is_nan() || lo.is_nan() || hi.is_nan() || lo > hi {
        return Err(not_bracketed);
    }
    let f_lo = cdf(lo)?;
    let f_hi = cdf(hi)?;
    if !(f_lo <= target && target <= f_hi) {
        return Err(not_bracketed);
    }
    if f_lo == target {
        return Ok(lo);
    }
    if f_hi == target {
        return Ok(hi);
    }

    let (mut lo, mut hi) = (lo, hi);
    let tolerance = 2.0 * prec.epsilon * target.abs().max(prec.tiny);
    let mut newton = density.is_some();
    let mut stalls = 0;
    let mut last_was_newton = false;
    let mut last_miss = f64::INFINITY;
    let mut x = midpoint(lo, hi);

    for step in 0..max_steps {
        let miss = cdf(x)? - target;
        trace!(step, x, miss, lo, hi, "quantile step");
        if miss.abs() <= tolerance {
            return Ok(x);
        }
        if miss < 0.0 {
            lo = x;
        } else {
            hi = x;
        }
        if prec.collapsed(lo, hi) {
            return Ok(x);
        }

        let stalled = last_was_newton && miss.abs() > 0.5 * last_miss;
        if stalled {
            stalls += 1;
            if newton && stalls >= MAX_NEWTON_STALLS {
                debug!(step, x, "newton refinement stalled, bisecting from here on");
                newton = false;
            }
        }
        last_miss = miss.abs();

        let newton_step = match density {
            Some(density) if newton && !stalled => {
                let slope = density(x);
                let candidate = x - miss / slope;
                (slope.is_finite() && slope > 0.0 && candidate > lo && candidate < hi)
                    .then_some(candidate)
            }
            _ => None,
        };
        last_was_newton = newton_step.is_some();
        x = newton_step.unwrap_or_else(|| midpoint(lo, hi));
        if x <= lo || x >= hi {
            // No representable point left strictly inside the bracket.
            return Ok(if miss < 0.0 { hi } else { lo });
        }
    }

    Err(DiscretizeError::Convergence {
        routine: "quantile inversion",
        iterations: max_steps,
    })
}

fn midpoint(lo: f64, hi: f64) -> f64 {
    if lo == 0.0 && hi > 0.0 {
        hi * ZERO_TRIAL
    } else if lo > 0.0 && hi > GEOMETRIC_RATIO * lo {
        lo.sqrt() * hi.sqrt()
    } else {
        lo + 0.5 * (hi - lo)
    }
}

/// Quantile of Gamma(shape `alpha`, rate `beta`).
pub fn gamma_quantile(p: f64, alpha: f64, beta: f64) -> Result<f64> {
    gamma_quantile_with(Precision::global(), p, alpha, beta)
}

pub fn gamma_quantile_with(prec: &Precision, p: f64, alpha: f64, beta: f64) -> Result<f64> {
    let alpha = positive("alpha", alpha)?;
    let beta = positive("beta", beta)?;
    let p = probability("p", p)?;
    Ok(unit_gamma_quantile(prec, p, alpha)? / beta)
}

pub fn chi_squared_quantile(p: f64, df: f64) -> Result<f64> {
    let df = positive("df", df)?;
    let p = probability("p", p)?;
    Ok(2.0 * unit_gamma_quantile(Precision::global(), p, 0.5 * df)?)
}

// Quantile of the unit-scale Gamma(shape); arguments already validated.
pub(crate) fn unit_gamma_quantile(prec: &Precision, p: f64, shape: f64) -> Result<f64> {
    if p == 0.0 {
        return Ok(0.0);
    }
    if p == 1.0 {
        return Ok(f64::INFINITY);
    }

    let lower_half = p <= 0.5;
    let hi = gamma_bracket(prec, p, shape, MAX_DOUBLINGS)?;

    let density = |x: f64| gamma_density_raw(x, shape);
    if lower_half {
        invert(
            prec,
            |x| Ok(gamma_tails_with(prec, shape, x)?.0),
            Some(&density),
            p,
            0.0,
            hi,
        )
    } else {
        // -Q is non-decreasing and keeps the small upper tail exact.
        invert(
            prec,
            |x| Ok(-gamma_tails_with(prec, shape, x)?.1),
            Some(&density),
            -(1.0 - p),
            0.0,
            hi,
        )
    }
}

// Doubles the upper end from shape + 1 until it holds probability p below it.
fn gamma_bracket(prec: &Precision, p: f64, shape: f64, max_doublings: usize) -> Result<f64> {
    let lower_half = p <= 0.5;
    let mut hi = shape + 1.0;
    let mut doublings = 0;
    loop {
        let (lower, upper) = gamma_tails_with(prec, shape, hi)?;
        if (lower_half && lower >= p) || (!lower_half && upper <= 1.0 - p) {
            break;
        }
        if doublings == max_doublings {
            return Err(DiscretizeError::Convergence {
                routine: "gamma quantile bracket",
                iterations: max_doublings,
            });
        }
        hi *= 2.0;
        doublings += 1;
    }
    if doublings > 0 {
        debug!(shape, p, hi, doublings, "widened gamma quantile bracket");
    }
    Ok(hi)
}

pub fn beta_quantile(p: f64, a: f64, b: f64) -> Result<f64> {
    beta_quantile_with(Precision::global(), p, a, b)
}

/// Roots above 1/2 are found for `I_y(b, a) = 1 - p` and returned as `1 - y`,
/// which keeps the small distance to 1 accurate. Roots below 1/2 are solved
/// directly so that their own small magnitude survives.
pub fn beta_quantile_with(prec: &Precision, p: f64, a: f64, b: f64) -> Result<f64> {
    let a = positive("a", a)?;
    let b = positive("b", b)?;
    let p = probability("p", p)?;
    Ok(beta_quantile_pair(prec, p, a, b)?.0)
}

// (x, 1 - x), each at full relative precision; arguments already validated.
pub(crate) fn beta_quantile_pair(prec: &Precision, p: f64, a: f64, b: f64) -> Result<(f64, f64)> {
    if p == 0.0 {
        return Ok((0.0, 1.0));
    }
    if p == 1.0 {
        return Ok((1.0, 0.0));
    }

    let (at_half, _) = beta_tails_with(prec, 0.5, a, b)?;
    if p <= at_half {
        let x = beta_root(prec, p, a, b)?;
        Ok((x, 1.0 - x))
    } else {
        let y = beta_root(prec, 1.0 - p, b, a)?;
        Ok((1.0 - y, y))
    }
}

// The root lies below 1/2, but the bracket spans the whole support so that
// rounding in I_{1/2} can never leave it unbracketed.
fn beta_root(prec: &Precision, p: f64, a: f64, b: f64) -> Result<f64> {
    let density = |x: f64| beta_density_raw(x, a, b);
    if p <= 0.5 {
        invert(
            prec,
            |x| Ok(beta_tails_with(prec, x, a, b)?.0),
            Some(&density),
            p,
            0.0,
            1.0,
        )
    } else {
        invert(
            prec,
            |x| Ok(-beta_tails_with(prec, x, a, b)?.1),
            Some(&density),
            -(1.0 - p),
            0.0,
            1.0,
        )
    }
}
