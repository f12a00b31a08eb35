// Regularized incomplete beta ratio I_x(a, b). Both shapes >= 1 use the
// continued fraction in lambda = a - (a + b) x, expanded on whichever side of the
// mean x lies. Otherwise the classical fraction is used, reflected through
// I_x(a, b) = 1 - I_{1-x}(b, a) past (a + 1) / (a + b + 2).

use crate::error::{DiscretizeError, Result, positive, probability};
use crate::precision::Precision;
use crate::special::pgamma::{FRACTION_ULPS, MAX_TERMS, settle};
use crate::special::terms::beta_power_term;

// 2^-20, applied when n x (b - n) overflows for huge b.
const RESCALE: f64 = 9.536_743_164_062_5e-7;

pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> Result<f64> {
    regularized_incomplete_beta_with(Precision::global(), x, a, b)
}

pub fn regularized_incomplete_beta_with(prec: &Precision, x: f64, a: f64, b: f64) -> Result<f64> {
    Ok(beta_tails_with(prec, x, a, b)?.0)
}

pub fn regularized_incomplete_beta_complement(x: f64, a: f64, b: f64) -> Result<f64> {
    Ok(beta_tails_with(Precision::global(), x, a, b)?.1)
}

/// Returns `(I_x(a, b), 1 - I_x(a, b))` with the smaller tail evaluated directly.
pub fn beta_tails_with(prec: &Precision, x: f64, a: f64, b: f64) -> Result<(f64, f64)> {
    let a = positive("a", a)?;
    let b = positive("b", b)?;
    let x = probability("x", x)?;
    beta_tails_split(prec, x, 1.0 - x, a, b)
}

// `y` is 1 - x as the caller knows it, which can be far more precise than 1 - x
// recomputed from a rounded x near 1.
pub(crate) fn beta_tails_split(
    prec: &Precision,
    x: f64,
    y: f64,
    a: f64,
    b: f64,
) -> Result<(f64, f64)> {
    if x == 0.0 {
        return Ok((0.0, 1.0));
    }
    if y == 0.0 {
        return Ok((1.0, 0.0));
    }

    if a >= 1.0 && b >= 1.0 {
        let lambda = if x <= y {
            a - (a + b) * x
        } else {
            (a + b) * y - b
        };
        return if lambda >= 0.0 {
            let lower = lambda_fraction(prec, x, y, a, b, lambda)?;
            Ok((lower, 1.0 - lower))
        } else {
            let upper = lambda_fraction(prec, y, x, b, a, -lambda)?;
            Ok((1.0 - upper, upper))
        };
    }

    if x > (a + 1.0) / (a + b + 2.0) {
        let upper = fraction(prec, y, x, b, a)?;
        Ok((1.0 - upper, upper))
    } else {
        let lower = fraction(prec, x, y, a, b)?;
        Ok((lower, 1.0 - lower))
    }
}

// I_x(a, b) for a, b >= 1 and lambda = a - (a + b) x >= 0.
fn lambda_fraction(prec: &Precision, x: f64, y: f64, a: f64, b: f64, lambda: f64) -> Result<f64> {
    let front = beta_power_term(x, y, a, b);
    if front == 0.0 {
        return Ok(0.0);
    }

    let c = lambda + 1.0;
    let c0 = b / a;
    let c1 = 1.0 / a + 1.0;
    let yp1 = y + 1.0;

    let mut p = 1.0;
    let mut s = a + 1.0;
    let mut an = 0.0;
    let mut bn = 1.0;
    let mut anp1 = 1.0;
    let mut bnp1 = c / c1;
    let mut r = c1 / c;

    for n in 1..=MAX_TERMS {
        let n = n as f64;
        let mut w = n * x * (b - n);
        let rescale = !w.is_finite();
        if rescale {
            w = n * x * ((b - n) * RESCALE);
        }
        let t = n / a;
        let e = a / s;
        let alpha = p * (p + c0) * e * e * (w * x);
        let e = (t + 1.0) / (c1 + t + t);
        let tail = n + e * (c + n * yp1);
        let beta = w / s + if rescale { tail * RESCALE } else { tail };
        p = t + 1.0;
        s += 2.0;

        let t = alpha * an + beta * anp1;
        an = anp1;
        anp1 = t;
        let t = alpha * bn + beta * bnp1;
        bn = bnp1;
        bnp1 = t;

        let r0 = r;
        r = anp1 / bnp1;
        if (r - r0).abs() <= FRACTION_ULPS * prec.epsilon * r {
            return Ok(settle(prec, front * r));
        }

        an /= bnp1;
        bn /= bnp1;
        anp1 = r;
        bnp1 = 1.0;
    }

    Err(DiscretizeError::Convergence {
        routine: "incomplete beta lambda fraction",
        iterations: MAX_TERMS,
    })
}

// Partial numerator d_k of I_x(a, b) = front / (a (1 + d_1 / (1 + d_2 / (1 + ...)))).
fn numerator(k: usize, x: f64, a: f64, b: f64) -> f64 {
    let m = (k / 2) as f64;
    if k % 2 == 1 {
        -(a + m) * (a + b + m) * x / ((a + 2.0 * m) * (a + 2.0 * m + 1.0))
    } else {
        m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m))
    }
}

// Lentz finds how deep the fraction must go; the value itself is then summed
// back to front over that depth, which rounds less than Lentz's running product.
fn fraction(prec: &Precision, x: f64, y: f64, a: f64, b: f64) -> Result<f64> {
    let depth = fraction_depth(prec, x, a, b)?;
    let floor = prec.lentz_floor();
    let mut t = 1.0;
    for k in (1..=depth).rev() {
        t = 1.0 + numerator(k, x, a, b) / t;
        if t.abs() < floor {
            t = floor;
        }
    }
    Ok(settle(prec, beta_power_term(x, y, a, b) / (a * t)))
}

fn fraction_depth(prec: &Precision, x: f64, a: f64, b: f64) -> Result<usize> {
    let floor = prec.lentz_floor();
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < floor {
        d = floor;
    }
    d = 1.0 / d;

    for m in 1..=MAX_TERMS {
        let mf = m as f64;
        let m2 = 2.0 * mf;

        // even step
        let aa = mf * (b - mf) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < floor {
            d = floor;
        }
        c = 1.0 + aa / c;
        if c.abs() < floor {
            c = floor;
        }
        d = 1.0 / d;

        // odd step
        let aa = -(a + mf) * (qab + mf) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < floor {
            d = floor;
        }
        c = 1.0 + aa / c;
        if c.abs() < floor {
            c = floor;
        }
        d = 1.0 / d;

        if (d * c - 1.0).abs() <= FRACTION_ULPS * prec.epsilon {
            return Ok(2 * m + 1);
        }
    }

    Err(DiscretizeError::Convergence {
        routine: "incomplete beta continued fraction",
        iterations: MAX_TERMS,
    })
}
