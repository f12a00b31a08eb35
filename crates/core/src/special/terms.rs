// Leading factors x^a e^-x / Gamma(a) and x^a y^b / B(a, b) of the incomplete
// ratios and densities. Near the mode the exponent is a sum of large terms that
// cancel, so it is rebuilt from t - ln(1 + t) and Stirling's correction instead.

use std::f64::consts::PI;

const SQRT_2PI: f64 = 2.506_628_274_631_000_5;

// B_2k / (2k (2k - 1)), k = 1..=9
const STIRLING: [f64; 9] = [
    1.0 / 12.0,
    -1.0 / 360.0,
    1.0 / 1260.0,
    -1.0 / 1680.0,
    1.0 / 1188.0,
    -691.0 / 360_360.0,
    1.0 / 156.0,
    -3617.0 / 122_400.0,
    43_867.0 / 244_188.0,
];

// The asymptotic series is used from here up; smaller arguments are shifted.
const STIRLING_MIN: f64 = 10.0;

// Both callers of `odd_series` keep z <= 1/9, so 20 terms are past f64 resolution.
const SERIES_TERMS: usize = 20;

// sum_{j >= 0} z^j / (2j + 3)
fn odd_series(z: f64) -> f64 {
    (0..SERIES_TERMS)
        .rev()
        .fold(0.0, |acc, j| acc * z + 1.0 / (2 * j + 3) as f64)
}

/// ln Gamma(s) - ((s - 1/2) ln s - s + ln sqrt(2 pi)) for s >= 1.
pub(crate) fn stirling_error(s: f64) -> f64 {
    let mut s = s;
    let mut shift = 0.0;
    // error(s) - error(s + 1) = sum_{m >= 1} t^2m / (2m + 1), t = 1 / (2s + 1)
    while s < STIRLING_MIN {
        let t = 1.0 / (2.0 * s + 1.0);
        let t2 = t * t;
        shift += t2 * odd_series(t2);
        s += 1.0;
    }
    let z = 1.0 / (s * s);
    shift + STIRLING.iter().rev().fold(0.0, |acc, &c| acc * z + c) / s
}

// Gamma(s) for s >= 1.
fn gamma_from_one(s: f64) -> f64 {
    SQRT_2PI * ((s - 0.5) * s.ln() - s + stirling_error(s)).exp()
}

// t - ln(1 + t). `ln_ratio` supplies ln(1 + t) outside the series range, where
// the caller can usually form it more precisely than from t.
fn rlog1(t: f64, ln_ratio: impl FnOnce() -> f64) -> f64 {
    if (-0.5..=1.0).contains(&t) {
        let r = t / (2.0 + t);
        let r2 = r * r;
        r * t - 2.0 * r * r2 * odd_series(r2)
    } else {
        t - ln_ratio()
    }
}

/// x^shape e^-x / Gamma(shape) for finite x > 0.
pub(crate) fn gamma_power_term(shape: f64, x: f64) -> f64 {
    if shape < 1.0 {
        return (shape * x.ln() - x).exp() * shape / gamma_from_one(1.0 + shape);
    }
    let t = (x - shape) / shape;
    let d = rlog1(t, || (x / shape).ln());
    (shape / (2.0 * PI)).sqrt() * (-shape * d - stirling_error(shape)).exp()
}

/// x^a y^b / B(a, b) with y = 1 - x, both in (0, 1). Logs are taken of
/// whichever of x and y is the smaller, since that one carries full precision.
pub(crate) fn beta_power_term(x: f64, y: f64, a: f64, b: f64) -> f64 {
    let (ln_x, ln_y) = if x <= y {
        (x.ln(), (-x).ln_1p())
    } else {
        ((-y).ln_1p(), y.ln())
    };

    if a >= 1.0 && b >= 1.0 {
        let ab = a + b;
        let lambda = if x <= y { a - ab * x } else { ab * y - b };
        let u = rlog1(-lambda / a, || ln_x + (b / a).ln_1p());
        let v = rlog1(lambda / b, || ln_y + (a / b).ln_1p());
        let corr = stirling_error(a) + stirling_error(b) - stirling_error(ab);
        return (a * b / ab).sqrt() / SQRT_2PI * (-(a * u + b * v) - corr).exp();
    }

    if a < 1.0 && b < 1.0 {
        // B(a, b) = (a + b) / (a b) * Gamma(1 + a) Gamma(1 + b) / Gamma(1 + a + b)
        return (a * ln_x + b * ln_y).exp() * (a * b / (a + b)) * gamma_from_one(1.0 + a + b)
            / (gamma_from_one(1.0 + a) * gamma_from_one(1.0 + b));
    }

    if a < 1.0 {
        let ab = a + b;
        let e = a * (ln_x + ab.ln()) + b * ln_y + (b - 0.5) * (a / b).ln_1p() - a
            + stirling_error(ab)
            - stirling_error(b);
        return a / gamma_from_one(1.0 + a) * e.exp();
    }

    beta_power_term(y, x, b, a)
}
