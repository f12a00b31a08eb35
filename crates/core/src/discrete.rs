// Equal-probability discretization of Gamma and Beta rate distributions.
//
// Category k (1-based) of n covers cumulative probability [(k-1)/n, k/n]. Its
// rate is either the quantile at (2k-1)/(2n) (median) or the conditional mean
// n * E[X; c_{k-1} < X <= c_k] (mean). Rates are rescaled to average exactly 1.

use ndarray::Array1;
use rayon::prelude::*;
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::error::{DiscretizeError, Result, positive};
use crate::precision::Precision;
use crate::quantile::{beta_quantile_pair, unit_gamma_quantile};
use crate::special::{beta_tails_split, gamma_tails_with};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Family {
    #[strum(serialize = "gamma", serialize = "g", to_string = "gamma")]
    Gamma,
    #[strum(serialize = "beta", serialize = "b", to_string = "beta")]
    Beta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Mode {
    #[default]
    #[strum(serialize = "mean", to_string = "mean")]
    Mean,
    #[strum(serialize = "median", to_string = "median")]
    Median,
}

impl Mode {
    pub fn from_median(median: bool) -> Self {
        if median { Mode::Median } else { Mode::Mean }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Shape `alpha`, rate `beta`. Discretized on the mean-1 scale (rate = alpha);
    /// `beta` only sets the natural mean `alpha / beta`.
    Gamma { alpha: f64, beta: f64 },
    Beta { a: f64, b: f64 },
}

impl Distribution {
    pub fn new(family: Family, a: f64, b: f64) -> Self {
        match family {
            Family::Gamma => Distribution::Gamma { alpha: a, beta: b },
            Family::Beta => Distribution::Beta { a, b },
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Distribution::Gamma { .. } => Family::Gamma,
            Distribution::Beta { .. } => Family::Beta,
        }
    }

    pub fn params(&self) -> (f64, f64) {
        match *self {
            Distribution::Gamma { alpha, beta } => (alpha, beta),
            Distribution::Beta { a, b } => (a, b),
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Gamma { alpha, beta } => alpha / beta,
            Distribution::Beta { a, b } => a / (a + b),
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Distribution::Gamma { alpha, beta } => {
                positive("alpha", alpha)?;
                positive("beta", beta)?;
            }
            Distribution::Beta { a, b } => {
                positive("a", a)?;
                positive("b", b)?;
            }
        }
        Ok(())
    }

    // Everything below works on the scale the cutpoints are reported on.

    fn support_max(&self) -> f64 {
        match self {
            Distribution::Gamma { .. } => f64::INFINITY,
            Distribution::Beta { .. } => 1.0,
        }
    }

    fn scale_mean(&self) -> f64 {
        match *self {
            Distribution::Gamma { .. } => 1.0,
            Distribution::Beta { a, b } => a / (a + b),
        }
    }

    fn quantile(&self, prec: &Precision, p: f64) -> Result<f64> {
        Ok(self.cut(prec, p)?.0)
    }

    // Quantile plus its distance to the top of the support. Gamma has no finite
    // top and reports infinity.
    fn cut(&self, prec: &Precision, p: f64) -> Result<(f64, f64)> {
        match *self {
            Distribution::Gamma { alpha, .. } => {
                Ok((unit_gamma_quantile(prec, p, alpha)? / alpha, f64::INFINITY))
            }
            Distribution::Beta { a, b } => beta_quantile_pair(prec, p, a, b),
        }
    }

    // Lower and upper tails of the size-biased distribution x f(x) / mean at a cut,
    // i.e. E[X; X <= x] / E[X] and its complement.
    fn moment_tails(&self, prec: &Precision, (x, headroom): (f64, f64)) -> Result<(f64, f64)> {
        match *self {
            Distribution::Gamma { alpha, .. } => gamma_tails_with(prec, alpha + 1.0, alpha * x),
            Distribution::Beta { a, b } => beta_tails_split(prec, x, headroom, a + 1.0, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discretization {
    pub distribution: Distribution,
    pub mode: Mode,
    /// One rate per category, averaging 1.
    pub rates: Array1<f64>,
    /// The n - 1 interior category boundaries, strictly increasing in exact
    /// arithmetic. For strongly left-skewed Beta shapes the top boundaries can
    /// lie closer to 1 than f64 resolves and round onto 1.0; `headroom` keeps
    /// them apart.
    pub cutpoints: Array1<f64>,
    /// Distance from each cutpoint to the top of the support: 1 - c for Beta,
    /// carried at full relative precision, and infinite for Gamma.
    pub headroom: Array1<f64>,
}

impl Discretization {
    pub fn categories(&self) -> usize {
        self.rates.len()
    }

    // Rates rescaled to the distribution's own mean.
    pub fn category_values(&self) -> Array1<f64> {
        &self.rates * self.distribution.mean()
    }

    // (rates, cutpoints)
    pub fn into_parts(self) -> (Array1<f64>, Array1<f64>) {
        (self.rates, self.cutpoints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub distribution: Distribution,
    pub categories: usize,
    pub mode: Mode,
}

impl Request {
    pub fn new(distribution: Distribution, categories: usize, mode: Mode) -> Self {
        Self {
            distribution,
            categories,
            mode,
        }
    }
}

pub fn discrete_gamma_rates(
    alpha: f64,
    beta: f64,
    n: usize,
    median: bool,
) -> Result<Discretization> {
    discretize(Distribution::Gamma { alpha, beta }, n, Mode::from_median(median))
}

pub fn discrete_beta_rates(a: f64, b: f64, n: usize, median: bool) -> Result<Discretization> {
    discretize(Distribution::Beta { a, b }, n, Mode::from_median(median))
}

pub fn discretize(distribution: Distribution, n: usize, mode: Mode) -> Result<Discretization> {
    discretize_with(Precision::global(), distribution, n, mode)
}

// Requests are independent; results come back in input order.
pub fn discretize_batch(requests: &[Request]) -> Vec<Result<Discretization>> {
    let prec = Precision::global();
    requests
        .par_iter()
        .map(|r| discretize_with(prec, r.distribution, r.categories, r.mode))
        .collect()
}

pub fn discretize_with(
    prec: &Precision,
    distribution: Distribution,
    n: usize,
    mode: Mode,
) -> Result<Discretization> {
    distribution.validate()?;
    if n < 1 {
        return Err(DiscretizeError::InvalidParameter {
            name: "n",
            value: n as f64,
            constraint: ">= 1",
        });
    }
    debug!(
        family = %distribution.family(),
        params = ?distribution.params(),
        n,
        mode = %mode,
        "discretizing"
    );

    if n == 1 {
        return Ok(Discretization {
            distribution,
            mode,
            rates: Array1::ones(1),
            cutpoints: Array1::zeros(0),
            headroom: Array1::zeros(0),
        });
    }

    let k = n as f64;
    let cuts = (1..n)
        .map(|i| distribution.cut(prec, i as f64 / k))
        .collect::<Result<Vec<(f64, f64)>>>()?;
    let (cutpoints, headroom): (Vec<f64>, Vec<f64>) = cuts.iter().copied().unzip();

    let mut rates = match mode {
        Mode::Median => (0..n)
            .map(|i| distribution.quantile(prec, (2 * i + 1) as f64 / (2.0 * k)))
            .collect::<Result<Vec<f64>>>()?,
        Mode::Mean => conditional_means(prec, &distribution, &cuts)?,
    };

    normalize(&mut rates)?;

    Ok(Discretization {
        distribution,
        mode,
        rates: Array1::from(rates),
        cutpoints: Array1::from(cutpoints),
        headroom: Array1::from(headroom),
    })
}

// Rescales the rates in place to average exactly 1.
fn normalize(rates: &mut [f64]) -> Result<()> {
    let total: f64 = rates.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(DiscretizeError::Normalization { total });
    }
    let scale = rates.len() as f64 / total;
    rates.iter_mut().for_each(|r| *r *= scale);
    Ok(())
}

// Stand-in for a conditional mean that rounding pushed outside [lower, upper].
fn category_fallback(median: f64, lower: f64, upper: f64) -> f64 {
    if (lower..=upper).contains(&median) {
        median
    } else if upper.is_finite() {
        0.5 * (lower + upper)
    } else {
        median.max(lower)
    }
}

fn conditional_means(
    prec: &Precision,
    distribution: &Distribution,
    cuts: &[(f64, f64)],
) -> Result<Vec<f64>> {
    let n = cuts.len() + 1;
    let k = n as f64;
    let mean = distribution.scale_mean();

    let mut tails = Vec::with_capacity(n + 1);
    tails.push((0.0, 1.0));
    for &cut in cuts {
        tails.push(distribution.moment_tails(prec, cut)?);
    }
    tails.push((1.0, 0.0));

    let mut means = Vec::with_capacity(n);
    for i in 0..n {
        let (lower_lo, upper_lo) = tails[i];
        let (lower_hi, upper_hi) = tails[i + 1];
        // Subtract on the side where both tails are small.
        let mass = if lower_lo > 0.5 {
            upper_lo - upper_hi
        } else {
            lower_hi - lower_lo
        };
        let mut value = k * mean * mass;

        let lower = if i == 0 { 0.0 } else { cuts[i - 1].0 };
        let upper = if i + 1 == n {
            distribution.support_max()
        } else {
            cuts[i].0
        };
        if value < lower || value > upper {
            let median = distribution.quantile(prec, (2 * i + 1) as f64 / (2.0 * k))?;
            let corrected = category_fallback(median, lower, upper);
            debug!(
                category = i,
                value, lower, upper, corrected, "conditional mean outside its interval"
            );
            value = corrected;
        }
        means.push(value);
    }
    Ok(means)
}
