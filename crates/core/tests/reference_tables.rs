use discrates::{
    Distribution, Family, Mode, discrete_beta_rates, discrete_gamma_rates, discretize,
};

type Case = (usize, f64, f64, bool);

// (n, a, b, median) as used by the historical driver.
const CASES: [Case; 6] = [
    (4, 0.5, 10.0, false),
    (4, 0.5, 10.0, true),
    (8, 2.0, 0.1, false),
    (7, 15.0, 1.0, true),
    (4, 1.16, 3.54, false),
    (4, 1.16, 3.54, true),
];

// Category values on the distribution's own scale, printed to six decimals.
const GAMMA_VALUES: [&[f64]; 6] = [
    &[0.001669, 0.012596, 0.041013, 0.144721],
    &[0.001454, 0.014036, 0.046239, 0.138272],
    &[3.848344, 7.882645, 11.320993, 14.879554, 18.906079, 23.893507, 31.028044, 48.240834],
    &[9.793787, 11.891047, 13.362596, 14.722906, 16.172736, 17.973174, 21.083754],
    &[0.054962, 0.170420, 0.334948, 0.750405],
    &[0.059239, 0.182032, 0.355645, 0.713819],
];

const BETA_VALUES: [&[f64]; 6] = [
    &[0.001709, 0.012818, 0.041099, 0.134851],
    &[0.001449, 0.013916, 0.045204, 0.129907],
    &[0.687057, 0.943958, 0.989629, 0.998540, 0.999869, 0.999994, 1.000000, 1.000000],
    &[0.836482, 0.900046, 0.931225, 0.952350, 0.968440, 0.981483, 0.992475],
    &[0.051967, 0.153129, 0.278436, 0.503702],
    &[0.053942, 0.156970, 0.284438, 0.491883],
];

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn assert_values(label: &str, case: &Case, actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{label} {case:?}: length");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        // six printed decimals, plus slack for the reference's own quantile tolerance
        let tol = 2e-6 * e.abs().max(1.0);
        assert!(
            approx_eq(*a, *e, tol),
            "{label} {case:?}: category {i} got {a:.8} expected {e:.6}\n  all: {actual:?}"
        );
    }
}

fn assert_mean_one(rates: &[f64]) {
    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    // ten units of 2^-53
    assert!(approx_eq(mean, 1.0, 5.0 * f64::EPSILON), "mean of rates is {mean:.17}");
}

#[test]
fn gamma_reference_table() {
    for (case, expected) in CASES.iter().zip(GAMMA_VALUES) {
        let (n, a, b, median) = *case;
        let d = discrete_gamma_rates(a, b, n, median).expect("gamma discretization");
        assert_eq!(d.cutpoints.len(), n - 1);
        assert_mean_one(d.rates.as_slice().unwrap());
        assert_values("gamma", case, d.category_values().as_slice().unwrap(), expected);
    }
}

#[test]
fn beta_reference_table() {
    for (case, expected) in CASES.iter().zip(BETA_VALUES) {
        let (n, a, b, median) = *case;
        let d = discrete_beta_rates(a, b, n, median).expect("beta discretization");
        assert_eq!(d.cutpoints.len(), n - 1);
        assert_mean_one(d.rates.as_slice().unwrap());
        assert_values("beta", case, d.category_values().as_slice().unwrap(), expected);
    }
}

#[test]
fn gamma_rate_parameter_only_moves_the_mean() {
    let a = discrete_gamma_rates(0.5, 10.0, 4, false).unwrap();
    let b = discrete_gamma_rates(0.5, 0.5, 4, false).unwrap();
    for (x, y) in a.rates.iter().zip(b.rates.iter()) {
        assert!(approx_eq(*x, *y, 1e-15));
    }
    for (x, y) in a.cutpoints.iter().zip(b.cutpoints.iter()) {
        assert!(approx_eq(*x, *y, 1e-15));
    }
}

// Exponential (alpha = 1): c_k = -ln(1 - k/n), and the conditional mean over
// [l, u] is n * ((l + 1) e^-l - (u + 1) e^-u).
#[test]
fn exponential_closed_form() {
    let n = 5;
    let d = discretize(Distribution::Gamma { alpha: 1.0, beta: 1.0 }, n, Mode::Mean).unwrap();
    let bounds: Vec<f64> = (0..=n)
        .map(|k| {
            if k == n {
                f64::INFINITY
            } else {
                -(1.0 - k as f64 / n as f64).ln()
            }
        })
        .collect();
    for k in 1..n {
        assert!(approx_eq(d.cutpoints[k - 1], bounds[k], 1e-12), "cutpoint {k}");
    }
    let tail = |x: f64| if x.is_infinite() { 0.0 } else { (x + 1.0) * (-x).exp() };
    for i in 0..n {
        let expected = n as f64 * (tail(bounds[i]) - tail(bounds[i + 1]));
        assert!(approx_eq(d.rates[i], expected, 1e-12), "rate {i}: {} vs {expected}", d.rates[i]);
    }
}

// Uniform (Beta(1, 1)): cutpoints k/n, median rates (2i - 1)/n after rescaling by the mean 1/2.
#[test]
fn uniform_closed_form() {
    let n = 6;
    for mode in [Mode::Mean, Mode::Median] {
        let d = discretize(Distribution::Beta { a: 1.0, b: 1.0 }, n, mode).unwrap();
        for k in 1..n {
            assert!(approx_eq(d.cutpoints[k - 1], k as f64 / n as f64, 1e-14));
        }
        for i in 0..n {
            let expected = (2 * i + 1) as f64 / n as f64;
            assert!(approx_eq(d.rates[i], expected, 1e-13), "{mode}: rate {i}");
        }
    }
}

#[test]
fn single_category_is_degenerate() {
    for family in [Family::Gamma, Family::Beta] {
        for mode in [Mode::Mean, Mode::Median] {
            let d = discretize(Distribution::new(family, 2.5, 0.7), 1, mode).unwrap();
            assert_eq!(d.rates.to_vec(), vec![1.0]);
            assert!(d.cutpoints.is_empty());
        }
    }
}

// Beta(15, 0.1) piles its mass against 1: the upper boundaries round onto 1.0
// while their distances to 1 stay distinct.
#[test]
fn skewed_beta_keeps_boundaries_apart_through_headroom() {
    let n = 40;
    let d = discretize(Distribution::Beta { a: 15.0, b: 0.1 }, n, Mode::Mean).unwrap();
    assert_eq!(d.headroom.len(), n - 1);
    assert!(d.cutpoints.iter().any(|&c| c == 1.0), "{:?}", d.cutpoints);
    for w in d.cutpoints.as_slice().unwrap().windows(2) {
        assert!(w[0] <= w[1], "{:?}", d.cutpoints);
    }
    for w in d.headroom.as_slice().unwrap().windows(2) {
        assert!(w[0] > w[1], "{:?}", d.headroom);
    }
    assert!(d.headroom.iter().all(|&h| h > 0.0 && h < 1.0));
    for (c, h) in d.cutpoints.iter().zip(d.headroom.iter()) {
        assert!((c + h - 1.0).abs() <= f64::EPSILON);
    }
}

#[test]
fn gamma_headroom_is_unbounded() {
    let d = discrete_gamma_rates(0.5, 10.0, 4, false).unwrap();
    assert!(d.headroom.iter().all(|h| h.is_infinite()));
    let d = discrete_gamma_rates(0.5, 10.0, 1, false).unwrap();
    assert!(d.headroom.is_empty());
}
