use discrates::{
    DiscretizeError, Distribution, Family, Mode, Request, discrete_gamma_rates, discretize,
    discretize_batch,
};

const EPS: f64 = f64::EPSILON / 2.0;

// exp(ln 0.005), exp(ln 0.005 + 0.5), ... up to 100
fn shape_grid() -> Vec<f64> {
    let mut out = Vec::new();
    let mut s = 0.005f64.ln();
    while s <= 100.0f64.ln() {
        out.push(s.exp());
        s += 0.5;
    }
    out
}

fn all_in_range(values: &[f64], min: f64, max: f64) -> bool {
    values.iter().all(|v| v.is_finite() && *v >= min && *v <= max)
}

#[test]
fn beta_values_stay_in_unit_range() {
    let grid = shape_grid();
    let mut requests = Vec::new();
    for &a in &grid {
        for &b in &grid {
            for n in 2..=10 {
                for mode in [Mode::Mean, Mode::Median] {
                    requests.push(Request::new(Distribution::Beta { a, b }, n, mode));
                }
            }
        }
    }

    let results = discretize_batch(&requests);
    assert_eq!(results.len(), requests.len());
    for (req, result) in requests.iter().zip(results) {
        let d = result.unwrap_or_else(|e| panic!("{req:?}: {e}"));
        assert_eq!(d.categories(), req.categories, "{req:?}");
        // Median categories are rescaled to the mean and may exceed 1. Mean
        // categories only move by the rescaling that follows boundary corrections
        // where cutpoints round onto 1.
        let upper = match req.mode {
            Mode::Mean => 1.0 + 1e-3,
            Mode::Median => 1.5,
        };
        let values = d.category_values().to_vec();
        assert!(
            all_in_range(&values, 0.0, upper),
            "{req:?}: values out of [0, {upper}]: {values:?}"
        );
        assert!(all_in_range(d.cutpoints.as_slice().unwrap(), 0.0, 1.0), "{req:?}");
    }
}

#[test]
fn gamma_rates_are_finite_over_shape_grid() {
    let requests: Vec<Request> = shape_grid()
        .into_iter()
        .flat_map(|alpha| {
            (2..=10).flat_map(move |n| {
                [Mode::Mean, Mode::Median].into_iter().map(move |mode| {
                    Request::new(Distribution::Gamma { alpha, beta: alpha }, n, mode)
                })
            })
        })
        .collect();

    for (req, result) in requests.iter().zip(discretize_batch(&requests)) {
        let d = result.unwrap_or_else(|e| panic!("{req:?}: {e}"));
        let mean = d.rates.sum() / d.categories() as f64;
        assert!((mean - 1.0).abs() <= 10.0 * EPS, "{req:?}: mean {mean}");
        assert!(
            all_in_range(d.rates.as_slice().unwrap(), 0.0, f64::MAX),
            "{req:?}: {:?}",
            d.rates
        );
    }
}

#[test]
fn batch_keeps_order_and_isolates_failures() {
    let requests = [
        Request::new(Distribution::Gamma { alpha: 0.5, beta: 0.5 }, 4, Mode::Mean),
        Request::new(Distribution::Beta { a: -1.0, b: 2.0 }, 4, Mode::Mean),
        Request::new(Distribution::Beta { a: 1.16, b: 3.54 }, 4, Mode::Median),
        Request::new(Distribution::Gamma { alpha: 2.0, beta: 2.0 }, 0, Mode::Median),
    ];
    let results = discretize_batch(&requests);

    let first = results[0].as_ref().unwrap();
    assert_eq!(first, &discretize(requests[0].distribution, 4, Mode::Mean).unwrap());
    assert!(matches!(
        results[1],
        Err(DiscretizeError::InvalidParameter { name: "a", .. })
    ));
    assert_eq!(results[2].as_ref().unwrap().distribution.family(), Family::Beta);
    assert!(matches!(
        results[3],
        Err(DiscretizeError::InvalidParameter { name: "n", .. })
    ));
}

#[test]
fn invalid_shapes_are_rejected_up_front() {
    let cases = [
        (0.0, 1.0),
        (-2.0, 1.0),
        (1.0, 0.0),
        (f64::NAN, 1.0),
        (f64::INFINITY, 1.0),
    ];
    for (alpha, beta) in cases {
        let err = discrete_gamma_rates(alpha, beta, 4, false).unwrap_err();
        assert!(
            matches!(err, DiscretizeError::InvalidParameter { .. }),
            "{alpha}, {beta}: {err}"
        );
    }
}

#[test]
fn modes_and_families_parse_case_insensitively() {
    assert_eq!("Median".parse::<Mode>().unwrap(), Mode::Median);
    assert_eq!("MEAN".parse::<Mode>().unwrap(), Mode::Mean);
    assert_eq!("Gamma".parse::<Family>().unwrap(), Family::Gamma);
    assert_eq!("b".parse::<Family>().unwrap(), Family::Beta);
    assert_eq!(Mode::Median.to_string(), "median");
    assert_eq!(Family::Beta.to_string(), "beta");
    assert!("mode".parse::<Mode>().is_err());
}
