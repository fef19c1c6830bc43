//! Small numeric helpers shared by the model backends.

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1), deterministic.
pub fn stddev_sample(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

/// Ordinary least squares over `(0..n, values)`.
///
/// Returns `(intercept, slope)`. Degenerates to `(mean, 0)` for fewer than
/// two points or a zero-variance index (cannot happen with 0..n, kept as a
/// guard).
pub fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 2 {
        return (mean(values), 0.0);
    }

    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        let dx = xs[i] - x_mean;
        sxy += dx * (values[i] - y_mean);
        sxx += dx * dx;
    }

    if sxx <= f64::EPSILON {
        return (y_mean, 0.0);
    }

    let slope = sxy / sxx;
    (y_mean - slope * x_mean, slope)
}

/// Two-sided z-score for a confidence level, from a fixed table with linear
/// interpolation. Inputs outside the table clamp to its ends.
pub fn z_for_confidence(confidence_level: f64) -> f64 {
    const TABLE: [(f64, f64); 5] = [
        (0.50, 0.6745),
        (0.80, 1.2816),
        (0.90, 1.6449),
        (0.95, 1.9600),
        (0.99, 2.5758),
    ];

    if confidence_level <= TABLE[0].0 {
        return TABLE[0].1;
    }
    for pair in TABLE.windows(2) {
        let (c0, z0) = pair[0];
        let (c1, z1) = pair[1];
        if confidence_level <= c1 {
            let t = (confidence_level - c0) / (c1 - c0);
            return z0 + t * (z1 - z0);
        }
    }
    TABLE[TABLE.len() - 1].1
}
