use super::EstimatorError;
use super::polyfit::{Polynomial, extrema};

/// Activation and reaction free energy read from one profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barriers {
    pub activation: f64,
    pub reaction: f64,
}

/// Mean, spread and standard error of a set of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub sem: f64,
    pub count: usize,
}

impl Summary {
    /// Mean with the sample standard deviation (zero for a single value).
    pub fn sample(values: &[f64]) -> Option<Self> {
        let (n, mean) = mean(values)?;
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Some(Self {
            mean,
            std,
            sem: std / n.sqrt(),
            count: values.len(),
        })
    }

    /// Mean with the population standard deviation.
    pub fn population(values: &[f64]) -> Option<Self> {
        let (n, mean) = mean(values)?;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        Some(Self {
            mean,
            std,
            sem: std / n.sqrt(),
            count: values.len(),
        })
    }
}

fn mean(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    Some((n, values.iter().sum::<f64>() / n))
}

/// Reads barriers from a raw profile by walking downhill from both ends.
///
/// The reactant minimum is searched in the first half of the profile, walking right from
/// the first point until the value rises; the product minimum walking left from the last
/// point until the value rises. The transition state is the maximum between them.
pub fn walk_barriers(y: &[f64]) -> Result<Barriers, EstimatorError> {
    if y.len() < 3 {
        return Err(EstimatorError::TooFewPoints {
            needed: 3,
            found: y.len(),
        });
    }
    let half = y.len() / 2;

    let rs = (0..half)
        .find(|&i| y[i + 1] > y[i])
        .ok_or(EstimatorError::MissingMinimum("reactant"))?;
    let ps = (rs + 1..y.len())
        .rev()
        .find(|&i| y[i - 1] > y[i])
        .ok_or(EstimatorError::MissingMinimum("product"))?;

    let ts = y[rs..=ps].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(Barriers {
        activation: ts - y[rs],
        reaction: y[ps] - y[rs],
    })
}

/// Reads barriers from a profile split at its midpoint: the reactant minimum is the lowest
/// point of the first half, the product minimum the lowest point of the second half and
/// the transition state the highest point from the reactant minimum up to, but excluding,
/// the product minimum. Ties resolve to the first occurrence.
pub fn split_barriers(y: &[f64]) -> Result<Barriers, EstimatorError> {
    if y.len() < 2 {
        return Err(EstimatorError::TooFewPoints {
            needed: 2,
            found: y.len(),
        });
    }
    let half = y.len() / 2;
    let rs = lowest(&y[..half]);
    let ps = half + lowest(&y[half..]);

    let ts = y[rs..ps].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(Barriers {
        activation: ts - y[rs],
        reaction: y[ps] - y[rs],
    })
}

fn lowest(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v < values[best] { i } else { best })
}

/// Outcome of fitting one profile.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Accepted(Barriers),
    /// The fitted curve does not show exactly two minima and one maximum.
    Rejected { minima: usize, maxima: usize },
}

/// Fits a polynomial to a profile, trims the ends of the fitted curve and reads the
/// barriers from its extrema.
pub fn fit_barriers(
    x: &[f64],
    y: &[f64],
    degree: usize,
    left: usize,
    right: usize,
) -> Result<FitOutcome, EstimatorError> {
    let poly = Polynomial::fit(x, y, degree)?;
    let n = x.len().min(y.len());
    let end = n.saturating_sub(right);
    if left >= end {
        return Err(EstimatorError::TooFewPoints {
            needed: left + right + 1,
            found: n,
        });
    }

    let xs = &x[left..end];
    let fitted: Vec<f64> = xs.iter().map(|&v| poly.eval(v)).collect();
    let (minima, maxima) = extrema(xs, &fitted);

    match (minima.as_slice(), maxima.as_slice()) {
        ([rs, ps], [ts]) => {
            let base = fitted[*rs];
            Ok(FitOutcome::Accepted(Barriers {
                activation: fitted[*ts] - base,
                reaction: fitted[*ps] - base,
            }))
        }
        _ => Ok(FitOutcome::Rejected {
            minima: minima.len(),
            maxima: maxima.len(),
        }),
    }
}
