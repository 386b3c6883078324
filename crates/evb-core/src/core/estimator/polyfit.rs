use super::EstimatorError;
use nalgebra::{DMatrix, DVector};

const SVD_EPSILON: f64 = 1e-12;

/// Least-squares polynomial in a centred and scaled variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    center: f64,
    scale: f64,
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Fits a polynomial of `degree` to the points.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::TooFewPoints`] when there are not more points than the
    /// degree, and [`EstimatorError::Fit`] when the least-squares system cannot be solved.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self, EstimatorError> {
        let n = x.len().min(y.len());
        if n <= degree {
            return Err(EstimatorError::TooFewPoints {
                needed: degree + 1,
                found: n,
            });
        }

        let center = x[..n].iter().sum::<f64>() / n as f64;
        let spread = x[..n]
            .iter()
            .map(|v| (v - center).abs())
            .fold(0.0, f64::max);
        let scale = if spread > 0.0 { spread } else { 1.0 };

        let design = DMatrix::from_fn(n, degree + 1, |row, col| {
            ((x[row] - center) / scale).powi(col as i32)
        });
        let rhs = DVector::from_column_slice(&y[..n]);
        let solution = design
            .svd(true, true)
            .solve(&rhs, SVD_EPSILON)
            .map_err(|msg| EstimatorError::Fit(msg.to_string()))?;

        if solution.iter().any(|c| !c.is_finite()) {
            return Err(EstimatorError::Fit("non-finite coefficient".to_string()));
        }

        Ok(Self {
            center,
            scale,
            coefficients: solution.iter().copied().collect(),
        })
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }
}

/// Local minima and maxima of sampled curve values, as indices into `x`.
///
/// Extrema are read off sign changes of the finite-difference slope; a point is a minimum
/// when the slope turns from non-positive to positive, and a maximum when it turns from
/// non-negative to negative.
pub fn extrema(x: &[f64], y: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let n = x.len().min(y.len());
    let slopes: Vec<f64> = (1..n)
        .map(|i| (y[i] - y[i - 1]) / (x[i] - x[i - 1]))
        .collect();

    let mut minima = Vec::new();
    let mut maxima = Vec::new();
    for (i, pair) in slopes.windows(2).enumerate() {
        let (before, after) = (pair[0], pair[1]);
        if before <= 0.0 && after > 0.0 {
            minima.push(i + 1);
        } else if before >= 0.0 && after < 0.0 {
            maxima.push(i + 1);
        }
    }
    (minima, maxima)
}
