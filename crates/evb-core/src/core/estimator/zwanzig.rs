use super::{EstimatorError, MappedWindow, domain_error};

/// Sum of `exp(value)` over the iterator, rejecting overflow and underflow to zero.
fn exp_sum(values: impl Iterator<Item = f64>, context: impl Fn() -> String) -> Result<f64, EstimatorError> {
    let mut sum = 0.0;
    for value in values {
        let term = value.exp();
        if !term.is_finite() {
            return Err(domain_error(context(), value));
        }
        sum += term;
    }
    if !sum.is_finite() || sum <= 0.0 {
        return Err(domain_error(context(), sum));
    }
    Ok(sum)
}

/// Free energy of each window relative to window 0.
///
/// Neighbouring windows are connected by the mean of the forward estimate from window `i`
/// and the backward estimate from window `i + 1`.
pub fn window_free_energies(
    windows: &[MappedWindow],
    kt: f64,
    delta_lambda: f64,
) -> Result<Vec<f64>, EstimatorError> {
    let mut energies = Vec::with_capacity(windows.len());
    energies.push(0.0);

    for (i, pair) in windows.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);

        let forward_sum = exp_sum(current.gap.iter().map(|g| g * delta_lambda / kt), || {
            format!("forward exponential average of window {i}")
        })?;
        let forward = -kt * forward_sum.ln() + kt * (current.len() as f64).ln();

        let backward_sum = exp_sum(next.gap.iter().map(|g| -g * delta_lambda / kt), || {
            format!("backward exponential average of window {}", i + 1)
        })?;
        let backward = kt * backward_sum.ln() - kt * (next.len() as f64).ln();

        let previous = energies.last().copied().unwrap_or_default();
        energies.push(previous + 0.5 * (forward + backward));
    }

    Ok(energies)
}
