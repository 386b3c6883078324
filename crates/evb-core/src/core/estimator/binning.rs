use super::{EstimatorError, MappedWindow, Profile, domain_error};

/// Equal-width bins over the full range of sampled energy gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapBins {
    pub min: f64,
    pub width: f64,
    pub count: usize,
}

impl GapBins {
    pub fn spanning(windows: &[MappedWindow], count: usize) -> Self {
        let (min, max) = windows
            .iter()
            .flat_map(|w| w.gap.iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g| {
                (lo.min(g), hi.max(g))
            });
        let count = count.max(1);
        let width = if max > min {
            (max - min) / count as f64
        } else {
            0.0
        };
        Self { min, width, count }
    }

    /// Bin of `gap`; values at or beyond the upper edge fall into the last bin.
    pub fn index(&self, gap: f64) -> usize {
        if self.width <= 0.0 {
            return 0;
        }
        let raw = ((gap - self.min) / self.width).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.count - 1)
        }
    }

    /// Midpoint of bin `index`. Profiles that report the lower edge minus half a bin sit one
    /// bin width below these coordinates.
    pub fn center(&self, index: usize) -> f64 {
        self.min + (index as f64 + 0.5) * self.width
    }
}

/// Reweights every qualifying bin and window onto the three energy surfaces.
///
/// A window contributes to a bin when it placed at least `min_points` samples there; the
/// contributions are averaged with the sample counts as weights. Bins without any
/// contribution are left out of the profile.
pub fn reweight(
    windows: &[MappedWindow],
    window_free_energies: &[f64],
    bins: &GapBins,
    min_points: usize,
    kt: f64,
) -> Result<Profile, EstimatorError> {
    let min_points = min_points.max(1);
    let members: Vec<Vec<Vec<usize>>> = windows
        .iter()
        .map(|window| {
            let mut by_bin = vec![Vec::new(); bins.count];
            for (sample, &gap) in window.gap.iter().enumerate() {
                by_bin[bins.index(gap)].push(sample);
            }
            by_bin
        })
        .collect();

    let mut profile = Profile::default();
    for bin in 0..bins.count {
        let mut weighted = [0.0; 3];
        let mut total = 0usize;

        for (w, window) in windows.iter().enumerate() {
            let samples = &members[w][bin];
            if samples.len() < min_points {
                continue;
            }
            let dg_lambda = window_free_energies[w];
            for (surface, acc) in weighted.iter_mut().enumerate() {
                let values = samples.iter().map(|&s| window.targets[surface][s]);
                let g = bin_free_energy(values, samples.len(), dg_lambda, kt)
                    .map_err(|value| domain_error(format!("bin {bin} of window {w}"), value))?;
                *acc += g * samples.len() as f64;
            }
            total += samples.len();
        }

        if total == 0 {
            continue;
        }
        let total = total as f64;
        profile.coordinate.push(bins.center(bin));
        profile.reactant.push(weighted[0] / total);
        profile.product.push(weighted[1] / total);
        profile.ground.push(weighted[2] / total);
    }

    if profile.is_empty() {
        return Err(EstimatorError::EmptyProfile { min_points });
    }
    Ok(profile)
}

/// `dG_λ - kT ln <exp(-(u - ū)/kT)> + ū` over one bin; the error carries the offending value.
fn bin_free_energy(
    values: impl Iterator<Item = f64> + Clone,
    n: usize,
    dg_lambda: f64,
    kt: f64,
) -> Result<f64, f64> {
    let n = n as f64;
    let mean = values.clone().sum::<f64>() / n;
    let mut sum = 0.0;
    for u in values {
        let term = (-(u - mean) / kt).exp();
        if !term.is_finite() {
            return Err(-(u - mean) / kt);
        }
        sum += term;
    }
    let average = sum / n;
    if !average.is_finite() || average <= 0.0 {
        return Err(average);
    }
    Ok(dg_lambda - kt * average.ln() + mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(gaps: &[f64], target: f64) -> MappedWindow {
        MappedWindow {
            gap: gaps.to_vec(),
            targets: [
                vec![target; gaps.len()],
                vec![target + 1.0; gaps.len()],
                vec![target - 1.0; gaps.len()],
            ],
        }
    }

    #[test]
    fn bins_span_all_windows() {
        let windows = vec![window(&[-4.0, 0.0], 0.0), window(&[2.0, 6.0], 0.0)];
        let bins = GapBins::spanning(&windows, 5);
        assert_eq!(bins.min, -4.0);
        assert_eq!(bins.width, 2.0);
        assert_eq!(bins.center(0), -3.0);
        assert_eq!(bins.center(4), 5.0);
    }

    #[test]
    fn index_is_half_open_and_clamped() {
        let bins = GapBins {
            min: 0.0,
            width: 1.0,
            count: 3,
        };
        assert_eq!(bins.index(0.0), 0);
        assert_eq!(bins.index(0.999), 0);
        assert_eq!(bins.index(1.0), 1);
        assert_eq!(bins.index(3.0), 2);
        assert_eq!(bins.index(-0.5), 0);
    }

    #[test]
    fn degenerate_range_puts_everything_in_first_bin() {
        let windows = vec![window(&[1.0, 1.0], 0.0)];
        let bins = GapBins::spanning(&windows, 4);
        assert_eq!(bins.width, 0.0);
        assert_eq!(bins.index(1.0), 0);
    }

    #[test]
    fn constant_targets_reproduce_window_free_energy_plus_target() {
        let windows = vec![window(&[0.0, 0.1, 0.2, 0.3], 2.0)];
        let bins = GapBins {
            min: 0.0,
            width: 1.0,
            count: 1,
        };
        let profile = reweight(&windows, &[0.5], &bins, 1, 0.6).unwrap();
        assert_eq!(profile.len(), 1);
        assert!((profile.reactant[0] - 2.5).abs() < 1e-12);
        assert!((profile.product[0] - 3.5).abs() < 1e-12);
        assert!((profile.ground[0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn windows_are_weighted_by_sample_count() {
        let windows = vec![window(&[0.5; 3], 0.0), window(&[0.5], 4.0)];
        let bins = GapBins {
            min: 0.0,
            width: 1.0,
            count: 1,
        };
        let profile = reweight(&windows, &[0.0, 0.0], &bins, 1, 0.6).unwrap();
        assert!((profile.reactant[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sparse_bins_are_omitted() {
        let windows = vec![window(&[0.1, 0.2, 0.3, 2.5], 0.0)];
        let bins = GapBins {
            min: 0.0,
            width: 1.0,
            count: 3,
        };
        let profile = reweight(&windows, &[0.0], &bins, 2, 0.6).unwrap();
        assert_eq!(profile.coordinate, vec![0.5]);
    }

    #[test]
    fn profile_without_qualifying_bins_is_an_error() {
        let windows = vec![window(&[0.1], 0.0)];
        let bins = GapBins::spanning(&windows, 2);
        let err = reweight(&windows, &[0.0], &bins, 5, 0.6).unwrap_err();
        assert_eq!(err, EstimatorError::EmptyProfile { min_points: 5 });
    }
}
