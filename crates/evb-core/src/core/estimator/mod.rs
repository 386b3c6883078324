//! # Free-Energy Estimator
//!
//! Turns the energies sampled in the coupling windows into a free-energy profile along the
//! energy-gap reaction coordinate, and analyses finished profiles.
//!
//! ## Overview
//!
//! Each window `i` samples the mapping potential
//! `V_i = (1 - λ_i)(E_A - E_ref) + λ_i(E_B - E_ref + α)`. The estimator
//!
//! 1. combines forward and backward Zwanzig exponential averages into the free energy of
//!    every window ([`zwanzig`]),
//! 2. bins all samples by their energy gap and reweights every bin from each window's
//!    potential onto the diabatic and EVB ground-state surfaces ([`binning`]),
//! 3. locates the reactant basin, product basin and transition state ([`basins`]).
//!
//! Post-processing of several replica profiles lives in [`stats`] and [`polyfit`].
//!
//! All energies are in kcal/mol.

pub mod basins;
pub mod binning;
pub mod polyfit;
pub mod stats;
pub mod zwanzig;

use basins::StationaryPoints;
use thiserror::Error;
use tracing::debug;

/// Boltzmann constant in kcal/(mol K).
pub const BOLTZMANN_KCAL: f64 = 1.987e-3;
/// kJ per kcal, used to convert GROMACS energies.
pub const KJ_PER_KCAL: f64 = 4.184;

#[derive(Debug, Error, PartialEq)]
pub enum EstimatorError {
    #[error("Numeric domain error in {context} (value: {value})")]
    NumericDomain { context: String, value: f64 },
    #[error("At least two windows are required, found {0}")]
    TooFewWindows(usize),
    #[error("Window {0} contains no samples")]
    EmptyWindow(usize),
    #[error("No bin reached the minimum of {min_points} samples")]
    EmptyProfile { min_points: usize },
    #[error("Profile needs at least {needed} points, found {found}")]
    TooFewPoints { needed: usize, found: usize },
    #[error("Profile has no {0} minimum")]
    MissingMinimum(&'static str),
    #[error("Least-squares fit failed: {0}")]
    Fit(String),
}

pub(crate) fn domain_error(context: impl Into<String>, value: f64) -> EstimatorError {
    EstimatorError::NumericDomain {
        context: context.into(),
        value,
    }
}

/// Energies of one window, already converted to kcal/mol and truncated to a common length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSeries {
    pub reactant: Vec<f64>,
    pub product: Vec<f64>,
    pub reference: Vec<f64>,
}

impl WindowSeries {
    pub fn len(&self) -> usize {
        self.reactant
            .len()
            .min(self.product.len())
            .min(self.reference.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingParameters {
    /// Gas-phase shift α added to the product diabatic energy.
    pub alpha: f64,
    /// Constant off-diagonal coupling H_ij.
    pub hij: f64,
    pub kt: f64,
    pub delta_lambda: f64,
    pub bins: usize,
    pub min_points: usize,
    pub ts_tolerance: f64,
}

/// Per-sample quantities of one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedWindow {
    /// Energy gap `E_A - E_B - α`.
    pub gap: Vec<f64>,
    /// `E_A - V`, `E_B - V` and `E_g - V` per sample.
    pub targets: [Vec<f64>; 3],
}

impl MappedWindow {
    pub fn from_series(series: &WindowSeries, lambda: f64, params: &MappingParameters) -> Self {
        let n = series.len();
        let mut mapped = MappedWindow {
            gap: Vec::with_capacity(n),
            targets: [
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
            ],
        };
        for j in 0..n {
            let e_a = series.reactant[j] - series.reference[j];
            let e_b = series.product[j] - series.reference[j] + params.alpha;
            let gap = e_a - e_b;
            let mapping = (1.0 - lambda) * e_a + lambda * e_b;
            let ground = 0.5 * (e_a + e_b) - 0.5 * (gap * gap + 4.0 * params.hij * params.hij).sqrt();

            mapped.gap.push(gap);
            mapped.targets[0].push(e_a - mapping);
            mapped.targets[1].push(e_b - mapping);
            mapped.targets[2].push(ground - mapping);
        }
        mapped
    }

    pub fn len(&self) -> usize {
        self.gap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gap.is_empty()
    }
}

/// Free-energy profile along the energy gap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub coordinate: Vec<f64>,
    pub reactant: Vec<f64>,
    pub product: Vec<f64>,
    pub ground: Vec<f64>,
}

impl Profile {
    pub fn len(&self) -> usize {
        self.coordinate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinate.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub profile: Profile,
    /// Free energy of every window relative to window 0.
    pub window_free_energies: Vec<f64>,
    pub stationary: StationaryPoints,
}

impl ProfileReport {
    /// Activation free energy, available when exactly one transition state was found.
    pub fn barrier(&self) -> Option<f64> {
        match self.stationary.transition_states.as_slice() {
            [ts] => Some(ts.value - self.stationary.reactant.value),
            _ => None,
        }
    }

    pub fn reaction_free_energy(&self) -> Option<f64> {
        self.barrier()?;
        Some(self.stationary.product.value - self.stationary.reactant.value)
    }
}

/// Maps the sampled windows onto a free-energy profile.
///
/// # Errors
///
/// Returns [`EstimatorError::TooFewWindows`] for fewer than two windows,
/// [`EstimatorError::EmptyWindow`] if any window has no samples,
/// [`EstimatorError::NumericDomain`] when an exponential average leaves the floating-point
/// range, and [`EstimatorError::EmptyProfile`] when no bin collects enough samples.
pub fn map_profile(
    windows: &[WindowSeries],
    params: &MappingParameters,
) -> Result<ProfileReport, EstimatorError> {
    let mapped = map_windows(windows, params)?;
    let window_free_energies =
        zwanzig::window_free_energies(&mapped, params.kt, params.delta_lambda)?;
    debug!(?window_free_energies, "Window free energies computed.");
    profile_from(&mapped, window_free_energies, params)
}

/// Per-sample energy gaps and reweighting targets of every window, with
/// `λ_i = i·Δλ`.
///
/// # Errors
///
/// Returns [`EstimatorError::TooFewWindows`] for fewer than two windows and
/// [`EstimatorError::EmptyWindow`] if any window has no samples.
pub fn map_windows(
    windows: &[WindowSeries],
    params: &MappingParameters,
) -> Result<Vec<MappedWindow>, EstimatorError> {
    if windows.len() < 2 {
        return Err(EstimatorError::TooFewWindows(windows.len()));
    }
    if let Some(empty) = windows.iter().position(WindowSeries::is_empty) {
        return Err(EstimatorError::EmptyWindow(empty));
    }
    Ok(windows
        .iter()
        .enumerate()
        .map(|(i, series)| MappedWindow::from_series(series, i as f64 * params.delta_lambda, params))
        .collect())
}

/// Bins and reweights mapped windows, then shifts the profile so that the reactant basin
/// of the ground state (or the product basin, when no reactant basin exists) lies at zero
/// and the diabatic minimum at zero.
///
/// # Errors
///
/// Returns [`EstimatorError::NumericDomain`] when a bin average leaves the floating-point
/// range and [`EstimatorError::EmptyProfile`] when no bin collects enough samples.
pub fn profile_from(
    mapped: &[MappedWindow],
    window_free_energies: Vec<f64>,
    params: &MappingParameters,
) -> Result<ProfileReport, EstimatorError> {
    let bins = binning::GapBins::spanning(mapped, params.bins);
    let mut profile = binning::reweight(mapped, &window_free_energies, &bins, params.min_points, params.kt)?;

    let stationary =
        basins::locate_stationary_points(&profile.coordinate, &profile.ground, params.ts_tolerance);

    let origin = if stationary.reactant_found() {
        stationary.reactant.value
    } else {
        stationary.product.value
    };
    let diabatic_min = profile
        .reactant
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    profile.ground.iter_mut().for_each(|g| *g -= origin);
    profile.reactant.iter_mut().for_each(|g| *g -= diabatic_min);
    profile.product.iter_mut().for_each(|g| *g -= diabatic_min);

    Ok(ProfileReport {
        profile,
        window_free_energies,
        stationary: stationary.shifted(origin),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TEMPERATURE: f64 = 300.0;
    const SPRING: f64 = 20.0;

    /// Two displaced parabolas in a single coordinate, sampled exactly on the mapping
    /// potential of every window.
    fn marcus_windows(reaction_free_energy: f64, windows: usize, samples: usize, seed: u64) -> Vec<WindowSeries> {
        let kt = BOLTZMANN_KCAL * TEMPERATURE;
        let sigma = (kt / SPRING).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let half = SPRING / 2.0;

        (0..windows)
            .map(|i| {
                let lambda = i as f64 / (windows - 1) as f64;
                let mut series = WindowSeries::default();
                for _ in 0..samples {
                    let u1: f64 = 1.0 - rng.r#gen::<f64>();
                    let u2: f64 = rng.r#gen::<f64>();
                    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                    let x = lambda + sigma * z;
                    series.reactant.push(half * x * x);
                    series.product.push(half * (x - 1.0) * (x - 1.0) + reaction_free_energy);
                    series.reference.push(0.0);
                }
                series
            })
            .collect()
    }

    fn params(windows: usize) -> MappingParameters {
        MappingParameters {
            alpha: 0.0,
            hij: 0.0,
            kt: BOLTZMANN_KCAL * TEMPERATURE,
            delta_lambda: 1.0 / (windows - 1) as f64,
            bins: 50,
            min_points: 50,
            ts_tolerance: 0.5,
        }
    }

    #[test]
    fn symmetric_two_state_model_has_single_central_barrier() {
        let windows = marcus_windows(0.0, 11, 10_000, 7);
        let report = map_profile(&windows, &params(11)).unwrap();

        assert_eq!(report.stationary.transition_states.len(), 1);
        let ts = report.stationary.transition_states[0];
        assert!(ts.coordinate.abs() < 2.0, "TS at {}", ts.coordinate);
        assert!(report.stationary.reactant.coordinate < 0.0);
        assert!(report.stationary.product.coordinate > 0.0);

        let dg0 = report.reaction_free_energy().unwrap();
        assert!(dg0.abs() < 0.5, "dG0 = {dg0}");
        let barrier = report.barrier().unwrap();
        assert!(barrier > 1.5 && barrier < 3.5, "barrier = {barrier}");
    }

    #[test]
    fn asymmetric_model_recovers_reaction_free_energy() {
        let windows = marcus_windows(-3.0, 11, 10_000, 11);
        let report = map_profile(&windows, &params(11)).unwrap();

        let dg0 = report.reaction_free_energy().unwrap();
        assert!((dg0 + 3.0).abs() < 0.5, "dG0 = {dg0}");
        assert!(report.barrier().unwrap() > 0.0);
    }

    #[test]
    fn ground_profile_is_zero_at_reactant_basin() {
        let windows = marcus_windows(0.0, 11, 10_000, 3);
        let report = map_profile(&windows, &params(11)).unwrap();
        let rs = report.stationary.reactant;
        assert!(report.profile.ground[rs.index].abs() < 1e-9);
        assert!(rs.value.abs() < 1e-9);
        let min_reactant = report.profile.reactant.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(min_reactant.abs() < 1e-9);
    }

    #[test]
    fn window_free_energies_start_at_zero() {
        let windows = marcus_windows(0.0, 5, 2_000, 5);
        let report = map_profile(&windows, &params(5)).unwrap();
        assert_eq!(report.window_free_energies.len(), 5);
        assert_eq!(report.window_free_energies[0], 0.0);
    }

    #[test]
    fn huge_gaps_raise_numeric_domain_error() {
        let series = WindowSeries {
            reactant: vec![1.0e5, 1.0e5, 1.0e5],
            product: vec![0.0, 0.0, 0.0],
            reference: vec![0.0, 0.0, 0.0],
        };
        let windows = vec![series.clone(), series];
        let mut p = params(2);
        p.min_points = 1;
        let err = map_profile(&windows, &p).unwrap_err();
        assert!(matches!(err, EstimatorError::NumericDomain { .. }));
    }

    #[test]
    fn single_window_is_rejected() {
        let windows = marcus_windows(0.0, 2, 10, 1);
        let err = map_profile(&windows[..1], &params(2)).unwrap_err();
        assert_eq!(err, EstimatorError::TooFewWindows(1));
    }

    #[test]
    fn empty_window_is_rejected() {
        let mut windows = marcus_windows(0.0, 3, 10, 1);
        windows[1] = WindowSeries::default();
        let err = map_profile(&windows, &params(3)).unwrap_err();
        assert_eq!(err, EstimatorError::EmptyWindow(1));
    }

    #[test]
    fn mapped_window_applies_alpha_and_coupling() {
        let series = WindowSeries {
            reactant: vec![3.0],
            product: vec![1.0],
            reference: vec![1.0],
        };
        let p = MappingParameters {
            alpha: 1.0,
            hij: 0.0,
            ..params(2)
        };
        let mapped = MappedWindow::from_series(&series, 0.5, &p);
        assert_eq!(mapped.gap, vec![1.0]);
        assert_eq!(mapped.targets[0], vec![0.5]);
        assert_eq!(mapped.targets[1], vec![-0.5]);
        assert_eq!(mapped.targets[2], vec![-0.5]);
    }
}
