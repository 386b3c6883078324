use crate::core::models::atom::State;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationaryPoint {
    pub index: usize,
    pub coordinate: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasinWarning {
    ReactantNotFound,
    ProductNotFound,
    NoTransitionState,
    MultipleTransitionStates(usize),
    /// The basin of `State` lies on the opposite side of zero gap.
    BasinOnWrongSide(State),
}

impl fmt::Display for BasinWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasinWarning::ReactantNotFound => {
                write!(f, "RS state could not be located - try with different EVB parameters.")
            }
            BasinWarning::ProductNotFound => {
                write!(f, "PS state could not be located - try with different EVB parameters.")
            }
            BasinWarning::NoTransitionState => write!(f, "No TS maximum could be located."),
            BasinWarning::MultipleTransitionStates(n) => write!(
                f,
                "{n} TS maxima have been located - inspect the EVB profile."
            ),
            BasinWarning::BasinOnWrongSide(state) => {
                write!(f, "The {state} basin lies on the wrong side of zero gap.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationaryPoints {
    pub reactant: StationaryPoint,
    pub product: StationaryPoint,
    pub transition_states: Vec<StationaryPoint>,
    pub warnings: Vec<BasinWarning>,
}

impl StationaryPoints {
    pub fn reactant_found(&self) -> bool {
        !self.warnings.contains(&BasinWarning::ReactantNotFound)
    }

    pub fn product_found(&self) -> bool {
        !self.warnings.contains(&BasinWarning::ProductNotFound)
    }

    /// Same points with every value lowered by `origin`.
    pub fn shifted(mut self, origin: f64) -> Self {
        self.reactant.value -= origin;
        self.product.value -= origin;
        for ts in &mut self.transition_states {
            ts.value -= origin;
        }
        self
    }
}

fn point(x: &[f64], y: &[f64], index: usize) -> StationaryPoint {
    StationaryPoint {
        index,
        coordinate: x[index],
        value: y[index],
    }
}

/// Locates the reactant basin, product basin and transition state of a profile.
///
/// Basins are the outermost local minima of the profile. Transition-state candidates are
/// the local maxima between them; candidates closer than `tolerance` to each other are
/// merged into the higher one, and candidates less than `tolerance` above the nearer basin
/// are dropped while more than one remains.
///
/// `x` and `y` must be non-empty and of equal length.
pub fn locate_stationary_points(x: &[f64], y: &[f64], tolerance: f64) -> StationaryPoints {
    let n = x.len().min(y.len());
    let last = n.saturating_sub(1);
    let dy: Vec<f64> = y[..n].windows(2).map(|w| w[1] - w[0]).collect();
    let mut warnings = Vec::new();

    let reactant = (0..dy.len().saturating_sub(1))
        .find(|&i| dy[i] < 0.0 && dy[i + 1] >= 0.0)
        .map(|i| i + 1);
    let reactant = match reactant {
        Some(index) => index,
        None => {
            warnings.push(BasinWarning::ReactantNotFound);
            0
        }
    };

    let product = (1..dy.len())
        .rev()
        .find(|&i| dy[i] > 0.0 && dy[i - 1] <= 0.0);
    let product = match product {
        Some(index) => index,
        None => {
            warnings.push(BasinWarning::ProductNotFound);
            last
        }
    };

    let rs = point(x, y, reactant);
    let ps = point(x, y, product);

    let mut candidates: Vec<StationaryPoint> = (reactant..product)
        .filter(|&i| i + 1 < dy.len())
        .filter(|&i| (dy[i] > 0.0 && dy[i + 1] <= 0.0) || (dy[i] >= 0.0 && dy[i + 1] < 0.0))
        .map(|i| point(x, y, i + 1))
        .collect();

    merge_close_candidates(&mut candidates, tolerance);
    drop_shallow_candidates(&mut candidates, rs.value, ps.value, tolerance);

    match candidates.len() {
        0 => warnings.push(BasinWarning::NoTransitionState),
        1 => {}
        many => warnings.push(BasinWarning::MultipleTransitionStates(many)),
    }
    if rs.coordinate > 0.0 {
        warnings.push(BasinWarning::BasinOnWrongSide(State::Reactant));
    }
    if ps.coordinate < 0.0 {
        warnings.push(BasinWarning::BasinOnWrongSide(State::Product));
    }

    StationaryPoints {
        reactant: rs,
        product: ps,
        transition_states: candidates,
        warnings,
    }
}

fn merge_close_candidates(candidates: &mut Vec<StationaryPoint>, tolerance: f64) {
    while let Some(i) = (0..candidates.len().saturating_sub(1))
        .find(|&i| (candidates[i + 1].value - candidates[i].value).abs() < tolerance)
    {
        if candidates[i + 1].value >= candidates[i].value {
            candidates.remove(i);
        } else {
            candidates.remove(i + 1);
        }
    }
}

fn drop_shallow_candidates(candidates: &mut Vec<StationaryPoint>, rs: f64, ps: f64, tolerance: f64) {
    while candidates.len() > 1 {
        let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
            break;
        };
        let above_rs = first.value - rs;
        let above_ps = last.value - ps;
        if above_rs < above_ps && above_rs < tolerance {
            candidates.remove(0);
        } else if above_rs > above_ps && above_ps < tolerance {
            candidates.pop();
        } else {
            break;
        }
    }
}
