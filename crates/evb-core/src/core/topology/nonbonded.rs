use super::index::AtomIndex;
use super::parameters::{LennardJones, StateParameters};
use super::softcore::SoftCoreEntry;
use super::transitions::Transitions;
use super::{TopologyError, TopologyWarning};
use crate::core::models::atom::{Serial, State};
use crate::core::models::pair::{AtomPair, ClassifiedPair, PairCode, Relation};
use tracing::warn;

/// Coefficients of the reactant and product charge products in a pair charge,
/// `q(λ) = c_A·q_A·(1−λ) + c_B·q_B·λ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeSchedule {
    pub reactant: f64,
    pub product: f64,
}

impl ChargeSchedule {
    const fn new(reactant: f64, product: f64) -> Self {
        Self { reactant, product }
    }

    pub fn coefficient(&self, state: State) -> f64 {
        match state {
            State::Reactant => self.reactant,
            State::Product => self.product,
        }
    }
}

/// Lennard-Jones parameters of a `[ pairs ]` entry in state A and state B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairLennardJones {
    pub a: LennardJones,
    pub b: LennardJones,
}

/// A pair interaction that the dual-state engine cannot derive on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct NonbondedEntry {
    pub pair: AtomPair,
    /// Products of the two atomic charges in state A and state B.
    pub charge_products: [f64; 2],
    pub schedule: ChargeSchedule,
    /// Explicit Lennard-Jones pair; absent for soft-core and solo-term entries.
    pub lennard_jones: Option<PairLennardJones>,
    pub comment: &'static str,
}

impl NonbondedEntry {
    /// Part of the pair charge that belongs to `state` at coupling `lambda`.
    pub fn contribution(&self, state: State, lambda: f64) -> f64 {
        let weight = match state {
            State::Reactant => 1.0 - lambda,
            State::Product => lambda,
        };
        self.schedule.coefficient(state) * self.charge_products[state.index()] * weight
    }

    pub fn charge(&self, lambda: f64) -> f64 {
        self.contribution(State::Reactant, lambda) + self.contribution(State::Product, lambda)
    }

    pub fn exclusion_row(&self) -> String {
        format!(" {}   {}", self.pair.first, self.pair.second)
    }

    /// Row of the `[ pairs ]` section, if the entry keeps a Lennard-Jones pair.
    pub fn pair_row(&self) -> Option<String> {
        self.lennard_jones.map(|lj| {
            format!(
                " {}   {}    1   {:>10.6}  {:>10.6}  {:>10.6}  {:>10.6}{}",
                self.pair.first,
                self.pair.second,
                lj.a.sigma,
                lj.a.epsilon,
                lj.b.sigma,
                lj.b.epsilon,
                self.comment
            )
        })
    }

    /// Row of the `[ pairs_nb ]` section at coupling `lambda`.
    pub fn pairs_nb_row(&self, lambda: f64) -> String {
        format!(
            " {:>5} {:>5}  1  {:>10.6}  1.00   1.00   0.00{}",
            self.pair.first,
            self.pair.second,
            self.charge(lambda),
            self.comment
        )
    }
}

/// All explicit pair interactions of the EVB block, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonbondedPlan {
    pub entries: Vec<NonbondedEntry>,
}

impl NonbondedPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn exclusion_rows(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(NonbondedEntry::exclusion_row)
    }

    pub fn pair_rows(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().filter_map(NonbondedEntry::pair_row)
    }

    pub fn pairs_nb_rows(&self, lambda: f64) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(move |e| e.pairs_nb_row(lambda))
    }
}

/// Which side of a pair loses part of its Lennard-Jones interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    /// Only state B carries the pair; state A gets a null entry.
    ProductOnly,
    /// Only state A carries the pair.
    ReactantOnly,
    /// Both states, each with its own epsilon factor.
    Both { a: f64, b: f64 },
}

struct PairRule {
    soft: ChargeSchedule,
    soft_comment: &'static str,
    hard: ChargeSchedule,
    hard_comment: &'static str,
    side: Side,
}

fn pair_rule(code: PairCode) -> Option<PairRule> {
    use Relation::*;
    let rule = match (code.reactant, code.product) {
        (Bond | Angle, Pair) => PairRule {
            soft: ChargeSchedule::new(0.0, 0.5),
            soft_comment: "  ;2/3 -> 4; soft core",
            hard: ChargeSchedule::new(-0.5, 0.0),
            hard_comment: "  ;2/3 -> 4",
            side: Side::ProductOnly,
        },
        (Pair, Bond | Angle) => PairRule {
            soft: ChargeSchedule::new(0.5, 0.0),
            soft_comment: "  ;4 -> 2/3; soft core",
            hard: ChargeSchedule::new(0.0, -0.5),
            hard_comment: "  ;4 -> 2/3",
            side: Side::ReactantOnly,
        },
        (Pair, Nonbonded) => PairRule {
            soft: ChargeSchedule::new(0.5, 1.0),
            soft_comment: "  ;4 -> 5; soft core",
            hard: ChargeSchedule::new(0.0, 0.5),
            hard_comment: "  ;4 -> 5",
            side: Side::Both { a: 0.5, b: 1.0 },
        },
        (Nonbonded, Pair) => PairRule {
            soft: ChargeSchedule::new(1.0, 0.5),
            soft_comment: "  ;5 -> 4; soft core",
            hard: ChargeSchedule::new(0.5, 0.0),
            hard_comment: "  ;5 -> 4",
            side: Side::Both { a: 1.0, b: 0.5 },
        },
        (Nonbonded, Nonbonded) => PairRule {
            soft: ChargeSchedule::new(1.0, 1.0),
            soft_comment: "  ;5 -> 5; soft core",
            hard: ChargeSchedule::new(0.5, 0.5),
            hard_comment: "  ;5 -> 5",
            side: Side::Both { a: 1.0, b: 1.0 },
        },
        _ => return None,
    };
    Some(rule)
}

/// Plans the explicit pair interactions of the EVB block.
///
/// Entries come in the order solo bonds, solo angles, classified 1-4 pairs, restored pairs.
/// A pair uses its soft schedule when it is a donor-acceptor pair with a soft-core entry;
/// otherwise it keeps a Lennard-Jones pair and the hard schedule.
///
/// # Errors
///
/// Returns [`TopologyError::UnknownAtom`] for a pair atom missing from the index and
/// [`TopologyError::MissingVdw`] when a Lennard-Jones pair needs parameters that no
/// fragment provides.
pub fn plan(
    index: &AtomIndex,
    transitions: &Transitions,
    pairs: &[ClassifiedPair],
    soft: &[SoftCoreEntry],
    reactant: &StateParameters,
    product: &StateParameters,
) -> Result<(NonbondedPlan, Vec<TopologyWarning>), TopologyError> {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for bond in &transitions.bonds {
        let Some((schedule, comment)) = solo_schedule(bond.code) else {
            continue;
        };
        entries.push(NonbondedEntry {
            pair: bond.pair,
            charge_products: charge_products(index, bond.pair)?,
            schedule,
            lennard_jones: None,
            comment,
        });
    }

    for angle in &transitions.angles {
        let Some((schedule, comment)) = solo_schedule(angle.code) else {
            continue;
        };
        let pair = angle.ends();
        entries.push(NonbondedEntry {
            pair,
            charge_products: charge_products(index, pair)?,
            schedule,
            lennard_jones: None,
            comment,
        });
    }

    let restored = transitions.restored.iter().map(|&pair| ClassifiedPair {
        pair,
        code: PairCode::RESTORED,
    });
    for classified in pairs.iter().copied().chain(restored) {
        let Some(rule) = pair_rule(classified.code) else {
            continue;
        };
        let pair = classified.pair;
        let donor_acceptor = transitions.is_donor_acceptor(pair);
        let softened = donor_acceptor && soft.iter().any(|entry| entry.pair == pair);

        if softened {
            entries.push(NonbondedEntry {
                pair,
                charge_products: charge_products(index, pair)?,
                schedule: rule.soft,
                lennard_jones: None,
                comment: rule.soft_comment,
            });
            continue;
        }

        if donor_acceptor {
            let warning = TopologyWarning::UnsoftenedDonorAcceptor(pair);
            if !warnings.contains(&warning) {
                warn!("{}", warning);
                warnings.push(warning);
            }
        }

        entries.push(NonbondedEntry {
            pair,
            charge_products: charge_products(index, pair)?,
            schedule: rule.hard,
            lennard_jones: Some(pair_lennard_jones(pair, rule.side, reactant, product)?),
            comment: rule.hard_comment,
        });
    }

    Ok((NonbondedPlan { entries }, warnings))
}

fn solo_schedule(code: PairCode) -> Option<(ChargeSchedule, &'static str)> {
    match code {
        PairCode::BOND_BREAKING => Some((ChargeSchedule::new(0.0, 1.0), "  ;2 -> 5")),
        PairCode::BOND_FORMING => Some((ChargeSchedule::new(1.0, 0.0), "  ;5 -> 2")),
        PairCode::ANGLE_BREAKING => Some((ChargeSchedule::new(0.0, 1.0), "  ;3 -> 5")),
        PairCode::ANGLE_FORMING => Some((ChargeSchedule::new(1.0, 0.0), "  ;5 -> 3")),
        _ => None,
    }
}

fn charge_products(index: &AtomIndex, pair: AtomPair) -> Result<[f64; 2], TopologyError> {
    let first = index.record(pair.first)?;
    let second = index.record(pair.second)?;
    Ok(State::BOTH.map(|state| first.charge(state) * second.charge(state)))
}

fn combined(params: &StateParameters, pair: AtomPair, state: State) -> Result<LennardJones, TopologyError> {
    let lj = |serial: Serial| params.lennard_jones(serial, state);
    Ok(lj(pair.first)?.combine(lj(pair.second)?))
}

const NULL_PAIR: LennardJones = LennardJones {
    sigma: 1.0,
    epsilon: 0.0,
};

fn scaled(lj: LennardJones, factor: f64) -> LennardJones {
    LennardJones {
        sigma: lj.sigma,
        epsilon: factor * lj.epsilon,
    }
}

fn pair_lennard_jones(
    pair: AtomPair,
    side: Side,
    reactant: &StateParameters,
    product: &StateParameters,
) -> Result<PairLennardJones, TopologyError> {
    Ok(match side {
        Side::ProductOnly => PairLennardJones {
            a: NULL_PAIR,
            b: scaled(combined(product, pair, State::Product)?, 0.5),
        },
        Side::ReactantOnly => PairLennardJones {
            a: scaled(combined(reactant, pair, State::Reactant)?, 0.5),
            b: NULL_PAIR,
        },
        Side::Both { a, b } => PairLennardJones {
            a: scaled(combined(reactant, pair, State::Reactant)?, a),
            b: scaled(combined(product, pair, State::Product)?, b),
        },
    })
}
