//! Fixpoint driver: scan the rules in priority order, apply the first rule that can fire,
//! restart from the top, stop when a full pass applies nothing.
//!
//! The loop is an explicit two-state machine ([`DriverState`]) so that both the termination
//! condition and the step cap are visible in one place.
use super::concentrations::ConcentrationVector;
use super::reaction_errors::ReactionError;
use super::reaction_rules::{ReactionRule, RuleSet};
use super::step_applier::{DEFAULT_MIN_EXTENT, StepApplier};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STEPS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// hard cap on the number of applied steps of one run
    pub max_steps: usize,
    /// smallest extent that counts as a reaction
    pub min_extent: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            min_extent: DEFAULT_MIN_EXTENT,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), ReactionError> {
        if !(self.min_extent.is_finite() && self.min_extent >= 0.0) {
            return Err(ReactionError::InvalidSettings(format!(
                "min_extent must be a non-negative number, got {}",
                self.min_extent
            )));
        }
        Ok(())
    }
}

/// one applied rule: its index, the extent used and the vector after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub rule_index: usize,
    pub multiplier: f64,
    pub concentrations: ConcentrationVector,
}

/// Running total of everything ever present per species: the initial amount plus all production.
/// Consumption is never subtracted. Only a net gain counts as production, so a species on both
/// sides of a rule (a catalyst) is credited `m * (c_product - c_reactant)` at most.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    totals: ConcentrationVector,
}

impl Aggregator {
    pub fn new(initial: &ConcentrationVector) -> Self {
        Self {
            totals: initial.clone(),
        }
    }

    pub fn record(&mut self, rule: &ReactionRule, multiplier: f64) {
        for term in rule.products.iter() {
            let gain = rule.net_coefficient(&term.species);
            if gain > 0.0 {
                self.totals.add(&term.species, multiplier * gain);
            }
        }
    }

    pub fn totals(&self) -> &ConcentrationVector {
        &self.totals
    }

    pub fn into_totals(self) -> ConcentrationVector {
        self.totals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Scanning { cursor: usize },
    Terminated,
}

/// what one transition of the driver did
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<'r> {
    /// the rule under the cursor fired
    Applied {
        rule: &'r ReactionRule,
        multiplier: f64,
        next: ConcentrationVector,
    },
    /// the rule under the cursor cannot fire, move on
    Skipped,
    /// a full pass applied nothing
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixpointRun {
    pub final_vector: ConcentrationVector,
    pub aggregated: ConcentrationVector,
    pub steps: Vec<StepRecord>,
}

pub struct FixpointDriver<'r> {
    rules: &'r RuleSet,
    applier: StepApplier,
    max_steps: usize,
}

impl<'r> FixpointDriver<'r> {
    pub fn new(rules: &'r RuleSet, settings: &SolverSettings) -> Self {
        Self {
            rules,
            applier: StepApplier::new(settings.min_extent),
            max_steps: settings.max_steps,
        }
    }

    /// single transition of the state machine
    pub fn advance(
        &self,
        state: DriverState,
        vector: &ConcentrationVector,
    ) -> (DriverState, Transition<'r>) {
        let DriverState::Scanning { cursor } = state else {
            return (DriverState::Terminated, Transition::Finished);
        };
        let rules: &'r RuleSet = self.rules;
        match rules.get(cursor) {
            None => (DriverState::Terminated, Transition::Finished),
            Some(rule) => match self.applier.apply(rule, vector) {
                Some((multiplier, next)) => (
                    DriverState::Scanning { cursor: 0 },
                    Transition::Applied {
                        rule,
                        multiplier,
                        next,
                    },
                ),
                None => (
                    DriverState::Scanning { cursor: cursor + 1 },
                    Transition::Skipped,
                ),
            },
        }
    }

    /// runs the state machine from the initial vector until it terminates or the step cap is hit
    pub fn run(&self, initial: ConcentrationVector) -> Result<FixpointRun, ReactionError> {
        let mut aggregator = Aggregator::new(&initial);
        let mut vector = initial;
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut state = DriverState::Scanning { cursor: 0 };
        while state != DriverState::Terminated {
            let (next_state, transition) = self.advance(state, &vector);
            if let Transition::Applied {
                rule,
                multiplier,
                next,
            } = transition
            {
                if steps.len() >= self.max_steps {
                    return Err(ReactionError::DidNotConverge {
                        steps: steps.len(),
                        last: vector,
                    });
                }
                debug!(
                    "step {}: applying reaction {} * {:.3} : {}",
                    steps.len() + 1,
                    rule.index,
                    multiplier,
                    rule
                );
                aggregator.record(rule, multiplier);
                steps.push(StepRecord {
                    rule_index: rule.index,
                    multiplier,
                    concentrations: next.clone(),
                });
                vector = next;
            }
            state = next_state;
        }
        Ok(FixpointRun {
            final_vector: vector,
            aggregated: aggregator.into_totals(),
            steps,
        })
    }
}
