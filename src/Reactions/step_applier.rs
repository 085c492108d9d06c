use super::concentrations::ConcentrationVector;
use super::reaction_rules::ReactionRule;

/// extent below which a reaction is considered not to happen
pub const DEFAULT_MIN_EXTENT: f64 = 1e-3;

/// Applies a single rule to a concentration vector with the maximal extent allowed by the
/// scarcest reactant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepApplier {
    pub min_extent: f64,
}

impl Default for StepApplier {
    fn default() -> Self {
        Self {
            min_extent: DEFAULT_MIN_EXTENT,
        }
    }
}

impl StepApplier {
    pub fn new(min_extent: f64) -> Self {
        Self { min_extent }
    }

    /// Largest m such that vector[s] - m * c_s >= 0 for every reactant s, or None if some reactant
    /// is absent, its coefficient is zero, or m is below the minimum extent.
    pub fn extent(&self, rule: &ReactionRule, vector: &ConcentrationVector) -> Option<f64> {
        if rule.reactants.is_empty() {
            return None;
        }
        let mut multiplier = f64::INFINITY;
        for term in rule.reactants.iter() {
            let available = vector.get(&term.species);
            if !(term.coefficient > 0.0) || !(available > 0.0) {
                return None;
            }
            multiplier = multiplier.min(available / term.coefficient);
        }
        if multiplier.is_finite() && multiplier > 0.0 && multiplier >= self.min_extent {
            Some(multiplier)
        } else {
            None
        }
    }

    /// (multiplier, posterior vector) if the rule can fire
    pub fn apply(
        &self,
        rule: &ReactionRule,
        vector: &ConcentrationVector,
    ) -> Option<(f64, ConcentrationVector)> {
        let multiplier = self.extent(rule, vector)?;
        let mut next = vector.clone();
        for term in rule.reactants.iter() {
            // the limiting reactant must end at exactly zero, not at a rounding residue
            let used = multiplier * term.coefficient;
            let left = next.get(&term.species) - used;
            next.set(&term.species, if left <= used * 1e-12 { 0.0 } else { left });
        }
        for term in rule.products.iter() {
            next.add(&term.species, multiplier * term.coefficient);
        }
        Some((multiplier, next))
    }
}
