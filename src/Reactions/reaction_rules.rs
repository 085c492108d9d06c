//! Reaction rules and ordered rule sets.
//!
//! A rule is parsed from an equation like `"H2S + 3 NO2 -> SO2 + H2O + 3 NO"`. The position of a
//! rule in its [`RuleSet`] is its priority; the `index` is only an identity used for display.
use super::molmass::{Groups, create_elem_composition_matrix, subscript_formula};
use super::reaction_errors::ReactionError;
use log::{debug, info};
use nalgebra::DVector;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::OnceLock;

/// residual below which a rule counts as element-balanced
const BALANCE_TOLERANCE: f64 = 1e-9;

fn term_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)?\s*([A-Z][A-Za-z0-9()]*)$").expect("valid term regex")
    })
}

/// species with its stoichiometric coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoichTerm {
    pub species: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRule {
    pub index: usize,
    pub reactants: Vec<StoichTerm>,
    pub products: Vec<StoichTerm>,
}

fn equation_error(equation: &str, reason: impl Into<String>) -> ReactionError {
    ReactionError::Equation {
        equation: equation.to_string(),
        reason: reason.into(),
    }
}

// "2 NO + O2" -> [(NO, 2), (O2, 1)], repeated species are summed
fn parse_side(equation: &str, side: &str) -> Result<Vec<StoichTerm>, ReactionError> {
    let mut terms: Vec<StoichTerm> = Vec::new();
    for raw in side.split('+') {
        let term = raw.trim();
        if term.is_empty() {
            return Err(equation_error(equation, "empty term"));
        }
        let caps = term_regex()
            .captures(term)
            .ok_or_else(|| equation_error(equation, format!("cannot parse term '{}'", term)))?;
        let coefficient = match caps.get(1) {
            Some(c) => c
                .as_str()
                .parse::<f64>()
                .map_err(|e| equation_error(equation, e.to_string()))?,
            None => 1.0,
        };
        if !(coefficient.is_finite() && coefficient > 0.0) {
            return Err(equation_error(
                equation,
                format!("coefficient of '{}' must be positive", term),
            ));
        }
        let species = caps[2].to_string();
        match terms.iter_mut().find(|t| t.species == species) {
            Some(existing) => existing.coefficient += coefficient,
            None => terms.push(StoichTerm {
                species,
                coefficient,
            }),
        }
    }
    Ok(terms)
}

impl ReactionRule {
    /// Parses an equation `lhs -> rhs`. Arrows `->`, `=>` and `→` are accepted,
    /// a trailing `; rate` is ignored.
    pub fn parse(index: usize, equation: &str) -> Result<Self, ReactionError> {
        let reaction_part = equation.split(';').next().unwrap_or_default().trim();
        let arrow = ["->", "=>", "→"]
            .iter()
            .find(|a| reaction_part.contains(**a))
            .ok_or_else(|| equation_error(equation, "no arrow between reactants and products"))?;
        let mut sides = reaction_part.split(*arrow);
        let (Some(lhs), Some(rhs), None) = (sides.next(), sides.next(), sides.next()) else {
            return Err(equation_error(equation, "more than one arrow"));
        };
        let reactants = parse_side(equation, lhs)?;
        let products = parse_side(equation, rhs)?;
        debug!(
            "parsed reaction {}: {:?} -> {:?}",
            index, reactants, products
        );
        Ok(Self {
            index,
            reactants,
            products,
        })
    }

    /// every species of the rule, reactants first
    pub fn species(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|t| t.species.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// net stoichiometric coefficient of a species: products minus reactants
    pub fn net_coefficient(&self, species: &str) -> f64 {
        let sum = |terms: &[StoichTerm]| -> f64 {
            terms
                .iter()
                .filter(|t| t.species == species)
                .map(|t| t.coefficient)
                .sum()
        };
        sum(self.products.as_slice()) - sum(self.reactants.as_slice())
    }

    /// Checks that atoms are conserved: E^T * nu = 0 where E is the element composition
    /// matrix of the species of the rule and nu the vector of net stoichiometric coefficients.
    pub fn element_balance(&self, groups: Option<&Groups>) -> Result<(), ReactionError> {
        let species = self.species();
        let (composition, elements) = create_elem_composition_matrix(&species, groups)?;
        let nu = DVector::from_iterator(
            species.len(),
            species.iter().map(|s| self.net_coefficient(s)),
        );
        let residual = composition.transpose() * nu;
        for (element, r) in elements.iter().zip(residual.iter()) {
            if r.abs() > BALANCE_TOLERANCE {
                return Err(ReactionError::Unbalanced {
                    index: self.index,
                    equation: self.to_string(),
                    element: element.clone(),
                    residual: *r,
                });
            }
        }
        Ok(())
    }
}

fn format_side(terms: &[StoichTerm]) -> String {
    terms
        .iter()
        .map(|t| {
            let name = subscript_formula(&t.species);
            if t.coefficient == 1.0 {
                name
            } else {
                format!("{} {}", t.coefficient, name)
            }
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

impl fmt::Display for ReactionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            format_side(&self.reactants),
            format_side(&self.products)
        )
    }
}

/// Ordered, immutable list of rules. The order is the priority order of the fixpoint scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RuleSet {
    rules: Vec<ReactionRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ReactionRule>) -> Result<Self, ReactionError> {
        let mut indices = HashSet::new();
        for rule in rules.iter() {
            if !indices.insert(rule.index) {
                return Err(ReactionError::DuplicateIndex(rule.index));
            }
        }
        Ok(Self { rules })
    }

    /// builds a rule set from (index, equation) pairs given in priority order
    pub fn from_equations(equations: &[(usize, &str)]) -> Result<Self, ReactionError> {
        let rules = equations
            .iter()
            .map(|(index, eq)| ReactionRule::parse(*index, eq))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    /// checks every rule for conservation of elements
    pub fn check_element_balance(&self, groups: Option<&Groups>) -> Result<(), ReactionError> {
        for rule in self.rules.iter() {
            rule.element_balance(groups)?;
        }
        info!("all {} reactions are element-balanced", self.rules.len());
        Ok(())
    }

    pub fn rules(&self) -> &[ReactionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ReactionRule> {
        self.rules.get(position)
    }

    pub fn by_index(&self, index: usize) -> Option<&ReactionRule> {
        self.rules.iter().find(|r| r.index == index)
    }

    /// sorted set of all species appearing in any rule
    pub fn species(&self) -> BTreeSet<String> {
        self.rules
            .iter()
            .flat_map(|r| r.species())
            .map(|s| s.to_string())
            .collect()
    }
}
