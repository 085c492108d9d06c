use super::concentrations::ConcentrationVector;
use thiserror::Error;

/// errors of parsing reaction equations, building rule sets and running the fixpoint simulation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReactionError {
    #[error("cannot parse formula '{formula}': {reason}")]
    Formula { formula: String, reason: String },
    #[error("cannot parse equation '{equation}': {reason}")]
    Equation { equation: String, reason: String },
    #[error("reaction {index} ({equation}) is not balanced in element {element}: residual {residual}")]
    Unbalanced {
        index: usize,
        equation: String,
        element: String,
        residual: f64,
    },
    #[error("duplicate reaction index {0}")]
    DuplicateIndex(usize),
    #[error("invalid concentration of {species}: {value}")]
    InvalidConcentration { species: String, value: f64 },
    #[error("invalid solver settings: {0}")]
    InvalidSettings(String),
    #[error("no fixpoint reached after {steps} steps")]
    DidNotConverge {
        steps: usize,
        last: ConcentrationVector,
    },
}
