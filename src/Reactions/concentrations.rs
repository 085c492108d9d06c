use super::reaction_errors::ReactionError;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Quantities of species, ordered by species name. Absent species read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcentrationVector(BTreeMap<String, f64>);

impl ConcentrationVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, species: &str) -> f64 {
        self.0.get(species).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, species: &str, value: f64) {
        self.0.insert(species.to_string(), value);
    }

    pub fn add(&mut self, species: &str, delta: f64) {
        *self.0.entry(species.to_string()).or_insert(0.0) += delta;
    }

    pub fn contains(&self, species: &str) -> bool {
        self.0.contains_key(species)
    }

    /// inserts zero for every listed species that is not present yet
    pub fn with_species<'a>(mut self, species: impl IntoIterator<Item = &'a str>) -> Self {
        for s in species {
            self.0.entry(s.to_string()).or_insert(0.0);
        }
        self
    }

    pub fn species(&self) -> Vec<&str> {
        self.0.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// every quantity must be finite and non-negative
    pub fn validate(&self) -> Result<(), ReactionError> {
        match self.0.iter().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            Some((species, value)) => Err(ReactionError::InvalidConcentration {
                species: species.clone(),
                value: *value,
            }),
            None => Ok(()),
        }
    }

    /// self - other over the union of species
    pub fn difference(&self, other: &ConcentrationVector) -> ConcentrationVector {
        let mut diff = self.clone().with_species(other.species());
        for (species, value) in diff.0.iter_mut() {
            *value -= other.get(species);
        }
        diff
    }

    /// one row of numbers, columns ordered as in the header
    pub fn table_row(&self, header: &[&str], precision: usize) -> Row {
        Row::new(
            header
                .iter()
                .map(|s| Cell::new(&format!("{:.*}", precision, self.get(s))))
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ConcentrationVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(s, v)| (s.into(), v)).collect())
    }
}

impl From<BTreeMap<String, f64>> for ConcentrationVector {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl fmt::Display for ConcentrationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.species();
        let mut table = Table::new();
        table.add_row(Row::new(header.iter().map(|s| Cell::new(s)).collect()));
        table.add_row(self.table_row(&header, 3));
        write!(f, "{}", table)
    }
}
