//! # Configuration Module
//!
//! ## Purpose
//! Everything the simulator and the sweep need besides the concentrations: the reactions in
//! their priority order, the default inputs shown in the forms, pipe parameters, the outputs
//! that can be plotted, the default sweep axes and the solver limits.
//!
//! The configuration is read once at start-up from a JSON file (`reaction_config.json` by
//! default). If the file does not exist the built-in defaults are used, so a fresh checkout
//! works without any file. The loaded value is immutable and is handed explicitly to whoever
//! needs it.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "reactions": [
//!     { "index": 3, "equation": "H2S + 3 NO2 -> SO2 + H2O + 3 NO" },
//!     { "index": 5, "equation": "2 NO2 + H2O -> HNO3 + HNO2", "active": false }
//!   ],
//!   "inputs": { "H2O": 30.0, "O2": 30.0 },
//!   "column": "O2",
//!   "row": "NO2",
//!   "value": "H2SO4",
//!   "sweep": { "solver": { "max_steps": 10000, "min_extent": 0.001 }, "threads": 4 }
//! }
//! ```
//! Missing fields take their default values.

use crate::Reactions::molmass::Groups;
use crate::Reactions::reaction_errors::ReactionError;
use crate::Reactions::reaction_rules::{ReactionRule, RuleSet};
use crate::Sweep::corrosion_metrics::{CorrosionMetric, PipeInputs};
use crate::Sweep::grid::AxisRange;
use crate::Sweep::sweep_orchestrator::SweepSettings;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "reaction_config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reaction {index} in configuration: {source}")]
    Reaction {
        index: usize,
        #[source]
        source: ReactionError,
    },
    #[error("invalid rule set: {0}")]
    RuleSet(#[from] ReactionError),
}

fn default_true() -> bool {
    true
}

/// one reaction of the configuration; inactive reactions are kept for reference but never applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub index: usize,
    pub equation: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ReactionEntry {
    fn new(index: usize, equation: &str, active: bool) -> Self {
        Self {
            index,
            equation: equation.to_string(),
            active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// reactions in priority order
    pub reactions: Vec<ReactionEntry>,
    /// input species and their default concentrations
    pub inputs: BTreeMap<String, f64>,
    pub pipe_inputs: PipeInputs,
    /// species and metrics that can be shown as results
    pub outputs: Vec<String>,
    /// default species of the x axis
    pub column: String,
    /// default species of the y axis
    pub row: String,
    /// default heatmap value
    pub value: String,
    pub x_axis: AxisRange,
    pub y_axis: AxisRange,
    pub sweep: SweepSettings,
    /// chemical groups used in formulae, e.g. {"Me": {"C": 1, "H": 3}}
    pub groups: Option<Groups>,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        let reactions = vec![
            ReactionEntry::new(3, "H2S + 3 NO2 -> SO2 + H2O + 3 NO", true),
            ReactionEntry::new(2, "2 NO + O2 -> 2 NO2", true),
            ReactionEntry::new(1, "NO2 + SO2 + H2O -> NO + H2SO4", true),
            ReactionEntry::new(4, "3 NO2 + H2O -> 2 HNO3 + NO", true),
            ReactionEntry::new(5, "2 NO2 + H2O -> HNO3 + HNO2", false),
            ReactionEntry::new(6, "8 H2S + 4 O2 -> 8 H2O + S8", true),
        ];
        let inputs = [
            ("H2O", 30.0),
            ("O2", 30.0),
            ("SO2", 10.0),
            ("NO2", 20.0),
            ("H2S", 0.0),
        ]
        .into_iter()
        .map(|(s, v)| (s.to_string(), v))
        .collect();
        let outputs = [
            "H2SO4",
            "HNO3",
            "NO",
            "HNO2",
            "S8",
            "H2SO4_corrosion",
            "HNO3_corrosion",
            "corrosion_rate",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        Self {
            reactions,
            inputs,
            pipe_inputs: PipeInputs::default(),
            outputs,
            column: "O2".to_string(),
            row: "NO2".to_string(),
            value: "H2SO4".to_string(),
            x_axis: AxisRange::default(),
            y_axis: AxisRange::default(),
            sweep: SweepSettings::default(),
            groups: None,
        }
    }
}

impl ReactionConfig {
    /// Reads the configuration from a JSON file that must exist
    pub fn load(config_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_file.as_ref())?;
        let config: ReactionConfig = serde_json::from_str(&content)?;
        info!(
            "configuration loaded from {}: {} reactions",
            config_file.as_ref().display(),
            config.reactions.len()
        );
        Ok(config)
    }

    /// Reads the configuration file if it exists, otherwise returns the defaults.
    /// A file that exists but cannot be parsed is an error.
    pub fn load_or_default(config_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if config_file.as_ref().exists() {
            Self::load(config_file)
        } else {
            info!(
                "no configuration file {}, using defaults",
                config_file.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn save(&self, config_file: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_file, content)?;
        Ok(())
    }

    /// Parses the active reactions in their configured order and checks each of them for
    /// conservation of elements
    pub fn build_rule_set(&self) -> Result<RuleSet, ConfigError> {
        let mut rules = Vec::new();
        for entry in self.reactions.iter().filter(|e| e.active) {
            let to_config_error = |source| ConfigError::Reaction {
                index: entry.index,
                source,
            };
            let rule = ReactionRule::parse(entry.index, &entry.equation).map_err(to_config_error)?;
            rule.element_balance(self.groups.as_ref())
                .map_err(to_config_error)?;
            rules.push(rule);
        }
        let rule_set = RuleSet::new(rules)?;
        info!(
            "rule set built: {} active of {} configured reactions",
            rule_set.len(),
            self.reactions.len()
        );
        Ok(rule_set)
    }

    /// species of the rules, the inputs and the outputs (metrics excluded)
    pub fn species(&self, rules: &RuleSet) -> BTreeSet<String> {
        let mut species = rules.species();
        species.extend(self.inputs.keys().cloned());
        species.extend(
            self.outputs
                .iter()
                .filter(|o| CorrosionMetric::from_name(o).is_none())
                .cloned(),
        );
        species
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_rule_set() {
        let config = ReactionConfig::default();
        let rules = config.build_rule_set().unwrap();
        // reaction 5 is inactive
        let order: Vec<usize> = rules.rules().iter().map(|r| r.index).collect();
        assert_eq!(order, vec![3, 2, 1, 4, 6]);
        let species = config.species(&rules);
        assert!(species.contains("HNO2"));
        assert!(species.contains("S8"));
        assert!(!species.contains("corrosion_rate"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut config_file = NamedTempFile::new().unwrap();
        config_file
            .write_all(
                br#"{
                    "reactions": [
                        {"index": 2, "equation": "2 NO + O2 -> 2 NO2"},
                        {"index": 1, "equation": "NO2 + SO2 + H2O -> NO + H2SO4", "active": false}
                    ],
                    "row": "NO",
                    "sweep": {"solver": {"max_steps": 100}}
                }"#,
            )
            .unwrap();
        let config = ReactionConfig::load(config_file.path()).unwrap();
        assert_eq!(config.row, "NO");
        assert_eq!(config.column, "O2");
        assert_eq!(config.sweep.solver.max_steps, 100);
        assert_eq!(config.sweep.solver.min_extent, 1e-3);
        assert!(!config.reactions[1].active);
        let rules = config.build_rule_set().unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let config = ReactionConfig::load_or_default(&missing).unwrap();
        assert_eq!(config, ReactionConfig::default());

        let mut broken = NamedTempFile::new().unwrap();
        broken.write_all(b"{ not json").unwrap();
        assert!(matches!(
            ReactionConfig::load_or_default(broken.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut config = ReactionConfig::default();
        config.sweep.threads = Some(3);
        config.x_axis = AxisRange::Values(vec![1.0, 2.0]);
        config.save(&path).unwrap();
        let loaded = ReactionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unbalanced_reaction_is_rejected() {
        let mut config = ReactionConfig::default();
        config
            .reactions
            .push(ReactionEntry::new(7, "NO2 + H2O -> HNO3", true));
        match config.build_rule_set() {
            Err(ConfigError::Reaction { index, source }) => {
                assert_eq!(index, 7);
                assert!(matches!(source, ReactionError::Unbalanced { .. }));
            }
            other => panic!("expected unbalanced reaction error, got {:?}", other),
        }
    }
}
