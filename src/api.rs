//! # Service API
//!
//! ## Purpose
//! Typed request/response layer between a front end (web form, CLI) and the simulator. A
//! `ReactionService` holds the loaded configuration and the rule set built from it; both are
//! immutable for the lifetime of the service, so one service can be shared between threads.
//!
//! ## Operations
//! - `run_reactions`: final concentrations of a single run
//! - `run_reaction_details`: initial, final and change of a single run
//! - `run_matrix`: two-dimensional sweep, heatmap data plus the result of every cell
//! - `form_config`: what the input form needs to render itself
//! - `export_csv`: the heatmap of a sweep as CSV text
//!
//! Every operation has a `*_json` twin taking and returning JSON text.
use crate::Reactions::concentrations::ConcentrationVector;
use crate::Reactions::molmass::subscript_formula;
use crate::Reactions::reaction_errors::ReactionError;
use crate::Reactions::reaction_rules::RuleSet;
use crate::Reactions::simulator::{ResultData, simulate};
use crate::Sweep::corrosion_metrics::{CorrosionMetric, PipeInputs};
use crate::Sweep::grid::AxisRange;
use crate::Sweep::sweep_orchestrator::{
    CancellationToken, SweepError, SweepRequest, SweepResult, run_sweep,
};
use crate::config::{ConfigError, ReactionConfig};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("concentration of {species} is not a number: {value}")]
    NotANumber { species: String, value: String },
    #[error(transparent)]
    Reaction(#[from] ReactionError),
    #[error(transparent)]
    Sweep(#[from] SweepError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// response of `run_reaction_details`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionDetails {
    pub initial: ConcentrationVector,
    #[serde(rename = "final")]
    pub final_state: ConcentrationVector,
    pub change: ConcentrationVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMatrixRequest {
    /// baseline concentrations, species not given are zero
    pub inputs: BTreeMap<String, f64>,
    /// species varied along x
    pub column_value: String,
    /// species varied along y
    pub row_value: String,
    /// species or metric shown as the heatmap value
    pub value_value: String,
    #[serde(default)]
    pub pipe_inputs: Option<PipeInputs>,
    #[serde(default)]
    pub x_axis: Option<AxisRange>,
    #[serde(default)]
    pub y_axis: Option<AxisRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub grid: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            grid: "bottom to top".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMatrixResponse {
    #[serde(flatten)]
    pub sweep: SweepResult,
    pub layout: Layout,
}

/// one control of the input form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormControl {
    pub name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init: Option<f64>,
    pub needs_pipe_input: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    pub inputs: Vec<FormControl>,
    pub pipe_inputs: Vec<FormControl>,
    pub outputs: Vec<FormControl>,
    /// rule index -> equation as displayed
    pub reactions: BTreeMap<usize, String>,
    /// species -> display text
    pub molecules: BTreeMap<String, String>,
    pub column: String,
    pub row: String,
    pub value: String,
}

/// Parses a request body. The concentrations found by `inputs` are checked first, so a
/// value that is not a number is reported with its species.
fn parse_request<T: DeserializeOwned>(
    body: &str,
    inputs: impl Fn(&Value) -> &Value,
) -> Result<T, ApiError> {
    let body: Value = serde_json::from_str(body)?;
    if let Value::Object(concentrations) = inputs(&body) {
        if let Some((species, value)) = concentrations.iter().find(|(_, v)| !v.is_number()) {
            return Err(ApiError::NotANumber {
                species: species.clone(),
                value: value.to_string(),
            });
        }
    }
    Ok(serde_json::from_value(body)?)
}

pub struct ReactionService {
    config: ReactionConfig,
    rules: RuleSet,
    species: BTreeSet<String>,
}

impl ReactionService {
    pub fn new(config: ReactionConfig) -> Result<Self, ApiError> {
        let rules = config.build_rule_set()?;
        let species = config.species(&rules);
        info!(
            "service ready: {} reactions, {} species",
            rules.len(),
            species.len()
        );
        Ok(Self {
            config,
            rules,
            species,
        })
    }

    pub fn config(&self) -> &ReactionConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn species(&self) -> &BTreeSet<String> {
        &self.species
    }

    // request values merged over a zero vector of every known species
    fn baseline<'a>(
        &self,
        inputs: impl IntoIterator<Item = (&'a String, &'a f64)>,
    ) -> Result<ConcentrationVector, ApiError> {
        let mut vector = ConcentrationVector::new()
            .with_species(self.species.iter().map(|s| s.as_str()));
        for (species, value) in inputs {
            if !self.species.contains(species) {
                return Err(ApiError::UnknownSpecies(species.clone()));
            }
            vector.set(species, *value);
        }
        vector.validate()?;
        Ok(vector)
    }

    pub fn run_reactions(
        &self,
        initial: &ConcentrationVector,
    ) -> Result<ConcentrationVector, ApiError> {
        Ok(self.run_reaction_details(initial)?.final_state)
    }

    /// single run with every step kept
    pub fn simulate(&self, initial: &ConcentrationVector) -> Result<ResultData, ApiError> {
        let baseline = self.baseline(initial.iter())?;
        Ok(simulate(&baseline, &self.rules, &self.config.sweep.solver)?)
    }

    pub fn run_reaction_details(
        &self,
        initial: &ConcentrationVector,
    ) -> Result<ReactionDetails, ApiError> {
        let result = self.simulate(initial)?;
        let change = result.change();
        Ok(ReactionDetails {
            initial: result.initial,
            final_state: result.final_state,
            change,
        })
    }

    fn sweep_request(&self, request: &RunMatrixRequest) -> Result<SweepRequest, ApiError> {
        Ok(SweepRequest {
            baseline: self.baseline(request.inputs.iter())?,
            row: request.row_value.clone(),
            column: request.column_value.clone(),
            value: request.value_value.clone(),
            x_axis: request
                .x_axis
                .clone()
                .unwrap_or_else(|| self.config.x_axis.clone()),
            y_axis: request
                .y_axis
                .clone()
                .unwrap_or_else(|| self.config.y_axis.clone()),
            pipe: request.pipe_inputs.unwrap_or(self.config.pipe_inputs),
        })
    }

    pub fn run_matrix(
        &self,
        request: &RunMatrixRequest,
        cancel: &CancellationToken,
    ) -> Result<RunMatrixResponse, ApiError> {
        let sweep_request = self.sweep_request(request)?;
        let sweep = run_sweep(&sweep_request, &self.rules, &self.config.sweep, cancel)?;
        Ok(RunMatrixResponse {
            sweep,
            layout: Layout::default(),
        })
    }

    pub fn export_csv(
        &self,
        request: &RunMatrixRequest,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let response = self.run_matrix(request, cancel)?;
        Ok(response
            .sweep
            .plot
            .to_csv(&request.row_value, &request.column_value))
    }

    pub fn form_config(&self) -> FormConfig {
        let config = &self.config;
        let inputs = config
            .inputs
            .iter()
            .map(|(name, init)| FormControl {
                name: name.clone(),
                text: subscript_formula(name),
                init: Some(*init),
                needs_pipe_input: false,
            })
            .collect();
        let pipe = config.pipe_inputs;
        let pipe_inputs = [
            ("inner_diameter", "Inner diameter (inch)", pipe.inner_diameter),
            ("drop_out_length", "Drop-out length (m)", pipe.drop_out_length),
            ("flowrate", "Flowrate (Mt/y)", pipe.flowrate),
        ]
        .into_iter()
        .map(|(name, text, init)| FormControl {
            name: name.to_string(),
            text: text.to_string(),
            init: Some(init),
            needs_pipe_input: false,
        })
        .collect();
        let outputs = config
            .outputs
            .iter()
            .map(|name| match CorrosionMetric::from_name(name) {
                Some(metric) => FormControl {
                    name: name.clone(),
                    text: metric.text().to_string(),
                    init: None,
                    needs_pipe_input: true,
                },
                None => FormControl {
                    name: name.clone(),
                    text: subscript_formula(name),
                    init: None,
                    needs_pipe_input: false,
                },
            })
            .collect();
        let reactions = self
            .rules
            .rules()
            .iter()
            .map(|rule| (rule.index, rule.to_string()))
            .collect();
        let molecules = self
            .species
            .iter()
            .map(|s| (s.clone(), subscript_formula(s)))
            .collect();
        FormConfig {
            inputs,
            pipe_inputs,
            outputs,
            reactions,
            molecules,
            column: config.column.clone(),
            row: config.row.clone(),
            value: config.value.clone(),
        }
    }

    pub fn run_reactions_json(&self, body: &str) -> Result<String, ApiError> {
        let initial: ConcentrationVector = parse_request(body, |body| body)?;
        Ok(serde_json::to_string(&self.run_reactions(&initial)?)?)
    }

    pub fn run_reaction_details_json(&self, body: &str) -> Result<String, ApiError> {
        let initial: ConcentrationVector = parse_request(body, |body| body)?;
        Ok(serde_json::to_string(&self.run_reaction_details(&initial)?)?)
    }

    pub fn run_matrix_json(
        &self,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let request: RunMatrixRequest = parse_request(body, |body| &body["inputs"])?;
        Ok(serde_json::to_string(&self.run_matrix(&request, cancel)?)?)
    }

    pub fn export_csv_json(
        &self,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let request: RunMatrixRequest = parse_request(body, |body| &body["inputs"])?;
        self.export_csv(&request, cancel)
    }

    pub fn form_config_json(&self) -> Result<String, ApiError> {
        Ok(serde_json::to_string(&self.form_config())?)
    }
}
