use super::corrosion_metrics::{CorrosionMetric, PipeInputs};
use super::grid::{AxisRange, DEFAULT_MAX_CELLS, Grid};
use crate::Reactions::concentrations::ConcentrationVector;
use crate::Reactions::fixpoint::SolverSettings;
use crate::Reactions::reaction_errors::ReactionError;
use crate::Reactions::reaction_rules::RuleSet;
use crate::Reactions::simulator::{ResultData, simulate};
use log::{info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("unknown selector '{name}' for {role}")]
    UnknownSelector { role: &'static str, name: String },
    #[error("row and column both vary '{0}'")]
    DegenerateAxes(String),
    #[error("invalid axis: {0}")]
    InvalidAxis(String),
    #[error("sweep cancelled")]
    Cancelled,
    #[error("cannot build thread pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Simulation(#[from] ReactionError),
}

/// Flag shared between a sweep and whoever may supersede it. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// what becomes the heatmap value of a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSelector {
    Metric(CorrosionMetric),
    Species(String),
}

impl ValueSelector {
    /// metric names win over species names
    pub fn resolve(name: &str, known_species: &BTreeSet<String>) -> Result<Self, SweepError> {
        if let Some(metric) = CorrosionMetric::from_name(name) {
            Ok(ValueSelector::Metric(metric))
        } else if known_species.contains(name) {
            Ok(ValueSelector::Species(name.to_string()))
        } else {
            Err(SweepError::UnknownSelector {
                role: "value",
                name: name.to_string(),
            })
        }
    }

    pub fn evaluate(&self, final_state: &ConcentrationVector, pipe: &PipeInputs) -> f64 {
        match self {
            ValueSelector::Species(species) => final_state.get(species),
            ValueSelector::Metric(metric) => metric.evaluate(final_state, pipe),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepRequest {
    pub baseline: ConcentrationVector,
    /// species varied along y
    pub row: String,
    /// species varied along x
    pub column: String,
    pub value: String,
    pub x_axis: AxisRange,
    pub y_axis: AxisRange,
    pub pipe: PipeInputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub solver: SolverSettings,
    /// size of a dedicated worker pool, None for the global pool (one worker per core)
    pub threads: Option<usize>,
    /// largest number of cells of one sweep
    pub max_cells: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            solver: SolverSettings::default(),
            threads: None,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

/// result of one cell: the full simulation or why it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellOutcome {
    Completed(ResultData),
    Failed { error: String },
}

impl CellOutcome {
    pub fn result(&self) -> Option<&ResultData> {
        match self {
            CellOutcome::Completed(result) => Some(result),
            CellOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub plot: Grid,
    #[serde(rename = "resultData")]
    pub result_data: Vec<Vec<CellOutcome>>,
}

impl SweepResult {
    pub fn failed_cells(&self) -> usize {
        self.result_data
            .iter()
            .flatten()
            .filter(|c| matches!(c, CellOutcome::Failed { .. }))
            .count()
    }
}

fn check_axis_species(
    role: &'static str,
    name: &str,
    known_species: &BTreeSet<String>,
) -> Result<(), SweepError> {
    if known_species.contains(name) {
        Ok(())
    } else {
        Err(SweepError::UnknownSelector {
            role,
            name: name.to_string(),
        })
    }
}

fn run_cell(
    initial: ConcentrationVector,
    rules: &RuleSet,
    solver: &SolverSettings,
    selector: &ValueSelector,
    pipe: &PipeInputs,
) -> (f64, CellOutcome) {
    match simulate(&initial, rules, solver) {
        Ok(result) => (
            selector.evaluate(&result.final_state, pipe),
            CellOutcome::Completed(result),
        ),
        Err(e) => (f64::NAN, CellOutcome::Failed { error: e.to_string() }),
    }
}

/// Runs the simulation once per (y[i], x[j]) cell on a worker pool.
///
/// Selectors are checked against the species of the rules and of the baseline before any
/// simulation starts. A failing cell is marked with NaN and an error, the other cells go on.
/// A cancelled sweep never returns a partial grid.
pub fn run_sweep(
    request: &SweepRequest,
    rules: &RuleSet,
    settings: &SweepSettings,
    cancel: &CancellationToken,
) -> Result<SweepResult, SweepError> {
    let mut known_species = rules.species();
    known_species.extend(request.baseline.species().iter().map(|s| s.to_string()));
    check_axis_species("row", &request.row, &known_species)?;
    check_axis_species("column", &request.column, &known_species)?;
    if request.row == request.column {
        return Err(SweepError::DegenerateAxes(request.row.clone()));
    }
    let selector = ValueSelector::resolve(&request.value, &known_species)?;
    let x = request.x_axis.values_within(settings.max_cells)?;
    let y = request.y_axis.values_within(settings.max_cells)?;
    let cell_count = y
        .len()
        .checked_mul(x.len())
        .filter(|cells| *cells <= settings.max_cells)
        .ok_or_else(|| {
            SweepError::InvalidAxis(format!(
                "{} x {} cells, at most {} are allowed",
                y.len(),
                x.len(),
                settings.max_cells
            ))
        })?;
    settings.solver.validate()?;
    request.baseline.validate()?;

    let (n, m) = (y.len(), x.len());
    info!(
        "sweeping {} over {} rows and {} over {} columns ({} cells), value {}",
        request.row, n, request.column, m, cell_count, request.value
    );
    let start = Instant::now();
    let compute = || -> Vec<Option<(f64, CellOutcome)>> {
        (0..cell_count)
            .into_par_iter()
            .map(|k| {
                if cancel.is_cancelled() {
                    return None;
                }
                let (i, j) = (k / m, k % m);
                let mut initial = request.baseline.clone();
                initial.set(&request.row, y[i]);
                initial.set(&request.column, x[j]);
                Some(run_cell(
                    initial,
                    rules,
                    &settings.solver,
                    &selector,
                    &request.pipe,
                ))
            })
            .collect()
    };
    let cells = match settings.threads {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SweepError::ThreadPool(e.to_string()))?
            .install(compute),
        None => compute(),
    };
    if cancel.is_cancelled() {
        warn!("sweep cancelled, {} cells discarded", cells.len());
        return Err(SweepError::Cancelled);
    }
    let cells = cells
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(SweepError::Cancelled)?;

    let mut z = Vec::with_capacity(n);
    let mut result_data = Vec::with_capacity(n);
    let mut cells = cells.into_iter();
    for _ in 0..n {
        let (values, outcomes): (Vec<f64>, Vec<CellOutcome>) = cells.by_ref().take(m).unzip();
        z.push(values);
        result_data.push(outcomes);
    }
    let result = SweepResult {
        plot: Grid { x, y, z },
        result_data,
    };
    let failed = result.failed_cells();
    if failed > 0 {
        warn!("{} of {} cells failed", failed, cell_count);
    }
    info!("sweep of {} cells done in {:?}", cell_count, start.elapsed());
    Ok(result)
}
