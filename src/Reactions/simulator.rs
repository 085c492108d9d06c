use super::concentrations::ConcentrationVector;
use super::fixpoint::{FixpointDriver, SolverSettings, StepRecord};
use super::reaction_errors::ReactionError;
use super::reaction_rules::RuleSet;
use log::{debug, warn};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};

/// complete result of one simulation: where it started, where it stopped,
/// what was ever produced and every step on the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    pub initial: ConcentrationVector,
    #[serde(rename = "final")]
    pub final_state: ConcentrationVector,
    pub aggregated: ConcentrationVector,
    pub steps: Vec<StepRecord>,
}

impl ResultData {
    /// final - initial for every species
    pub fn change(&self) -> ConcentrationVector {
        self.final_state.difference(&self.initial)
    }

    /// Table with one row per state: the initial vector, every step and the aggregated totals
    pub fn steps_table(&self, rules: &RuleSet) -> Table {
        let header = self.final_state.species();
        let mut table = Table::new();
        let mut header_row = vec![Cell::new("step"), Cell::new("reaction")];
        header_row.extend(header.iter().map(|s| Cell::new(s)));
        table.add_row(Row::new(header_row));

        let mut initial_row = self.initial.table_row(&header, 1);
        initial_row.insert_cell(0, Cell::new("initial"));
        initial_row.insert_cell(0, Cell::new("0"));
        table.add_row(initial_row);
        for (i, step) in self.steps.iter().enumerate() {
            let description = match rules.by_index(step.rule_index) {
                Some(rule) => format!("eq {} * {:.3} : {}", step.rule_index, step.multiplier, rule),
                None => format!("eq {} * {:.3}", step.rule_index, step.multiplier),
            };
            let mut row = step.concentrations.table_row(&header, 1);
            row.insert_cell(0, Cell::new(&description));
            row.insert_cell(0, Cell::new(&(i + 1).to_string()));
            table.add_row(row);
        }
        let mut aggregated_row = self.aggregated.table_row(&header, 1);
        aggregated_row.insert_cell(0, Cell::new("aggregated"));
        aggregated_row.insert_cell(0, Cell::new(""));
        table.add_row(aggregated_row);
        table
    }
}

/// Runs the rules to a fixpoint. The initial vector is validated and completed with zeros for
/// every species of the rule set, so the result always lists all species.
pub fn simulate(
    initial: &ConcentrationVector,
    rules: &RuleSet,
    settings: &SolverSettings,
) -> Result<ResultData, ReactionError> {
    settings.validate()?;
    initial.validate()?;
    let species = rules.species();
    let initial = initial
        .clone()
        .with_species(species.iter().map(|s| s.as_str()));
    let driver = FixpointDriver::new(rules, settings);
    let run = driver.run(initial.clone()).inspect_err(|e| {
        warn!("simulation failed: {}", e);
    })?;
    debug!(
        "fixpoint reached after {} steps of {} reactions",
        run.steps.len(),
        rules.len()
    );
    Ok(ResultData {
        initial,
        final_state: run.final_vector,
        aggregated: run.aggregated,
        steps: run.steps,
    })
}
