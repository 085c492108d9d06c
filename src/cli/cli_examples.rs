use super::cli_main::get_user_input;
use crate::Reactions::concentrations::ConcentrationVector;
use crate::Reactions::fixpoint::SolverSettings;
use crate::Reactions::reaction_rules::RuleSet;
use crate::Reactions::simulator::simulate;
use crate::Sweep::corrosion_metrics::{CorrosionMetric, PipeInputs};
use crate::config::ReactionConfig;
use prettytable::{Cell, Table, row};
use std::error::Error;
use std::io::{self, Write};

pub fn examples_menu() -> io::Result<()> {
    loop {
        println!("\n=== Examples ===");
        println!("1. Sulphuric and nitric acid formation");
        println!("2. Reference cases of the default reactions");
        println!("3. Corrosion rates");
        println!("0. Back to main menu");
        print!("Enter your choice: ");
        io::stdout().flush()?;

        let choice = get_user_input()?;
        let outcome = match choice.trim() {
            "1" => acid_formation_example(),
            "2" => reference_cases_example(),
            "3" => corrosion_example(),
            "0" => break,
            _ => {
                println!("Invalid choice. Please try again.");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            println!("\x1b[31m{}\x1b[0m", e);
        }
    }
    Ok(())
}

fn concentrations(values: &[(&str, f64)]) -> ConcentrationVector {
    values.iter().map(|(s, v)| (*s, *v)).collect()
}

/// H2S is oxidised by NO2, NO is recycled by O2 and both acids form
fn acid_formation_example() -> Result<(), Box<dyn Error>> {
    let rules = RuleSet::from_equations(&[
        (3, "H2S + 3 NO2 -> SO2 + H2O + 3 NO"),
        (2, "2 NO + O2 -> 2 NO2"),
        (1, "NO2 + SO2 + H2O -> NO + H2SO4"),
        (4, "3 NO2 + H2O -> 2 HNO3 + NO"),
    ])?;
    rules.check_element_balance(None)?;
    let initial = concentrations(&[
        ("H2O", 40.0),
        ("O2", 30.0),
        ("SO2", 0.0),
        ("NO2", 20.0),
        ("H2S", 10.0),
    ]);
    let result = simulate(&initial, &rules, &SolverSettings::default())?;
    result.steps_table(&rules).printstd();
    println!("change:\n{}", result.change());
    Ok(())
}

fn reference_cases_example() -> Result<(), Box<dyn Error>> {
    let rules = ReactionConfig::default().build_rule_set()?;
    let cases = [
        [("H2O", 40.0), ("O2", 15.0), ("NO2", 15.0), ("H2S", 3.0)],
        [("H2O", 20.0), ("O2", 15.0), ("NO2", 15.0), ("H2S", 3.0)],
        [("H2O", 20.0), ("O2", 5.0), ("NO2", 8.0), ("H2S", 3.0)],
        [("H2O", 20.0), ("O2", 5.0), ("NO2", 8.0), ("H2S", 7.0)],
    ];
    for (i, case) in cases.iter().enumerate() {
        let result = simulate(&concentrations(case), &rules, &SolverSettings::default())?;
        println!("\ncase {}: {} steps", i + 1, result.steps.len());
        let header = result.final_state.species();
        let mut table = Table::new();
        let mut header_row = row![""];
        for species in header.iter() {
            header_row.add_cell(Cell::new(species));
        }
        table.add_row(header_row);
        let mut initial_row = result.initial.table_row(&header, 1);
        initial_row.insert_cell(0, Cell::new("initial"));
        table.add_row(initial_row);
        let mut final_row = result.final_state.table_row(&header, 1);
        final_row.insert_cell(0, Cell::new("final"));
        table.add_row(final_row);
        table.printstd();
    }
    Ok(())
}

fn corrosion_example() -> Result<(), Box<dyn Error>> {
    let pipe = PipeInputs {
        inner_diameter: 36.0,
        drop_out_length: 1000.0,
        flowrate: 20.0,
    };
    let acids = concentrations(&[("H2SO4", 3.0), ("HNO3", 4.0)]);
    let mut table = Table::new();
    table.add_row(row!["metric", "mm/y"]);
    for metric in CorrosionMetric::ALL {
        table.add_row(row![metric.text(), format!("{:.4}", metric.evaluate(&acids, &pipe))]);
    }
    println!(
        "pipe: {} inch, {} m, {} Mt/y; acids: {}",
        pipe.inner_diameter, pipe.drop_out_length, pipe.flowrate, acids
    );
    table.printstd();
    Ok(())
}
