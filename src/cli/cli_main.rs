use super::cli_examples::examples_menu;
use crate::Reactions::concentrations::ConcentrationVector;
use crate::Reactions::molmass::calculate_molar_mass;
use crate::Sweep::grid::Grid;
use crate::Sweep::sweep_orchestrator::CancellationToken;
use crate::api::{ReactionService, RunMatrixRequest};
use prettytable::{Cell, Row, Table, row};
use std::fs;
use std::io::{self, Write};

pub fn run_interactive_menu(service: &ReactionService) -> io::Result<()> {
    loop {
        show_main_menu()?;
        let choice = get_user_input()?;

        match choice.trim() {
            "1" => single_run_menu(service)?,
            "2" => sweep_menu(service)?,
            "3" => show_configuration(service),
            "4" => examples_menu()?,
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
    Ok(())
}
/* colors
Blue (\x1b[34m) - Welcome header text
Yellow (\x1b[33m) - Menu options
Cyan (\x1b[36m) - prompts
Red (\x1b[31m) - errors
Reset (\x1b[0m) - Returns to normal color after each colored section
*/
fn show_main_menu() -> io::Result<()> {
    println!(
        "\x1b[34m\n Welcome to CO2Spec: reactions of impurities in dense CO2 streams\n
    and the corrosion they cause \n \x1b[0m"
    );
    println!("\x1b[33m1. Single run\x1b[0m");
    println!("\x1b[33m2. Parameter sweep\x1b[0m");
    println!("\x1b[33m3. Show configuration\x1b[0m");
    println!("\x1b[33m4. Examples\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    print!("\x1b[36mEnter your choice: \x1b[0m");
    io::stdout().flush()
}

pub(crate) fn get_user_input() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

// prompt showing the default; an empty answer keeps it
fn ask(prompt: &str, default: &str) -> io::Result<String> {
    print!("\x1b[36m{} [{}]: \x1b[0m", prompt, default);
    io::stdout().flush()?;
    let answer = get_user_input()?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

fn ask_number(prompt: &str, default: f64) -> io::Result<f64> {
    loop {
        let answer = ask(prompt, &default.to_string())?;
        match answer.parse::<f64>() {
            Ok(value) => return Ok(value),
            Err(_) => println!("\x1b[31m'{}' is not a number\x1b[0m", answer),
        }
    }
}

fn ask_inputs(service: &ReactionService) -> io::Result<ConcentrationVector> {
    let mut initial = ConcentrationVector::new();
    for (species, default) in service.config().inputs.iter() {
        initial.set(species, ask_number(species, *default)?);
    }
    Ok(initial)
}

fn single_run_menu(service: &ReactionService) -> io::Result<()> {
    println!("\n=== Single run ===");
    let initial = ask_inputs(service)?;
    match service.simulate(&initial) {
        Ok(result) => {
            result.steps_table(service.rules()).printstd();
            println!("final state:\n{}", result.final_state);
        }
        Err(e) => println!("\x1b[31m{}\x1b[0m", e),
    }
    Ok(())
}

/// heatmap as a table with the largest row value on top
fn heatmap_table(grid: &Grid, row_label: &str, column_label: &str) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new(&format!("{}\\{}", row_label, column_label))];
    header.extend(grid.x.iter().map(|x| Cell::new(&x.to_string())));
    table.add_row(Row::new(header));
    for (y, values) in grid.y.iter().zip(grid.z.iter()).rev() {
        let mut cells = vec![Cell::new(&y.to_string())];
        cells.extend(values.iter().map(|v| {
            if v.is_nan() {
                Cell::new("-")
            } else {
                Cell::new(&format!("{:.3}", v))
            }
        }));
        table.add_row(Row::new(cells));
    }
    table
}

fn sweep_menu(service: &ReactionService) -> io::Result<()> {
    println!("\n=== Parameter sweep ===");
    let config = service.config();
    let initial = ask_inputs(service)?;
    let request = RunMatrixRequest {
        inputs: initial
            .iter()
            .map(|(species, value)| (species.clone(), *value))
            .collect(),
        column_value: ask("species along x", &config.column)?,
        row_value: ask("species along y", &config.row)?,
        value_value: ask("heatmap value", &config.value)?,
        pipe_inputs: None,
        x_axis: None,
        y_axis: None,
    };
    let response = match service.run_matrix(&request, &CancellationToken::new()) {
        Ok(response) => response,
        Err(e) => {
            println!("\x1b[31m{}\x1b[0m", e);
            return Ok(());
        }
    };
    let grid = &response.sweep.plot;
    println!("{}", request.value_value);
    heatmap_table(grid, &request.row_value, &request.column_value).printstd();
    let failed = response.sweep.failed_cells();
    if failed > 0 {
        println!("\x1b[31m{} cells did not converge\x1b[0m", failed);
    }
    let path = ask("save as CSV (empty to skip)", "")?;
    if !path.is_empty() {
        fs::write(&path, grid.to_csv(&request.row_value, &request.column_value))?;
        println!("saved to {}", path);
    }
    Ok(())
}

fn show_configuration(service: &ReactionService) {
    let config = service.config();
    let mut reactions = Table::new();
    reactions.add_row(row!["priority", "index", "equation", "active"]);
    let mut priority = 0;
    for entry in config.reactions.iter() {
        let position = if entry.active {
            priority += 1;
            priority.to_string()
        } else {
            "-".to_string()
        };
        reactions.add_row(row![position, entry.index, entry.equation, entry.active]);
    }
    reactions.printstd();

    let mut species = Table::new();
    species.add_row(row!["species", "molar mass, g/mol", "default input"]);
    for name in service.species().iter() {
        let molar_mass = match calculate_molar_mass(name, config.groups.as_ref()) {
            Ok((mass, _)) => format!("{:.3}", mass),
            Err(e) => e.to_string(),
        };
        let default = config
            .inputs
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_default();
        species.add_row(row![name, molar_mass, default]);
    }
    species.printstd();

    let pipe = config.pipe_inputs;
    let solver = config.sweep.solver;
    let mut settings = Table::new();
    settings.add_row(row!["Parameter", "Value"]);
    settings.add_row(row!["inner diameter, inch", pipe.inner_diameter]);
    settings.add_row(row!["drop-out length, m", pipe.drop_out_length]);
    settings.add_row(row!["flowrate, Mt/y", pipe.flowrate]);
    settings.add_row(row!["max steps", solver.max_steps]);
    settings.add_row(row!["min extent", format!("{:.1e}", solver.min_extent)]);
    let threads = match config.sweep.threads {
        Some(threads) => threads.to_string(),
        None => "all cores".to_string(),
    };
    settings.add_row(row!["sweep threads", threads]);
    settings.add_row(row!["max sweep cells", config.sweep.max_cells]);
    settings.printstd();
}
