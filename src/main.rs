use CO2Spec::api::ReactionService;
use CO2Spec::cli::cli_main::run_interactive_menu;
use CO2Spec::config::{DEFAULT_CONFIG_FILE, ReactionConfig};
use log::{LevelFilter, error};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::env;
use std::error::Error;
use std::process::ExitCode;

fn run() -> Result<(), Box<dyn Error>> {
    // usage: CO2Spec [config.json]
    let config_file = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = ReactionConfig::load_or_default(&config_file)?;
    let service = ReactionService::new(config)?;
    run_interactive_menu(&service)?;
    Ok(())
}

pub fn main() -> ExitCode {
    let level = match env::var("CO2SPEC_LOG").as_deref() {
        Ok("debug") => LevelFilter::Debug,
        Ok("warn") => LevelFilter::Warn,
        _ => LevelFilter::Info,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger not initialised: {}", e);
    }
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
