/// interactive terminal menu
pub mod cli_main;
/// worked examples runnable from the menu
pub mod cli_examples;
