#[allow(non_snake_case)]
pub mod Reactions;
#[allow(non_snake_case)]
pub mod Sweep;
pub mod api;
pub mod cli;
pub mod config;
