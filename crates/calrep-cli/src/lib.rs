//! Calendar report generator CLI library.
//!
//! This crate provides the CLI interface for the calendar report generator.

mod cli;
pub mod commands;
mod config;
pub mod engine;
pub mod render;

pub use cli::{Cli, Commands, PeriodArgs};
pub use config::Config;
