//! Tally - command-line client for the dashboard API.
//!
//! The binary wires the reqwest transport, the file credential store and a
//! redirect signal into the authenticated client, then dispatches one
//! subcommand.

pub mod app;
pub mod cli;
pub mod commands;
pub mod telemetry;

pub use app::App;
pub use cli::{Cli, Command};
