//! Testing infrastructure for watchmen integration tests.
//!
//! - `TestWorld`: isolated bucket root, config file and results directory
//! - `assertions`: checks over the JSON report printed by `watchmen run`
//! - `fixtures`: event payloads and configuration snippets

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use world::{CliResult, TestWorld};
