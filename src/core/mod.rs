//! Shared pieces of the upgrade runner: errors, naming, agent configuration,
//! the state store and the execution context.

pub mod agent;
pub mod db;
pub mod error;
pub mod logging;
pub mod names;
pub mod output;
pub mod schemas;
pub mod state;
