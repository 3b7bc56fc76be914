//! Connectivity diagnostics for configured database targets
//!
//! Loads target definitions, decrypts their stored credentials, resolves a
//! transport trust policy and drives each target through connect, probe and
//! an optional health query, reporting one outcome per target.

pub mod backends;
pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod outcome;
pub mod report;
pub mod target;
pub mod tls;
pub mod vault;

pub use error::{Error, Result};
