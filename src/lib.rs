//! xmile-regress: regression comparison of simulator output against
//! reference data.
//!
//! Runs a system dynamics simulator over a directory of model cases and
//! checks each simulated time series against its reference fixture with an
//! adaptive-precision equality rule.

pub mod bundle;
pub mod compare;
pub mod config;
pub mod reporter;
pub mod runner;
pub mod series;
pub mod types;
