//! Shared infrastructure for ClinicCore client crates.

pub mod logging;

pub use logging::{init_default_logging, init_logging};
