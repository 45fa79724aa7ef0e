//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`RegressionConfig`, `FitConfig`, `BadRecordPolicy`)
//! - the fit output (`Coefficients`)

pub mod types;

pub use types::*;
