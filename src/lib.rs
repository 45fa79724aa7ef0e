//! `ols-normal` library crate.
//!
//! The binary (`ols`) is a thin wrapper around this library so that:
//!
//! - the accumulate / merge / solve core is testable without spawning processes
//! - the core can be driven by other orchestration layers (one partition per
//!   worker, per process, or per machine)

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod stats;
