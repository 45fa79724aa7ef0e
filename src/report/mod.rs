//! Reporting utilities: run summaries and coefficient output.

pub mod format;

pub use format::*;
