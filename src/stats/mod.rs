//! Sufficient statistics for ordinary least squares.
//!
//! Responsibilities:
//!
//! - parse raw record tokens into `(label, features)`
//! - fold records into a per-partition `XᵗX` / `Xᵗy` statistic
//! - merge partial statistics in any order or grouping

pub mod accumulator;
pub mod merge;
pub mod record;
pub mod statistic;

pub use accumulator::*;
pub use merge::*;
pub use record::*;
pub use statistic::*;
