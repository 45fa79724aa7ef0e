//! Input/output helpers.
//!
//! - streaming CSV record source (`ingest`)
//! - partial-statistic JSON read/write (`partial`)
//! - coefficient export (`export`)

pub mod export;
pub mod ingest;
pub mod partial;

pub use export::*;
pub use ingest::*;
pub use partial::*;
