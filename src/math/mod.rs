//! Mathematical utilities: the damped normal-equations solve.

pub mod normal_equations;

pub use normal_equations::*;
