//! CLI command implementations for Herald.

pub mod check;
pub mod replay;
