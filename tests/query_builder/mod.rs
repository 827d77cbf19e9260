//! Query Builder Tests Module
//!
//! Compilation of flat parameters, condition trees, sort keys, field selections and
//! pagination into statements. None of these tests touch a store.

pub mod flat_params;
pub mod format;
pub mod statement;
