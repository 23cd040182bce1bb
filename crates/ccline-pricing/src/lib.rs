//! Cost estimation for ccline
//!
//! Costs come from a fixed per-family rate table; no network lookups.

pub mod cost_calculator;

pub use cost_calculator::{CostCalculator, ModelFamily, ModelRates, estimate_cost};
