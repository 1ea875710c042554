#![deny(unsafe_code)]

pub mod assessor;
pub mod completeness;
pub mod consistency;
pub mod engine;
pub mod freshness;
pub mod plausibility;
pub mod stats;
pub mod validity;

pub use crate::assessor::{Assessor, DEFAULT_MINIMUM};
pub use crate::engine::evaluate_rule;
