#![deny(unsafe_code)]

pub mod cache;
pub mod catalog;
pub mod error;
pub mod evaluation;
pub mod generator;
pub mod hash;
pub mod standard;

pub use crate::cache::StandardCache;
pub use crate::catalog::{rule_catalog, CheckKind, RuleSpec};
pub use crate::error::StandardsError;
pub use crate::evaluation::{Gap, TemplateEvaluation, TemplateEvaluator};
pub use crate::standard::{LoadedStandard, RuleConfig, Standard};
