//! The protection guard: wraps data-consuming calls in a readiness
//! gate. Resolves (or generates) a standard for the incoming frame,
//! assesses it, records the decision in the audit trail, and either
//! runs the wrapped call or blocks it.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod profile;

pub use crate::config::{FailureMode, GuardConfig, GuardRequest};
pub use crate::error::{readiness_level, GuardError};
pub use crate::guard::{GuardOutcome, ProtectionGuard};
pub use crate::logging::{init_logging, LogConfig, LogFormat};
pub use crate::profile::{DatasetProfiler, DefaultGenerator, FrameProfiler, StandardGenerator};
