#![deny(unsafe_code)]

pub mod error;
pub mod record;
pub mod writer;

pub use crate::error::AuditError;
pub use crate::record::{
    AssessmentOutcome, AuditRecord, AuditTables, DataInfo, ExecutionContext, FailedCheck,
    PerformanceMetrics,
};
pub use crate::writer::{AuditConfig, AuditFormat, AuditLogger};
