//! Core library for the Firestore security-rules auditor.
//!
//! Pipeline: [`rules`] resolves rule text (file → Firebase CLI → Rules API),
//! [`audit`] sends it to the external analysis capability and validates the
//! response, [`report`] renders and persists the result. Strictly linear;
//! nothing is shared across invocations.

pub mod audit;
pub mod config;
pub mod error;
pub mod report;
pub mod rules;

pub use audit::{
    Analyzer, AuditMode, AuditOutcome, AuditRequest, AuditResult, LlmAnalyzer, Severity,
    Vulnerability,
};
pub use error::AuditError;
pub use rules::{RuleDocument, RuleOrigin, FIRESTORE_MARKER};
