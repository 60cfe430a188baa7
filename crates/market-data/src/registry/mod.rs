//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - The per-kind priority table
//! - Deadline- and cancellation-bounded invocation
//! - Sequential fallback chains and concurrent batches
//! - Validation of canonical data
//! - Attempt logs and schema-drift diagnostics

mod attempt;
mod drift;
mod invoker;
mod provider_registry;
mod request;
mod resolver;
mod validator;

pub use attempt::{AttemptLog, FallbackAttempt};
pub use drift::SchemaDriftLog;
pub use invoker::BoundedInvoker;
pub use provider_registry::{ChainOutcome, ChainState, ProviderRegistry};
pub use resolver::{KindSummary, ProviderTable, SkipReason, SkippedProvider};
pub use validator::{QuoteValidator, ValidationIssue, ValidationSeverity};
