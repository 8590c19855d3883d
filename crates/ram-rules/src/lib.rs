//! # ram-rules — Rule Evaluation
//!
//! The rule language is opaque to the monitor. This crate owns only the
//! edges around it:
//!
//! - [`RuleCatalog`]: rule modules and constraint documents loaded once at
//!   startup. A broken catalog is a setup failure, not a per-event error.
//! - [`EvaluationEngine`]: the capability that runs a query over the
//!   catalog and a working document. [`RegoEngine`] embeds a Rego
//!   interpreter.
//! - [`PolicyEvaluationAdapter`]: wraps one asset in the one-element
//!   collection the engine expects and writes it as the working document.
//! - [`ViolationExtractor`]: decodes the engine's untyped output into
//!   typed [`Violation`](ram_core::Violation) records without ever failing.
//!
//! ## Data Flow
//!
//! ```text
//! EnrichedAsset ─► adapter ─► {work_dir}/inventory/assets.json
//!                                  │
//!          RuleCatalog ──────► EvaluationEngine ─► RuleEvaluationResult
//!                                                        │
//!                                              ViolationExtractor ─► Vec<Violation>
//! ```

pub mod adapter;
pub mod catalog;
pub mod engine;
pub mod extract;

pub use adapter::{PolicyEvaluationAdapter, AUDIT_NAMESPACE, AUDIT_QUERY};
pub use catalog::{CatalogError, RuleCatalog};
pub use engine::{EngineError, EvaluationEngine, RegoEngine, RuleEvaluationResult};
pub use extract::ViolationExtractor;
