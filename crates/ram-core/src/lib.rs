//! # ram-core — Foundational Types for the Real-time Asset Monitor
//!
//! Defines the data model every other `ram-*` crate exchanges: the inbound
//! change event, the enriched asset document handed to the rule engine,
//! and the two evidence records (compliance status and violation) emitted
//! downstream.
//!
//! ## Key Design Principles
//!
//! 1. **One idempotency key.** [`ComplianceStatus`] and [`Violation`] both
//!    expose [`IdempotencyKey`], the `(asset name, inventory timestamp,
//!    rule name, rule deployment timestamp)` quadruple consumers dedup on.
//!    It is derived from the same fields on both records, never recomputed.
//!
//! 2. **Pure decision.** [`decide`] is a total function with no I/O. A
//!    deleted asset is always compliant.
//!
//! 3. **Ancestry naming lives here.** Ancestor type detection and path
//!    construction are shared by the enricher and the hierarchy resolver,
//!    so both agree on ordering and vocabulary.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ram-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod ancestry;
pub mod decision;
pub mod error;
pub mod event;
pub mod evidence;

pub use ancestry::{AncestorKind, UNKNOWN_DISPLAY_NAME};
pub use decision::{decide, Verdict};
pub use error::{ErrorClass, EventError};
pub use event::{AssetChangeEvent, AssetSnapshot, EnrichedAsset, EnrichedEvent, FeedWindow, Origin};
pub use evidence::{
    ComplianceStatus, ConstraintConfig, ConstraintMetadata, ConstraintSpec, FunctionConfig,
    IdempotencyKey, NonCompliance, RuleContext, Violation,
};
