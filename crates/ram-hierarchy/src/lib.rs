//! # ram-hierarchy — Organizational Hierarchy Resolution
//!
//! Change events carry an asset's ancestors as bare identifiers
//! (`projects/123`, `folders/456`, ...). Rules and dashboards want the
//! human-readable names. This crate reconstructs them:
//!
//! ```text
//! ancestor ──► AncestorKind ──► HierarchyCache (bounded retry, linear backoff)
//!                  │                    │ miss / read error
//!                  │                    ▼
//!                  │             DirectoryLookup (live, one call)
//!                  │                    │ failure
//!                  ▼                    ▼
//!              "unknown"  ◄──────── "unknown"
//! ```
//!
//! [`HierarchyResolver::resolve_display_names`] never fails. Missing names
//! degrade display completeness only; they never abort or retry an
//! invocation.
//!
//! Both collaborators are injected capabilities ([`HierarchyCache`],
//! [`DirectoryLookup`]) so tests can substitute in-memory fakes.

pub mod cache;
pub mod directory;
pub mod resolver;
pub(crate) mod retry;
pub mod store;

pub use cache::{CacheError, HierarchyCache, MemoryCache};
pub use directory::{DirectoryError, DirectoryLookup, ResourceManagerClient, StaticDirectory};
pub use resolver::{HierarchyResolver, ResolverConfig};
pub use store::DocumentStoreClient;
