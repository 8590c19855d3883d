//! # Document Enricher
//!
//! Decodes the inbound payload and derives the fields rule modules read:
//! identifier and display-name ancestry paths, contact labels, origin
//! default, and the legacy snake_case duplicates. Hierarchy lookups never
//! fail the enrichment; only an undecodable payload does.

use ram_core::{AssetChangeEvent, EnrichedAsset, EnrichedEvent, ErrorClass, EventError};
use ram_hierarchy::HierarchyResolver;

/// Enrichment failed. Always permanent.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error(transparent)]
    Event(#[from] EventError),
}

impl EnrichError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Event(e) => e.class(),
        }
    }
}

/// Turns raw change events into evaluation-ready documents.
#[derive(Debug, Clone)]
pub struct DocumentEnricher {
    resolver: HierarchyResolver,
    owner_label_key: String,
    violation_resolver_label_key: String,
}

impl DocumentEnricher {
    pub fn new(
        resolver: HierarchyResolver,
        owner_label_key: impl Into<String>,
        violation_resolver_label_key: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            owner_label_key: owner_label_key.into(),
            violation_resolver_label_key: violation_resolver_label_key.into(),
        }
    }

    /// Decode `payload` and enrich it.
    pub async fn enrich(&self, payload: &[u8]) -> Result<EnrichedEvent, EnrichError> {
        let event = AssetChangeEvent::from_slice(payload)?;
        Ok(self.enrich_event(event).await)
    }

    /// Enrich an already decoded event. Never fails.
    pub async fn enrich_event(&self, event: AssetChangeEvent) -> EnrichedEvent {
        let AssetChangeEvent {
            asset,
            window,
            deleted,
            origin,
        } = event;

        // Resolved on the nearest-first list; EnrichedAsset reverses both paths.
        let display_names = self.resolver.resolve_display_names(&asset.ancestors).await;
        let owner = asset.label(&self.owner_label_key).map(str::to_string);
        let violation_resolver = asset
            .label(&self.violation_resolver_label_key)
            .map(str::to_string);

        tracing::debug!(
            asset_name = %asset.name,
            ancestors = asset.ancestors.len(),
            has_owner = owner.is_some(),
            "asset enriched"
        );

        EnrichedEvent {
            asset: EnrichedAsset::new(asset, &display_names, owner, violation_resolver),
            window,
            origin: origin.unwrap_or_default(),
            deleted,
        }
    }
}
