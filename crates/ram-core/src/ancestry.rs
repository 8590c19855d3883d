//! # Ancestry Naming
//!
//! Ancestors arrive nearest-first as `<collection>/<id>` identifiers, e.g.
//! `["projects/123", "folders/456", "organizations/789"]`. Paths are built
//! root-first and slash-joined.
//!
//! The identifier path keeps the legacy singular container vocabulary
//! (`organization/789/folder/456/project/123`) that downstream dashboards
//! were built against.

/// Display name used whenever an ancestor cannot be resolved.
pub const UNKNOWN_DISPLAY_NAME: &str = "unknown";

/// Host prefix used by the hierarchy cache for container documents.
const CACHE_KEY_PREFIX: &str = "//cloudresourcemanager.googleapis.com/";

/// Kind of container an ancestor identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AncestorKind {
    Organization,
    Folder,
    Project,
    /// Any prefix the monitor does not know how to resolve.
    Unknown,
}

impl AncestorKind {
    /// Derive the kind from an identifier prefix.
    pub fn of(ancestor: &str) -> Self {
        match ancestor.split_once('/') {
            Some(("organizations", id)) if !id.is_empty() => Self::Organization,
            Some(("folders", id)) if !id.is_empty() => Self::Folder,
            Some(("projects", id)) if !id.is_empty() => Self::Project,
            _ => Self::Unknown,
        }
    }

    /// Plural collection word used in identifiers and directory URLs.
    pub fn collection(&self) -> Option<&'static str> {
        match self {
            Self::Organization => Some("organizations"),
            Self::Folder => Some("folders"),
            Self::Project => Some("projects"),
            Self::Unknown => None,
        }
    }

    /// Singular word used in the legacy ancestry path.
    fn legacy_word(&self) -> Option<&'static str> {
        match self {
            Self::Organization => Some("organization"),
            Self::Folder => Some("folder"),
            Self::Project => Some("project"),
            Self::Unknown => None,
        }
    }

    /// Field carrying the human-readable name inside a cached container
    /// document's `resource.data` map.
    pub fn display_field(&self) -> Option<&'static str> {
        match self {
            Self::Project => Some("name"),
            Self::Folder | Self::Organization => Some("displayName"),
            Self::Unknown => None,
        }
    }

    /// Whether ancestors of this kind can be looked up at all.
    pub fn is_resolvable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Split a known ancestor into its kind and bare id.
///
/// Returns `None` for unrecognized prefixes.
pub fn parse_ancestor(ancestor: &str) -> Option<(AncestorKind, &str)> {
    let kind = AncestorKind::of(ancestor);
    if !kind.is_resolvable() {
        return None;
    }
    ancestor.split_once('/').map(|(_, id)| (kind, id))
}

/// Normalized hierarchy-cache key for an ancestor.
///
/// The cache stores container documents under their full resource name with
/// every `/` replaced by `\`, since `/` is a path separator in the store.
pub fn cache_key(ancestor: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{ancestor}").replace('/', "\\")
}

/// Root-first identifier path with legacy container vocabulary.
pub fn ancestry_path(ancestors: &[String]) -> String {
    ancestors
        .iter()
        .rev()
        .map(|ancestor| legacy_segment(ancestor))
        .collect::<Vec<_>>()
        .join("/")
}

/// Root-first display path built from names resolved in nearest-first order.
pub fn display_path(names_nearest_first: &[String]) -> String {
    names_nearest_first
        .iter()
        .rev()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("/")
}

fn legacy_segment(ancestor: &str) -> String {
    match (AncestorKind::of(ancestor).legacy_word(), ancestor.split_once('/')) {
        (Some(word), Some((_, id))) => format!("{word}/{id}"),
        _ => ancestor.to_string(),
    }
}
