//! Core data models for storemap.
//!
//! These types represent the store records and discovery results that flow
//! through the ingestion and discovery pipelines.

use serde::{Deserialize, Serialize};

/// Type marker carried by every [`Location`]. Writes coerce it back to this
/// value regardless of what the caller supplied.
pub const POINT_MARKER: &str = "Point";

/// Photo filename token used when a store is created without an upload.
pub const PLACEHOLDER_PHOTO: &str = "store.png";

/// GeoJSON-style point geometry: a type marker plus `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default = "default_marker")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

fn default_marker() -> String {
    POINT_MARKER.to_string()
}

impl Location {
    pub fn point(lng: f64, lat: f64) -> Self {
        Self {
            kind: POINT_MARKER.to_string(),
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    /// Forces the type marker back to `"Point"`. Every repository write path
    /// calls this so stored geometry is always tagged consistently.
    pub fn coerce_marker(&mut self) {
        self.kind = POINT_MARKER.to_string();
    }
}

/// A persisted store record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// `None` means the record carries no tags field at all; tag browsing
    /// without a filter only matches stores where this is `Some`.
    pub tags: Option<Vec<String>>,
    pub location: Location,
    pub photo: String,
    pub author: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields supplied at creation. `id`, `slug`, and timestamps are assigned by
/// the repository. Record creation fills `photo` with the configured
/// placeholder when no upload is present; repositories fall back to
/// [`PLACEHOLDER_PHOTO`] if handed a bare draft.
#[derive(Debug, Clone)]
pub struct StoreDraft {
    pub name: String,
    pub description: String,
    pub tags: Option<Vec<String>>,
    pub location: Location,
    pub photo: Option<String>,
    pub author: String,
}

/// Mutable fields replaced by an update. `photo: None` keeps the existing
/// photo token; `id`, `slug`, and `author` never change after creation.
#[derive(Debug, Clone)]
pub struct StorePatch {
    pub name: String,
    pub description: String,
    pub tags: Option<Vec<String>>,
    pub location: Location,
    pub photo: Option<String>,
}

/// A text-search hit: the full record plus its relevance score, returned
/// verbatim for JSON rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredStore {
    #[serde(flatten)]
    pub store: Store,
    pub score: f64,
}

/// Map-display projection of a store. Only the fields needed to render a
/// marker are carried.
#[derive(Debug, Clone, Serialize)]
pub struct MapStore {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub photo: String,
}

/// Combined result of a tag-browsing request.
#[derive(Debug, Clone, Serialize)]
pub struct TagPage {
    pub all_tags: Vec<String>,
    pub tag: Option<String>,
    pub stores: Vec<Store>,
}
