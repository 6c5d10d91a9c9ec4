//! Persistence repository for store records.
//!
//! The [`StoreRepository`] trait is the seam between the discovery/record
//! operations and the storage backend. Handles are passed explicitly into
//! each operation — there is no process-wide registry lookup.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create`](StoreRepository::create) | Validate, derive a unique slug, and insert |
//! | [`find_by_id`](StoreRepository::find_by_id) | Point lookup by record id |
//! | [`find_by_slug`](StoreRepository::find_by_slug) | Point lookup by slug |
//! | [`update_by_id`](StoreRepository::update_by_id) | Replace mutable fields, re-validate |
//! | [`list`](StoreRepository::list) | All stores |
//! | [`list_with_tags`](StoreRepository::list_with_tags) | Stores carrying a tag (or any tags) |
//! | [`text_search`](StoreRepository::text_search) | Relevance-scored search over name + description |
//! | [`distinct_tags`](StoreRepository::distinct_tags) | Sorted distinct tag set across the collection |
//! | [`geo_near`](StoreRepository::geo_near) | Nearest-first proximity query, bounded radius |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Location, MapStore, ScoredStore, Store, StoreDraft, StorePatch};

#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Validates the draft, derives a collision-free slug, assigns an id and
    /// timestamps, and persists the record.
    async fn create(&self, draft: StoreDraft) -> Result<Store, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Store>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>, StoreError>;

    /// Replaces the mutable fields of an existing record and re-validates
    /// them. The slug, author, id, and creation timestamp are preserved.
    async fn update_by_id(&self, id: &str, patch: StorePatch) -> Result<Store, StoreError>;

    async fn list(&self) -> Result<Vec<Store>, StoreError>;

    /// `tag = None` matches any store whose tags field is present (non-null)
    /// regardless of content; `Some(t)` matches stores whose tag set
    /// contains exactly `t`.
    async fn list_with_tags(&self, tag: Option<&str>) -> Result<Vec<Store>, StoreError>;

    /// Relevance-scored text search over `name` and `description`, sorted
    /// descending by score, capped at `limit`.
    async fn text_search(&self, query: &str, limit: i64) -> Result<Vec<ScoredStore>, StoreError>;

    /// Distinct set of all tags in use, sorted ascending.
    async fn distinct_tags(&self) -> Result<Vec<String>, StoreError>;

    /// Nearest-neighbor query centered at `(lng, lat)`: stores within
    /// `max_distance_m` meters, ordered nearest-first, capped at `limit`,
    /// projected down to the map-display fields.
    async fn geo_near(
        &self,
        lng: f64,
        lat: f64,
        max_distance_m: f64,
        limit: i64,
    ) -> Result<Vec<MapStore>, StoreError>;
}

/// Entity constraints shared by both backends. Checked on create and on
/// every update.
pub(crate) fn validate_draft(
    name: &str,
    author: &str,
    location: &Location,
) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation {
            field: "name",
            message: "name must not be empty".to_string(),
        });
    }
    if author.trim().is_empty() {
        return Err(StoreError::Validation {
            field: "author",
            message: "author must not be empty".to_string(),
        });
    }
    validate_location(location)
}

pub(crate) fn validate_location(location: &Location) -> Result<(), StoreError> {
    let (lng, lat) = (location.lng(), location.lat());
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(StoreError::Validation {
            field: "location",
            message: format!("longitude out of range: {lng}"),
        });
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(StoreError::Validation {
            field: "location",
            message: format!("latitude out of range: {lat}"),
        });
    }
    Ok(())
}

/// Great-circle distance in meters between two `(lng, lat)` points.
pub(crate) fn haversine_m(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
