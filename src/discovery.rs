//! Discovery engine: translates the three discovery intents — free-text
//! relevance search, tag browsing, and proximity search — into repository
//! queries and shapes the results.
//!
//! Every operation is stateless and idempotent given identical persisted
//! data; malformed input is rejected before any repository call.

use crate::error::StoreError;
use crate::models::{MapStore, ScoredStore, TagPage};
use crate::store::StoreRepository;

/// Relevance-scored text search over name and description, sorted
/// descending by score and capped at `limit`.
///
/// An empty or whitespace-only query is rejected with
/// [`StoreError::InvalidQuery`] — it never falls through to the text index,
/// whose behavior on an empty needle is backend-defined.
pub async fn search_stores(
    repo: &dyn StoreRepository,
    query: &str,
    limit: i64,
) -> Result<Vec<ScoredStore>, StoreError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(StoreError::InvalidQuery(
            "query must not be empty".to_string(),
        ));
    }
    repo.text_search(query, limit).await
}

/// Tag browsing. With no tag, matches every store that carries a tags field
/// at all; with a tag, filters to stores whose tag set contains it.
///
/// The distinct-tag list and the filtered store list have no data
/// dependency, so they are fetched concurrently and joined — a failure in
/// either fails the whole operation.
pub async fn stores_by_tag(
    repo: &dyn StoreRepository,
    tag: Option<&str>,
) -> Result<TagPage, StoreError> {
    let (all_tags, stores) = tokio::try_join!(repo.distinct_tags(), repo.list_with_tags(tag))?;
    Ok(TagPage {
        all_tags,
        tag: tag.map(str::to_string),
        stores,
    })
}

/// Proximity search around a query-supplied coordinate pair. Both
/// coordinates must parse as finite floats. Results come back
/// nearest-first within `max_distance_m` meters, capped at `limit`, in the
/// map-display projection.
pub async fn map_stores(
    repo: &dyn StoreRepository,
    lng: &str,
    lat: &str,
    max_distance_m: f64,
    limit: i64,
) -> Result<Vec<MapStore>, StoreError> {
    let lng = parse_coordinate(lng, "lng")?;
    let lat = parse_coordinate(lat, "lat")?;
    repo.geo_near(lng, lat, max_distance_m, limit).await
}

fn parse_coordinate(raw: &str, name: &str) -> Result<f64, StoreError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            StoreError::InvalidCoordinates(format!("{name} is not a finite number: '{raw}'"))
        })
}
