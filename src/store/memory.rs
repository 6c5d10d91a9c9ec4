//! In-memory [`StoreRepository`] implementation for testing.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Text search is a
//! weighted term-frequency scan over name and description; proximity search
//! is a brute-force haversine scan. No lock is held across an await point —
//! every method completes synchronously inside its future.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{MapStore, ScoredStore, Store, StoreDraft, StorePatch, PLACEHOLDER_PHOTO};
use crate::slug::{next_available_slug, slugify};

use super::{haversine_m, validate_draft, validate_location, StoreRepository};

/// In-memory repository for tests.
pub struct InMemoryRepository {
    stores: RwLock<Vec<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Name hits count double relative to description hits, mirroring the field
/// weighting of the SQLite FTS index.
fn relevance(store: &Store, terms: &[String]) -> f64 {
    let name = store.name.to_lowercase();
    let description = store.description.to_lowercase();
    let mut score = 0.0;
    for term in terms {
        score += 2.0 * name.split_whitespace().filter(|w| w.contains(term.as_str())).count() as f64;
        score += description
            .split_whitespace()
            .filter(|w| w.contains(term.as_str()))
            .count() as f64;
    }
    score
}

#[async_trait]
impl StoreRepository for InMemoryRepository {
    async fn create(&self, mut draft: StoreDraft) -> Result<Store, StoreError> {
        validate_draft(&draft.name, &draft.author, &draft.location)?;
        draft.location.coerce_marker();

        let mut stores = self.stores.write().unwrap();
        let existing: Vec<String> = stores.iter().map(|s| s.slug.clone()).collect();
        let slug = next_available_slug(&slugify(&draft.name), &existing);

        let now = Utc::now().timestamp();
        let store = Store {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            slug,
            description: draft.description,
            tags: draft.tags,
            location: draft.location,
            photo: draft.photo.unwrap_or_else(|| PLACEHOLDER_PHOTO.to_string()),
            author: draft.author,
            created_at: now,
            updated_at: now,
        };
        stores.push(store.clone());
        Ok(store)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Store>, StoreError> {
        let stores = self.stores.read().unwrap();
        Ok(stores.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>, StoreError> {
        let stores = self.stores.read().unwrap();
        Ok(stores.iter().find(|s| s.slug == slug).cloned())
    }

    async fn update_by_id(&self, id: &str, mut patch: StorePatch) -> Result<Store, StoreError> {
        validate_location(&patch.location)?;
        if patch.name.trim().is_empty() {
            return Err(StoreError::Validation {
                field: "name",
                message: "name must not be empty".to_string(),
            });
        }
        patch.location.coerce_marker();

        let mut stores = self.stores.write().unwrap();
        let store = stores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("store {id}")))?;

        store.name = patch.name;
        store.description = patch.description;
        store.tags = patch.tags;
        store.location = patch.location;
        if let Some(photo) = patch.photo {
            store.photo = photo;
        }
        store.updated_at = Utc::now().timestamp();
        Ok(store.clone())
    }

    async fn list(&self) -> Result<Vec<Store>, StoreError> {
        let stores = self.stores.read().unwrap();
        Ok(stores.clone())
    }

    async fn list_with_tags(&self, tag: Option<&str>) -> Result<Vec<Store>, StoreError> {
        let stores = self.stores.read().unwrap();
        let filtered = stores
            .iter()
            .filter(|s| match tag {
                None => s.tags.is_some(),
                Some(t) => s
                    .tags
                    .as_ref()
                    .is_some_and(|tags| tags.iter().any(|x| x == t)),
            })
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn text_search(&self, query: &str, limit: i64) -> Result<Vec<ScoredStore>, StoreError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let stores = self.stores.read().unwrap();

        let mut hits: Vec<ScoredStore> = stores
            .iter()
            .filter_map(|s| {
                let score = relevance(s, &terms);
                (score > 0.0).then(|| ScoredStore {
                    store: s.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.store.slug.cmp(&b.store.slug))
        });
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn distinct_tags(&self) -> Result<Vec<String>, StoreError> {
        let stores = self.stores.read().unwrap();
        let set: BTreeSet<String> = stores
            .iter()
            .filter_map(|s| s.tags.as_ref())
            .flatten()
            .cloned()
            .collect();
        Ok(set.into_iter().collect())
    }

    async fn geo_near(
        &self,
        lng: f64,
        lat: f64,
        max_distance_m: f64,
        limit: i64,
    ) -> Result<Vec<MapStore>, StoreError> {
        let stores = self.stores.read().unwrap();

        let mut nearby: Vec<(f64, MapStore)> = stores
            .iter()
            .filter_map(|s| {
                let d = haversine_m(lng, lat, s.location.lng(), s.location.lat());
                (d <= max_distance_m).then(|| {
                    (
                        d,
                        MapStore {
                            slug: s.slug.clone(),
                            name: s.name.clone(),
                            description: s.description.clone(),
                            location: s.location.clone(),
                            photo: s.photo.clone(),
                        },
                    )
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        nearby.truncate(limit as usize);
        Ok(nearby.into_iter().map(|(_, m)| m).collect())
    }
}
