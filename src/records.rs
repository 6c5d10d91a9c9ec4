//! Store record operations: create, update, and point lookups.
//!
//! Creation and update compose the ingestion pipeline with the repository
//! write in code: the upload (if any) must be fully processed before the
//! record write happens, and any pipeline failure aborts the whole request
//! so a record never references a missing asset.

use crate::config::MediaConfig;
use crate::error::StoreError;
use crate::ingest::{process_upload, PhotoUpload};
use crate::models::{Store, StoreDraft, StorePatch};
use crate::store::StoreRepository;

/// Ingest the optional photo, then create the record. The draft's author
/// becomes the immutable owner. A creation without an upload references the
/// configured placeholder asset.
pub async fn create_store(
    repo: &dyn StoreRepository,
    media: &MediaConfig,
    mut draft: StoreDraft,
    upload: Option<PhotoUpload>,
) -> Result<Store, StoreError> {
    if let Some(token) = process_upload(upload, media).await? {
        draft.photo = Some(token);
    }
    if draft.photo.is_none() {
        draft.photo = Some(media.placeholder.clone());
    }
    repo.create(draft).await
}

/// Ownership-checked mutation: the acting identity must equal the record's
/// author or the update is rejected with [`StoreError::OwnershipViolation`]
/// and nothing is applied. The location type marker is coerced and all
/// mutable fields re-validated by the repository.
pub async fn update_store(
    repo: &dyn StoreRepository,
    media: &MediaConfig,
    id: &str,
    acting_author: &str,
    mut patch: StorePatch,
    upload: Option<PhotoUpload>,
) -> Result<Store, StoreError> {
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("store {id}")))?;
    if existing.author != acting_author {
        return Err(StoreError::OwnershipViolation);
    }

    if let Some(token) = process_upload(upload, media).await? {
        patch.photo = Some(token);
    }
    patch.location.coerce_marker();
    repo.update_by_id(id, patch).await
}

pub async fn get_store_by_slug(
    repo: &dyn StoreRepository,
    slug: &str,
) -> Result<Store, StoreError> {
    repo.find_by_slug(slug)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("store '{slug}'")))
}

pub async fn list_stores(repo: &dyn StoreRepository) -> Result<Vec<Store>, StoreError> {
    repo.list().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, POINT_MARKER};
    use crate::store::memory::InMemoryRepository;

    fn draft(name: &str, author: &str) -> StoreDraft {
        StoreDraft {
            name: name.to_string(),
            description: String::new(),
            tags: None,
            location: Location::point(2.35, 48.85),
            photo: None,
            author: author.to_string(),
        }
    }

    fn patch_from(store: &Store) -> StorePatch {
        StorePatch {
            name: store.name.clone(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            location: store.location.clone(),
            photo: None,
        }
    }

    #[tokio::test]
    async fn create_without_upload_uses_placeholder() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig::default();
        let store = create_store(&repo, &media, draft("Bean Cafe", "alice"), None)
            .await
            .unwrap();
        assert_eq!(store.photo, "store.png");
        assert_eq!(store.slug, "bean-cafe");
    }

    #[tokio::test]
    async fn create_honors_configured_placeholder() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig {
            placeholder: "custom.png".to_string(),
            ..MediaConfig::default()
        };
        let store = create_store(&repo, &media, draft("Bean Cafe", "alice"), None)
            .await
            .unwrap();
        assert_eq!(store.photo, "custom.png");
    }

    #[tokio::test]
    async fn two_stores_named_test_get_distinct_slugs() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig::default();
        let a = create_store(&repo, &media, draft("Test", "alice"), None)
            .await
            .unwrap();
        let b = create_store(&repo, &media, draft("Test", "bob"), None)
            .await
            .unwrap();
        assert_eq!(a.slug, "test");
        assert_eq!(b.slug, "test-2");
    }

    #[tokio::test]
    async fn failed_ingestion_aborts_creation() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig::default();
        let upload = PhotoUpload::accept("image/png", b"garbage".to_vec(), &media).unwrap();

        let err = create_store(&repo, &media, draft("Bean Cafe", "alice"), Some(upload))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_owner_update_is_rejected_and_applies_nothing() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig::default();
        let store = create_store(&repo, &media, draft("Bean Cafe", "alice"), None)
            .await
            .unwrap();

        let mut patch = patch_from(&store);
        patch.name = "Hijacked".to_string();
        let err = update_store(&repo, &media, &store.id, "mallory", patch, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OwnershipViolation));

        let unchanged = repo.find_by_id(&store.id).await.unwrap().unwrap();
        assert_eq!(unchanged.name, "Bean Cafe");
    }

    #[tokio::test]
    async fn owner_update_replaces_fields_and_coerces_marker() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig::default();
        let store = create_store(&repo, &media, draft("Bean Cafe", "alice"), None)
            .await
            .unwrap();

        let mut patch = patch_from(&store);
        patch.name = "Bean Cafe & Roastery".to_string();
        patch.location = Location {
            kind: "polygon".to_string(),
            coordinates: [2.36, 48.86],
        };
        let updated = update_store(&repo, &media, &store.id, "alice", patch, None)
            .await
            .unwrap();

        assert_eq!(updated.name, "Bean Cafe & Roastery");
        assert_eq!(updated.location.kind, POINT_MARKER);
        assert_eq!(updated.author, "alice");
        assert_eq!(updated.id, store.id);
        // slug derives at creation only
        assert_eq!(updated.slug, "bean-cafe");
    }

    #[tokio::test]
    async fn update_of_missing_store_is_not_found() {
        let repo = InMemoryRepository::new();
        let media = MediaConfig::default();
        let store = create_store(&repo, &media, draft("Bean Cafe", "alice"), None)
            .await
            .unwrap();
        let err = update_store(&repo, &media, "nope", "alice", patch_from(&store), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
