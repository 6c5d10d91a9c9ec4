//! SQLite-backed [`StoreRepository`] implementation.
//!
//! Records live in the `stores` table with a companion FTS5 index
//! (`stores_fts`) over `name` and `description`, kept in step by the write
//! paths. Text search orders by the
//! FTS5 BM25 rank (negated so higher is better). SQLite has no geo index,
//! so proximity search fetches candidate rows and computes haversine
//! distance in Rust before sorting and truncating.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Location, MapStore, ScoredStore, Store, StoreDraft, StorePatch, PLACEHOLDER_PHOTO,
};
use crate::slug::{next_available_slug, slugify};

use super::{haversine_m, validate_draft, validate_location, StoreRepository};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn slugs_matching(&self, base: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT slug FROM stores WHERE slug = ? OR slug LIKE ?")
            .bind(base)
            .bind(format!("{base}-%"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("slug")).collect())
    }
}

fn row_to_store(row: &sqlx::sqlite::SqliteRow) -> Result<Store, StoreError> {
    let tags_json: Option<String> = row.get("tags_json");
    let tags = match tags_json {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };
    Ok(Store {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        tags,
        location: Location::point(row.get("lng"), row.get("lat")),
        photo: row.get("photo"),
        author: row.get("author"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const STORE_COLUMNS: &str =
    "id, name, slug, description, tags_json, lng, lat, photo, author, created_at, updated_at";

/// FTS5 interprets bare input as query syntax, so a stray quote or trailing
/// operator would raise a syntax error. Every whitespace-separated term is
/// bound as a quoted string literal instead (implicit AND between terms),
/// with embedded quotes doubled per the FTS5 string grammar.
fn fts_match_expr(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl StoreRepository for SqliteRepository {
    async fn create(&self, mut draft: StoreDraft) -> Result<Store, StoreError> {
        validate_draft(&draft.name, &draft.author, &draft.location)?;
        draft.location.coerce_marker();

        let existing = self.slugs_matching(&slugify(&draft.name)).await?;
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

        let tags_json = store
            .tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO stores (id, name, slug, description, tags_json, lng, lat, photo, author, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.slug)
        .bind(&store.description)
        .bind(&tags_json)
        .bind(store.location.lng())
        .bind(store.location.lat())
        .bind(&store.photo)
        .bind(&store.author)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO stores_fts (store_id, name, description) VALUES (?, ?, ?)")
            .bind(&store.id)
            .bind(&store.name)
            .bind(&store.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(store)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Store>, StoreError> {
        let row = sqlx::query(&format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_store).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_store).transpose()
    }

    async fn update_by_id(&self, id: &str, mut patch: StorePatch) -> Result<Store, StoreError> {
        if patch.name.trim().is_empty() {
            return Err(StoreError::Validation {
                field: "name",
                message: "name must not be empty".to_string(),
            });
        }
        validate_location(&patch.location)?;
        patch.location.coerce_marker();

        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("store {id}")))?;

        let tags_json = patch
            .tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let photo = patch.photo.unwrap_or(existing.photo);
        let now = Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE stores
            SET name = ?, description = ?, tags_json = ?, lng = ?, lat = ?, photo = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&tags_json)
        .bind(patch.location.lng())
        .bind(patch.location.lat())
        .bind(&photo)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // Keep the FTS index in step with the record.
        sqlx::query("DELETE FROM stores_fts WHERE store_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO stores_fts (store_id, name, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Store {
            name: patch.name,
            description: patch.description,
            tags: patch.tags,
            location: patch.location,
            photo,
            updated_at: now,
            ..existing
        })
    }

    async fn list(&self) -> Result<Vec<Store>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {STORE_COLUMNS} FROM stores ORDER BY created_at DESC, slug ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_store).collect()
    }

    async fn list_with_tags(&self, tag: Option<&str>) -> Result<Vec<Store>, StoreError> {
        let rows = match tag {
            None => {
                sqlx::query(&format!(
                    "SELECT {STORE_COLUMNS} FROM stores WHERE tags_json IS NOT NULL ORDER BY slug ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            Some(t) => {
                sqlx::query(&format!(
                    r#"
                    SELECT {STORE_COLUMNS} FROM stores
                    WHERE tags_json IS NOT NULL
                      AND EXISTS (SELECT 1 FROM json_each(stores.tags_json) WHERE value = ?)
                    ORDER BY slug ASC
                    "#
                ))
                .bind(t)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(row_to_store).collect()
    }

    async fn text_search(&self, query: &str, limit: i64) -> Result<Vec<ScoredStore>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT s.*, stores_fts.rank AS rank
            FROM stores_fts
            JOIN stores s ON s.id = stores_fts.store_id
            WHERE stores_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(fts_match_expr(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                Ok(ScoredStore {
                    store: row_to_store(row)?,
                    // negate so higher = better
                    score: -rank,
                })
            })
            .collect()
    }

    async fn distinct_tags(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT value AS tag
            FROM stores, json_each(stores.tags_json)
            WHERE stores.tags_json IS NOT NULL
            ORDER BY value ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("tag")).collect())
    }

    async fn geo_near(
        &self,
        lng: f64,
        lat: f64,
        max_distance_m: f64,
        limit: i64,
    ) -> Result<Vec<MapStore>, StoreError> {
        // Fetch the map projection for all rows and rank in Rust.
        let rows = sqlx::query("SELECT slug, name, description, lng, lat, photo FROM stores")
            .fetch_all(&self.pool)
            .await?;

        let mut nearby: Vec<(f64, MapStore)> = rows
            .iter()
            .filter_map(|row| {
                let (s_lng, s_lat): (f64, f64) = (row.get("lng"), row.get("lat"));
                let d = haversine_m(lng, lat, s_lng, s_lat);
                (d <= max_distance_m).then(|| {
                    (
                        d,
                        MapStore {
                            slug: row.get("slug"),
                            name: row.get("name"),
                            description: row.get("description"),
                            location: Location::point(s_lng, s_lat),
                            photo: row.get("photo"),
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

#[cfg(test)]
mod tests {
    use super::fts_match_expr;

    #[test]
    fn fts_terms_are_quoted() {
        assert_eq!(fts_match_expr("bean"), r#""bean""#);
        assert_eq!(fts_match_expr("bean cafe"), r#""bean" "cafe""#);
    }

    #[test]
    fn fts_quotes_and_operators_are_neutralized() {
        // a stray quote becomes part of a string literal, not syntax
        assert_eq!(fts_match_expr(r#"bean""#), r#""bean""""#);
        // operator keywords turn into ordinary terms
        assert_eq!(fts_match_expr("bean AND"), r#""bean" "AND""#);
        assert_eq!(fts_match_expr("NOT bean"), r#""NOT" "bean""#);
    }
}
