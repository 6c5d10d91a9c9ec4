//! # storemap
//!
//! A local-first store registry with full-text, tag, and proximity
//! discovery.
//!
//! Storemap keeps a collection of "store" records — name, description,
//! geographic position, tags, photo — in SQLite and answers three kinds of
//! discovery query over them: relevance-ranked text search, tag browsing,
//! and nearest-first proximity search. Uploaded photos pass through a
//! validating/rescaling ingestion pipeline before a record may reference
//! them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌───────────┐
//! │ Photo upload │──▶│ Ingest pipeline  │──▶│ Media dir  │
//! └──────────────┘   │ filter/decode/   │   └───────────┘
//!                    │ rescale/write    │
//!                    └───────┬─────────┘
//!                            ▼ filename token
//!                    ┌─────────────────┐   ┌───────────┐
//!                    │ Store records    │──▶│  SQLite    │
//!                    └─────────────────┘   │ FTS5 + geo │
//!                                          └────┬──────┘
//!                             ┌──────────────────┤
//!                             ▼                  ▼
//!                        ┌─────────┐       ┌──────────┐
//!                        │   CLI   │       │ HTTP JSON │
//!                        └─────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error taxonomy |
//! | [`slug`] | Slug derivation and collision counters |
//! | [`ingest`] | Photo ingestion pipeline |
//! | [`discovery`] | Text, tag, and proximity queries |
//! | [`records`] | Create/update/lookup with ownership checks |
//! | [`store`] | Repository trait + SQLite and in-memory backends |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod records;
pub mod server;
pub mod slug;
pub mod store;
