//! # storemap CLI
//!
//! The `storemap` binary is the primary interface for the store registry.
//! All commands accept a `--config` flag pointing to a TOML configuration
//! file.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `storemap init` | Create the SQLite database and run schema migrations |
//! | `storemap add` | Ingest an optional photo and create a store record |
//! | `storemap update <id>` | Ownership-checked mutation of a record |
//! | `storemap get <slug>` | Retrieve a store by slug |
//! | `storemap list` | List all stores |
//! | `storemap search "<query>"` | Relevance-ranked text search |
//! | `storemap tags [tag]` | Tag browsing |
//! | `storemap near <lng> <lat>` | Proximity search |
//! | `storemap serve http` | Start the JSON API server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use storemap::config::{self, Config};
use storemap::ingest::PhotoUpload;
use storemap::models::{Location, StoreDraft, StorePatch};
use storemap::store::{sqlite::SqliteRepository, StoreRepository};
use storemap::{db, discovery, migrate, records, server};

/// storemap — a local-first store registry with full-text, tag, and
/// proximity discovery.
#[derive(Parser)]
#[command(
    name = "storemap",
    about = "A local-first store registry with full-text, tag, and proximity discovery",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/storemap.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the stores table, and the FTS5
    /// search index. Idempotent — running it multiple times is safe.
    Init,

    /// Create a store record, ingesting an optional photo first.
    Add {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Tag label; repeat for multiple tags. Omit entirely to create a
        /// store with no tags field.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Longitude of the store location.
        #[arg(long)]
        lng: f64,

        /// Latitude of the store location.
        #[arg(long)]
        lat: f64,

        /// Owning user identity.
        #[arg(long)]
        author: String,

        /// Path to a photo file to ingest (type derived from extension).
        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// Update a store record. Fails unless --author matches the owner.
    Update {
        /// Store record id.
        id: String,

        /// Acting identity; must equal the record's author.
        #[arg(long)]
        author: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        lng: f64,

        #[arg(long)]
        lat: f64,

        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// Retrieve a store by slug.
    Get {
        slug: String,
    },

    /// List all stores.
    List,

    /// Relevance-ranked text search over names and descriptions.
    Search {
        /// The search query string.
        query: String,
    },

    /// Tag browsing: all tagged stores, or stores carrying a specific tag.
    Tags {
        tag: Option<String>,
    },

    /// Proximity search: stores near a coordinate, nearest first.
    Near {
        lng: String,
        lat: String,
    },

    /// Start the JSON API server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Serve the JSON discovery API and static media assets.
    Http,
}

/// Declared media type for a photo path, from its extension. Unknown
/// extensions map to an opaque binary type that the pipeline rejects.
fn content_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "gif" => "image/gif".to_string(),
        "webp" => "image/webp".to_string(),
        "bmp" => "image/bmp".to_string(),
        "tif" | "tiff" => "image/tiff".to_string(),
        other => format!("application/{}", if other.is_empty() { "octet-stream" } else { other }),
    }
}

fn read_upload(path: Option<&Path>, config: &Config) -> Result<Option<PhotoUpload>> {
    let Some(path) = path else { return Ok(None) };
    let bytes = std::fs::read(path)?;
    let upload = PhotoUpload::accept(&content_type_for(path), bytes, &config.media)?;
    Ok(Some(upload))
}

fn tags_field(tags: Vec<String>) -> Option<Vec<String>> {
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

async fn open_repository(config: &Config) -> Result<Arc<dyn StoreRepository>> {
    let pool = db::connect(&config.db).await?;
    Ok(Arc::new(SqliteRepository::new(pool)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            name,
            description,
            tags,
            lng,
            lat,
            author,
            photo,
        } => {
            let repo = open_repository(&cfg).await?;
            let upload = read_upload(photo.as_deref(), &cfg)?;
            let draft = StoreDraft {
                name,
                description,
                tags: tags_field(tags),
                location: Location::point(lng, lat),
                photo: None,
                author,
            };
            let store = records::create_store(repo.as_ref(), &cfg.media, draft, upload).await?;
            print_json(&store)?;
        }
        Commands::Update {
            id,
            author,
            name,
            description,
            tags,
            lng,
            lat,
            photo,
        } => {
            let repo = open_repository(&cfg).await?;
            let upload = read_upload(photo.as_deref(), &cfg)?;
            let patch = StorePatch {
                name,
                description,
                tags: tags_field(tags),
                location: Location::point(lng, lat),
                photo: None,
            };
            let store =
                records::update_store(repo.as_ref(), &cfg.media, &id, &author, patch, upload)
                    .await?;
            print_json(&store)?;
        }
        Commands::Get { slug } => {
            let repo = open_repository(&cfg).await?;
            let store = records::get_store_by_slug(repo.as_ref(), &slug).await?;
            print_json(&store)?;
        }
        Commands::List => {
            let repo = open_repository(&cfg).await?;
            let stores = records::list_stores(repo.as_ref()).await?;
            print_json(&stores)?;
        }
        Commands::Search { query } => {
            let repo = open_repository(&cfg).await?;
            let hits =
                discovery::search_stores(repo.as_ref(), &query, cfg.discovery.search_limit).await?;
            print_json(&hits)?;
        }
        Commands::Tags { tag } => {
            let repo = open_repository(&cfg).await?;
            let page = discovery::stores_by_tag(repo.as_ref(), tag.as_deref()).await?;
            print_json(&page)?;
        }
        Commands::Near { lng, lat } => {
            let repo = open_repository(&cfg).await?;
            let stores = discovery::map_stores(
                repo.as_ref(),
                &lng,
                &lat,
                cfg.discovery.near_max_distance_m,
                cfg.discovery.near_limit,
            )
            .await?;
            print_json(&stores)?;
        }
        Commands::Serve { service } => match service {
            ServeService::Http => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}
