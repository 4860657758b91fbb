//! mudscope: a queryable knowledge index of the MudBlazor component library
//!
//! mudscope scans a MudBlazor source tree and builds an in-memory index of
//! its components: parameters, events, public methods, documentation
//! sections, code examples, categories and relationships between components.
//!
//! # Architecture
//!
//! - **Source**: makes the library tree available (local directory or git clone)
//! - **Indexer**: walks the tree, runs the extractors and merges their output
//!   into an immutable [`IndexSnapshot`]
//! - **Query Engine**: publishes snapshots atomically and answers lookups,
//!   search, category and relationship queries
//! - **Cache**: keyed result cache with sliding and absolute expiry
//!
//! # Example Usage
//!
//! ```no_run
//! use mudscope::{Config, QueryEngine, SearchFields};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let engine = QueryEngine::from_config(&config);
//! engine.build(&CancellationToken::new()).await?;
//!
//! for component in engine.search("button", SearchFields::ALL, 10)? {
//!     println!("{}", component.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod categories;
pub mod cli;
pub mod config;
pub mod error;
pub mod indexer;
pub mod models;
pub mod output;
pub mod parsers;
pub mod query;
pub mod snapshot;
pub mod source;

// Re-export commonly used types
pub use cache::{CacheOptions, CacheStatistics, MemoryCache};
pub use categories::CategoryMapper;
pub use config::Config;
pub use error::{CacheError, IndexError, IndexResult};
pub use indexer::Indexer;
pub use models::{
    ApiReference, Category, ComponentRecord, EventDescriptor, Example, IndexState, IndexStats,
    MethodDescriptor, Parameter,
};
pub use query::QueryEngine;
pub use snapshot::{IndexSnapshot, RelationshipKind, SearchFields};
pub use source::{GitSourceTree, LocalSourceTree, SourceTree};
