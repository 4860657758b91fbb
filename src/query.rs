//! Query engine over the published index
//!
//! The engine owns the active [`IndexSnapshot`] behind an atomic pointer.
//! Builds run into a fresh, unpublished snapshot and publish it with a
//! single swap, so readers always see either the previous or the next
//! complete index and never wait on a build.
//!
//! Query operations are synchronous and purely in-memory. Only `build` and
//! `ensure_indexed` suspend.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheOptions, CacheStatistics, MemoryCache};
use crate::config::Config;
use crate::error::{IndexError, IndexResult};
use crate::indexer::Indexer;
use crate::models::{ApiReference, Category, ComponentRecord, IndexState, IndexStats};
use crate::snapshot::{IndexSnapshot, RelationshipKind, SearchFields};
use crate::source::{self, SourceTree};

/// Maximum `max_results` accepted by search
pub const MAX_SEARCH_RESULTS: usize = 50;

const SNAPSHOT_KEY: &str = "snapshot";

/// Clears the building flag when a build ends, however it ends
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builds, publishes, and queries component indexes
pub struct QueryEngine {
    indexer: Indexer,
    source: Arc<dyn SourceTree>,
    snapshot: ArcSwapOption<IndexSnapshot>,
    build_lock: tokio::sync::Mutex<()>,
    building: AtomicBool,
    generation: AtomicU64,
    /// Coalesces `ensure_indexed` callers and expires the index
    snapshot_cache: MemoryCache<Arc<IndexSnapshot>>,
    /// Search results keyed by generation and query
    search_cache: MemoryCache<Arc<Vec<ComponentRecord>>>,
}

impl QueryEngine {
    pub fn new(indexer: Indexer, source: Arc<dyn SourceTree>, cache_options: CacheOptions) -> Self {
        Self {
            indexer,
            source,
            snapshot: ArcSwapOption::empty(),
            build_lock: tokio::sync::Mutex::new(()),
            building: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            snapshot_cache: MemoryCache::new(cache_options),
            search_cache: MemoryCache::new(cache_options),
        }
    }

    /// Engine for a loaded config: source provider, indexer, and cache policy
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Indexer::from_config(config),
            Arc::from(source::from_config(&config.source)),
            config.cache.options(),
        )
    }

    pub fn source(&self) -> &dyn SourceTree {
        self.source.as_ref()
    }

    /// Build and publish a new snapshot.
    ///
    /// A build already in progress is not restarted: the call fails with
    /// `BuildInProgress`. On failure or cancellation the previously published
    /// snapshot, if any, stays in place.
    pub async fn build(&self, cancel: &CancellationToken) -> IndexResult<IndexStats> {
        let Ok(_guard) = self.build_lock.try_lock() else {
            log::debug!("Rejecting build request: a build is already running");
            return Err(IndexError::BuildInProgress);
        };
        let snapshot = self.run_build(cancel).await?;
        Ok(snapshot.stats())
    }

    /// Return the published snapshot, building one if none exists or the
    /// cached one has expired. Concurrent callers share a single build, and a
    /// caller that waited behind a running `build` takes its result.
    pub async fn ensure_indexed(&self, cancel: &CancellationToken) -> IndexResult<Arc<IndexSnapshot>> {
        self.snapshot_cache
            .get_or_create(SNAPSHOT_KEY, || async {
                let seen = self.generation.load(Ordering::Acquire);
                let _guard = self.build_lock.lock().await;
                if self.generation.load(Ordering::Acquire) != seen {
                    if let Some(snapshot) = self.snapshot.load_full() {
                        log::debug!("Reusing generation {} published while waiting", snapshot.generation());
                        return Ok(snapshot);
                    }
                }
                self.run_build(cancel).await
            })
            .await
    }

    /// Caller must hold `build_lock`
    async fn run_build(&self, cancel: &CancellationToken) -> IndexResult<Arc<IndexSnapshot>> {
        let _building = BuildingFlag::set(&self.building);

        let result = self.indexer.build(self.source.as_ref(), cancel).await;
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(IndexError::Cancelled) => return Err(IndexError::Cancelled),
            Err(e) => {
                log::warn!("Index build failed: {}", e);
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(snapshot.with_generation(generation));
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        self.snapshot_cache.set(SNAPSHOT_KEY, Arc::clone(&snapshot))?;
        let current = format!("search:{}:", generation);
        let evicted = self.search_cache.remove_where(|key| !key.starts_with(&current))?;
        log::info!(
            "Published index generation {} ({} stale search results dropped)",
            generation,
            evicted
        );

        Ok(snapshot)
    }

    fn current(&self) -> IndexResult<Arc<IndexSnapshot>> {
        self.snapshot.load_full().ok_or(IndexError::NotIndexed)
    }

    pub fn state(&self) -> IndexState {
        if self.building.load(Ordering::Acquire) {
            IndexState::Building
        } else if self.is_indexed() {
            IndexState::Indexed
        } else {
            IndexState::NotIndexed
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.snapshot.load().is_some()
    }

    pub fn last_build_time(&self) -> Option<DateTime<Utc>> {
        self.snapshot.load_full().map(|s| s.built_at())
    }

    /// Components matching `query` in the selected fields, in index order.
    ///
    /// Results are memoised per snapshot generation.
    pub fn search(
        &self,
        query: &str,
        fields: SearchFields,
        max_results: usize,
    ) -> IndexResult<Vec<ComponentRecord>> {
        let snapshot = self.current()?;

        let query = query.trim();
        if query.is_empty() {
            return Err(IndexError::invalid("query", "must not be empty"));
        }
        if fields.is_empty() {
            return Err(IndexError::invalid("fields", "select at least one field"));
        }
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_results) {
            return Err(IndexError::invalid(
                "max_results",
                format!("must be between 1 and {}", MAX_SEARCH_RESULTS),
            ));
        }

        let key = format!(
            "search:{}:{}:{}:{}",
            snapshot.generation(),
            fields.bits(),
            max_results,
            query.to_lowercase()
        );
        if let Some(cached) = self.search_cache.get(&key)? {
            return Ok(cached.as_ref().clone());
        }

        let results: Vec<ComponentRecord> = snapshot
            .search(query, fields, max_results)
            .into_iter()
            .cloned()
            .collect();
        log::debug!("Search '{}' matched {} components", query, results.len());
        self.search_cache.set(&key, Arc::new(results.clone()))?;
        Ok(results)
    }

    /// Search with a textual field selector (`name,description`, `all`)
    pub fn search_str(
        &self,
        query: &str,
        fields: &str,
        max_results: usize,
    ) -> IndexResult<Vec<ComponentRecord>> {
        let fields = fields
            .parse::<SearchFields>()
            .map_err(|reason| IndexError::invalid("fields", reason))?;
        self.search(query, fields, max_results)
    }

    /// Members of a category; empty when the category is unknown
    pub fn components_in_category(&self, category: &str) -> IndexResult<Vec<ComponentRecord>> {
        let snapshot = self.current()?;
        Ok(snapshot
            .components_in_category(category)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn categories(&self) -> IndexResult<Vec<Category>> {
        Ok(self.current()?.categories().to_vec())
    }

    pub fn category(&self, name: &str) -> IndexResult<Category> {
        self.current()?
            .category(name)
            .cloned()
            .ok_or_else(|| IndexError::UnknownCategory {
                name: name.to_string(),
            })
    }

    /// Component by full or display name
    pub fn component(&self, name: &str) -> IndexResult<Option<ComponentRecord>> {
        Ok(self.current()?.resolve(name).cloned())
    }

    pub fn related(&self, name: &str, kind: RelationshipKind) -> IndexResult<Vec<ComponentRecord>> {
        let snapshot = self.current()?;
        if name.trim().is_empty() {
            return Err(IndexError::invalid("component", "must not be empty"));
        }
        let component = snapshot
            .resolve(name)
            .ok_or_else(|| IndexError::UnknownComponent {
                name: name.to_string(),
            })?;
        Ok(snapshot
            .related(component, kind)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Related components with a textual relationship kind (`parent`, `siblings`, ...)
    pub fn related_str(&self, name: &str, kind: &str) -> IndexResult<Vec<ComponentRecord>> {
        let kind = kind.trim().parse::<RelationshipKind>().map_err(|_| {
            IndexError::invalid(
                "relationship",
                format!(
                    "unknown kind '{}' (expected parent, child, sibling, commonly_used_with or all)",
                    kind
                ),
            )
        })?;
        self.related(name, kind)
    }

    pub fn api_reference(&self, name: &str) -> IndexResult<Option<ApiReference>> {
        Ok(self.current()?.api_reference(name).cloned())
    }

    /// Component names in index order, optionally limited to one category
    pub fn list_components(&self, category: Option<&str>) -> IndexResult<Vec<String>> {
        let snapshot = self.current()?;
        match category {
            Some(name) => {
                let category = snapshot
                    .category(name)
                    .ok_or_else(|| IndexError::UnknownCategory {
                        name: name.to_string(),
                    })?;
                Ok(category.components.clone())
            }
            None => Ok(snapshot
                .components()
                .iter()
                .map(|c| c.name.clone())
                .collect()),
        }
    }

    pub fn list_api_references(&self) -> IndexResult<Vec<String>> {
        Ok(self
            .current()?
            .api_references()
            .iter()
            .map(|a| a.name.clone())
            .collect())
    }

    pub fn stats(&self) -> IndexResult<IndexStats> {
        Ok(self.current()?.stats())
    }

    /// Counters of the search result cache
    pub fn cache_statistics(&self) -> IndexResult<CacheStatistics> {
        Ok(self.search_cache.statistics()?)
    }

    /// Tear down the caches. Later cached operations fail with `Disposed`.
    pub fn dispose(&self) {
        self.search_cache.dispose();
        self.snapshot_cache.dispose();
    }
}
