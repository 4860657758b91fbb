//! Test helpers for corpus-based testing
//!
//! The corpus under `tests/corpus/mudblazor` is a trimmed-down copy of the
//! library layout: component declarations, enums, documentation pages and
//! examples.

#![allow(dead_code)]

use mudscope::{ComponentRecord, Config, QueryEngine};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Root of the fixture source tree
pub fn corpus_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/corpus/mudblazor")
}

/// Default config pointed at the fixture tree
pub fn corpus_config() -> Config {
    let mut config = Config::default();
    config.source.root = corpus_root();
    config
}

/// Build an engine over the corpus and index it
pub async fn corpus_engine() -> QueryEngine {
    let engine = QueryEngine::from_config(&corpus_config());
    engine
        .build(&CancellationToken::new())
        .await
        .expect("Failed to index corpus");
    engine
}

/// Names of the given records, in order
pub fn names(records: &[ComponentRecord]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}

/// Assert that a component resolves and return it
pub fn component(engine: &QueryEngine, name: &str) -> ComponentRecord {
    engine
        .component(name)
        .expect("Query failed")
        .unwrap_or_else(|| panic!("Expected component '{}' to resolve", name))
}
