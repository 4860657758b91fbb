//! Index builder
//!
//! Turns a library source tree into an [`IndexSnapshot`]:
//!
//! 1. Make sure the source tree is available (fatal if not)
//! 2. Discover declaration files, API type files, documentation pages, and examples
//! 3. Read and parse declarations in parallel
//! 4. Merge partial classes into one record per component
//! 5. Attach documentation pages, examples, and cross-links
//! 6. Assign every component to a category
//!
//! Nothing is published here: the caller decides what to do with the
//! finished snapshot. Cancellation is observed between files and discards
//! the partial structure.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::categories::{CategoryMapper, CategoryTable};
use crate::config::{Config, IndexConfig, LayoutConfig};
use crate::error::{IndexError, IndexResult};
use crate::models::{ApiReference, ApiTypeKind, Category, ComponentRecord};
use crate::parsers::declaration::ParsedDeclaration;
use crate::parsers::docs_page::DocsPage;
use crate::parsers::example;
use crate::parsers::{DeclarationParser, DocsPageParser, Extractor, SourceKind};
use crate::snapshot::IndexSnapshot;
use crate::source::SourceTree;

/// Files found in the source tree, grouped by role
#[derive(Debug, Default)]
struct DiscoveredFiles {
    declarations: Vec<PathBuf>,
    api_types: Vec<PathBuf>,
    docs_pages: Vec<PathBuf>,
    examples: Vec<PathBuf>,
}

/// A source file read into memory
struct SourceFile {
    relative: String,
    text: String,
    /// Declaration files may define components; API files only types
    components_allowed: bool,
}

/// Builds index snapshots from a source tree
#[derive(Debug, Clone)]
pub struct Indexer {
    config: IndexConfig,
    layout: LayoutConfig,
    categories: CategoryTable,
}

impl Indexer {
    pub fn new(config: IndexConfig, layout: LayoutConfig, categories: CategoryTable) -> Self {
        Self {
            config,
            layout,
            categories,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.index.clone(),
            config.layout.clone(),
            config.categories.clone(),
        )
    }

    /// Run a full build against `source`
    pub async fn build(
        &self,
        source: &dyn SourceTree,
        cancel: &CancellationToken,
    ) -> IndexResult<IndexSnapshot> {
        let start = Instant::now();
        let root = source.root_path().to_path_buf();
        log::info!("Building index from {}", root.display());

        match source.ensure_available(cancel).await {
            Ok(true) if source.is_available() => {}
            Ok(_) => {
                return Err(IndexError::RepositoryUnavailable {
                    root,
                    reason: "source tree not found".to_string(),
                });
            }
            Err(_) if cancel.is_cancelled() => return Err(cancelled()),
            Err(e) => {
                return Err(IndexError::RepositoryUnavailable {
                    root,
                    reason: format!("{:#}", e),
                });
            }
        }

        let discovered = {
            let indexer = self.clone();
            let root = root.clone();
            tokio::task::spawn_blocking(move || indexer.discover_files(&root))
                .await
                .context("File discovery task failed")??
        };
        log::info!(
            "Discovered {} declaration files, {} API type files, {} documentation pages, {} examples",
            discovered.declarations.len(),
            discovered.api_types.len(),
            discovered.docs_pages.len(),
            discovered.examples.len()
        );

        // Read declarations
        let mut sources = Vec::with_capacity(discovered.declarations.len() + discovered.api_types.len());
        let declaration_files = discovered
            .declarations
            .iter()
            .map(|p| (p, true))
            .chain(discovered.api_types.iter().map(|p| (p, false)));
        for (path, components_allowed) in declaration_files {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            if let Some(text) = read_source(path).await {
                sources.push(SourceFile {
                    relative: relative_path(&root, path),
                    text,
                    components_allowed,
                });
            }
        }

        let parsed = self.parse_declarations(sources, cancel).await?;
        let (mut components, api_references) = self.merge_declarations(parsed);

        // Documentation pages
        let mut pages_by_component: HashMap<String, DocsPage> = HashMap::new();
        let mut component_by_dir: HashMap<PathBuf, String> = HashMap::new();
        for path in &discovered.docs_pages {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            let Some(text) = read_source(path).await else {
                continue;
            };
            let Some(page) = DocsPageParser.extract(path, &text) else {
                continue;
            };
            let target = page
                .component
                .clone()
                .or_else(|| self.component_for_dir(path.parent()));
            let Some(name) = target.and_then(|t| find_component(&components, &t, &self.config.component_prefix)) else {
                log::debug!("No indexed component for documentation page {}", path.display());
                continue;
            };
            if let Some(dir) = path.parent() {
                component_by_dir.insert(dir.to_path_buf(), name.clone());
            }
            if let Some(record) = components.get_mut(&name) {
                apply_docs_page(record, &page);
            }
            pages_by_component.insert(name, page);
        }

        // Examples
        let mut examples_found = 0;
        for path in &discovered.examples {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            let page_dir = self.page_dir_of_example(path);
            let owner = page_dir
                .and_then(|dir| component_by_dir.get(dir).cloned())
                .or_else(|| {
                    self.component_for_dir(page_dir)
                        .and_then(|t| find_component(&components, &t, &self.config.component_prefix))
                });
            let Some(owner) = owner else {
                log::debug!("No indexed component for example {}", path.display());
                continue;
            };
            let Some(mut found) = example::extract_file(path, &owner, cancel).await else {
                if cancel.is_cancelled() {
                    return Err(cancelled());
                }
                continue;
            };
            found.source_file = relative_path(&root, path);
            found.description = pages_by_component
                .get(&owner)
                .and_then(|page| page.example_description(&found.name))
                .map(str::to_string);
            if let Some(record) = components.get_mut(&owner) {
                record.examples.push(found);
                examples_found += 1;
            }
        }
        for record in components.values_mut() {
            record.examples.sort_by(|a, b| a.name.cmp(&b.name));
            record
                .examples
                .truncate(self.config.max_examples_per_component);
        }

        resolve_related_links(&mut components, &self.config.component_prefix);

        let mut components: Vec<ComponentRecord> = components.into_values().collect();
        let categories = assign_categories(&mut components, &self.categories);

        let elapsed = start.elapsed();
        let snapshot = IndexSnapshot::new(
            components,
            categories,
            api_references,
            self.config.component_prefix.clone(),
            elapsed,
        );
        log::info!(
            "Index built: {} components, {} categories, {} examples ({} read), {} API references in {:.2?}",
            snapshot.components().len(),
            snapshot.categories().len(),
            snapshot.stats().total_examples,
            examples_found,
            snapshot.api_references().len(),
            elapsed
        );

        Ok(snapshot)
    }

    /// Walk the layout directories and sort files by role
    fn discover_files(&self, root: &Path) -> Result<DiscoveredFiles> {
        let examples_glob = glob_set(&[&format!("**/{}/**/*.razor", self.layout.examples_subdir)])?;
        let mut files = DiscoveredFiles::default();

        for path in walk(&root.join(&self.layout.components_dir))? {
            if SourceKind::detect(&path) == Some(SourceKind::Declaration) {
                files.declarations.push(path);
            }
        }

        for dir in &self.layout.api_dirs {
            for path in walk(&root.join(dir))? {
                if path.extension().is_some_and(|e| e == "cs") {
                    files.api_types.push(path);
                }
            }
        }

        let docs_root = root.join(&self.layout.docs_pages_dir);
        for path in walk(&docs_root)? {
            let relative = path.strip_prefix(&docs_root).unwrap_or(&path);
            if examples_glob.is_match(relative) {
                files.examples.push(path);
            } else if SourceKind::detect(&path) == Some(SourceKind::DocsPage) {
                files.docs_pages.push(path);
            }
        }

        Ok(files)
    }

    /// Parse declaration sources on the rayon pool
    async fn parse_declarations(
        &self,
        sources: Vec<SourceFile>,
        cancel: &CancellationToken,
    ) -> IndexResult<Vec<(bool, ParsedDeclaration)>> {
        let parser = DeclarationParser::new(self.config.include_internal);
        let token = cancel.clone();

        let parsed = tokio::task::spawn_blocking(move || {
            sources
                .par_iter()
                .filter_map(|file| {
                    if token.is_cancelled() {
                        return None;
                    }
                    let parsed = parser.extract(Path::new(&file.relative), &file.text);
                    if parsed.is_none() {
                        log::debug!("No visible declaration in {}", file.relative);
                    }
                    parsed.map(|p| (file.components_allowed, p))
                })
                .collect::<Vec<_>>()
        })
        .await
        .context("Declaration parsing task failed")?;

        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        Ok(parsed)
    }

    /// Merge partial classes into components and collect API references
    fn merge_declarations(
        &self,
        parsed: Vec<(bool, ParsedDeclaration)>,
    ) -> (BTreeMap<String, ComponentRecord>, Vec<ApiReference>) {
        let mut components: BTreeMap<String, ComponentRecord> = BTreeMap::new();
        let mut api: BTreeMap<String, ApiReference> = BTreeMap::new();

        for (components_allowed, mut declaration) in parsed {
            for reference in std::mem::take(&mut declaration.api_types) {
                match api.get_mut(&reference.name) {
                    Some(existing) => merge_api_reference(existing, reference),
                    None => {
                        api.insert(reference.name.clone(), reference);
                    }
                }
            }

            if !components_allowed || !self.is_component(&declaration) {
                continue;
            }
            let record = declaration.record;
            match components.get_mut(&record.name) {
                Some(existing) => merge_partial(existing, record),
                None => {
                    components.insert(record.name.clone(), record);
                }
            }
        }

        if !self.config.include_internal {
            components.retain(|name, record| {
                if record.deprecated {
                    log::debug!("Skipping deprecated component {}", name);
                }
                !record.deprecated
            });
        }

        (components, api.into_values().collect())
    }

    fn is_component(&self, declaration: &ParsedDeclaration) -> bool {
        let name = &declaration.record.name;
        declaration.kind == ApiTypeKind::Class
            && !declaration.is_static
            && name.len() > self.config.component_prefix.len()
            && name.starts_with(&self.config.component_prefix)
    }

    /// Component name implied by a documentation page directory (`Button` → `MudButton`)
    fn component_for_dir(&self, dir: Option<&Path>) -> Option<String> {
        let name = dir?.file_name()?.to_str()?;
        Some(format!("{}{}", self.config.component_prefix, name))
    }

    /// Page directory owning an example: the parent of the examples subdirectory
    fn page_dir_of_example<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.ancestors()
            .find(|dir| {
                dir.file_name()
                    .is_some_and(|n| n.to_string_lossy() == self.layout.examples_subdir)
            })
            .and_then(Path::parent)
    }
}

fn cancelled() -> IndexError {
    log::info!("Index build cancelled");
    IndexError::Cancelled
}

async fn read_source(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn glob_set(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    builder.build().context("Failed to build glob set")
}

/// Files under `dir`, sorted. A missing directory yields nothing.
fn walk(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        log::debug!("Skipping missing directory {}", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkBuilder::new(dir).build() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Case-insensitive component lookup by name or prefixed display name
fn find_component(
    components: &BTreeMap<String, ComponentRecord>,
    name: &str,
    prefix: &str,
) -> Option<String> {
    let name = name.trim();
    let prefixed = format!("{}{}", prefix, name);
    components
        .keys()
        .find(|k| k.eq_ignore_ascii_case(name))
        .or_else(|| components.keys().find(|k| k.eq_ignore_ascii_case(&prefixed)))
        .cloned()
}

/// Fold another partial declaration of the same class into `existing`
fn merge_partial(existing: &mut ComponentRecord, other: ComponentRecord) {
    existing.namespace = existing.namespace.take().or(other.namespace);
    existing.summary = existing.summary.take().or(other.summary);
    existing.description = existing.description.take().or(other.description);
    existing.base_type = existing.base_type.take().or(other.base_type);
    existing.source_file = existing.source_file.take().or(other.source_file);
    existing.deprecated |= other.deprecated;
    existing.internal &= other.internal;

    for parameter in other.parameters {
        if existing.parameter(&parameter.name).is_none() {
            existing.parameters.push(parameter);
        }
    }
    for event in other.events {
        if !existing.events.iter().any(|e| e.name == event.name) {
            existing.events.push(event);
        }
    }
    for method in other.methods {
        if !existing.methods.iter().any(|m| m.name == method.name) {
            existing.methods.push(method);
        }
    }
}

fn merge_api_reference(existing: &mut ApiReference, other: ApiReference) {
    existing.namespace = existing.namespace.take().or(other.namespace);
    existing.summary = existing.summary.take().or(other.summary);
    existing.base_type = existing.base_type.take().or(other.base_type);
    for member in other.members {
        if !existing.members.iter().any(|m| m.name == member.name) {
            existing.members.push(member);
        }
    }
    for value in other.values {
        if !existing.values.iter().any(|v| v.name == value.name) {
            existing.values.push(value);
        }
    }
}

/// Documentation pages only add what declarations cannot provide
fn apply_docs_page(record: &mut ComponentRecord, page: &DocsPage) {
    if record.doc_title.is_none() {
        record.doc_title = page.title.clone();
    }
    if record.doc_subtitle.is_none() {
        record.doc_subtitle = page.subtitle.clone();
    }
    record.sections.extend(page.sections.iter().cloned());
    for link in &page.links {
        if !record
            .related_components
            .iter()
            .any(|r| r.eq_ignore_ascii_case(link))
        {
            record.related_components.push(link.clone());
        }
    }
}

/// Replace link targets with canonical component names, dropping unknown
/// targets and self references
fn resolve_related_links(components: &mut BTreeMap<String, ComponentRecord>, prefix: &str) {
    let resolved: Vec<(String, Vec<String>)> = components
        .iter()
        .map(|(name, record)| {
            let mut links: Vec<String> = Vec::new();
            for link in &record.related_components {
                let Some(target) = find_component(components, link, prefix) else {
                    continue;
                };
                if &target != name && !links.contains(&target) {
                    links.push(target);
                }
            }
            (name.clone(), links)
        })
        .collect();

    for (name, links) in resolved {
        if let Some(record) = components.get_mut(&name) {
            record.related_components = links;
        }
    }
}

/// Set each component's category and build the category list.
///
/// Curated categories come first in table order and are kept even when
/// empty; inferred categories follow in first-seen order.
fn assign_categories(components: &mut [ComponentRecord], table: &CategoryTable) -> Vec<Category> {
    let mapper = CategoryMapper::initialize(table);
    let mut categories = mapper.seed_categories();

    for record in components.iter_mut() {
        let name = mapper.resolve(&record.name);
        let index = match categories.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                categories.push(Category {
                    name: name.clone(),
                    title: None,
                    description: None,
                    components: Vec::new(),
                });
                categories.len() - 1
            }
        };
        categories[index].components.push(record.name.clone());
        record.category = Some(name);
    }

    categories
}
