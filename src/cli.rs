//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::IndexError;
use crate::models::{ApiReference, Category, ComponentRecord, IndexStats};
use crate::output;
use crate::query::{MAX_SEARCH_RESULTS, QueryEngine};
use crate::snapshot::RelationshipKind;

/// mudscope: component knowledge index for MudBlazor
#[derive(Parser, Debug)]
#[command(
    name = "mudscope",
    version,
    about = "Index and query the MudBlazor component library",
    long_about = "mudscope scans a MudBlazor source tree (component declarations, \
                  documentation pages and examples) and answers questions about \
                  components, parameters, categories and relationships."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./mudscope.toml, then ~/.mudscope/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Library source tree root (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Also index internal and deprecated types
    #[arg(long, global = true)]
    pub include_internal: bool,

    /// Suppress the progress spinner and build summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the index and print a summary
    Index {
        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Search components by name, description, parameters or examples
    ///
    /// Examples:
    ///   mudscope search button
    ///   mudscope search "color" --fields parameters --max 5
    Search {
        /// Case-insensitive search text
        query: String,

        /// Fields to match: name, description, parameters, examples, or all
        #[arg(short, long, default_value = "all")]
        fields: String,

        /// Maximum number of results (1-50)
        #[arg(short, long, default_value_t = 10)]
        max: usize,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Show the full record for one component, or list component names
    ///
    /// Accepts the class name (MudButton), the display name (Button) or a
    /// generic spelling (MudSelect<T>).
    Component {
        /// Component name (omit to list all)
        name: Option<String>,

        /// Only list components in this category (when listing)
        #[arg(short, long)]
        category: Option<String>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// List every category with its components
    Categories {
        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// List the components in one category
    Category {
        name: String,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Show components related to a component
    ///
    /// Relationship kinds: parent, child, sibling, commonly_used_with, all
    Related {
        name: String,

        #[arg(default_value = "all")]
        kind: String,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Show the API reference for a type, or list every referenced type
    Api {
        /// Type name (omit to list all)
        name: Option<String>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Show index statistics
    Stats {
        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let config = self.load_config()?;
        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        let quiet = self.quiet;

        runtime.block_on(async move {
            let engine = QueryEngine::from_config(&config);
            let stats = build_index(&engine, quiet).await?;
            let result = run_command(&engine, self.command, &stats, quiet);
            engine.dispose();
            result
        })
    }

    /// Config file plus command-line overrides
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        log::debug!("Source tree: {}", config.source.root.display());
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.source.root = source.clone();
            // An explicit local tree is never fetched
            config.source.repository_url = None;
        }
        if self.include_internal {
            config.index.include_internal = true;
        }
    }
}

/// Build the index, cancelling on Ctrl-C
async fn build_index(engine: &QueryEngine, quiet: bool) -> Result<IndexStats> {
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupt received, cancelling build");
                cancel.cancel();
            }
        }
    });

    let spinner = (!quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Indexing {}", engine.source().root_path().display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = engine.build(&cancel).await;
    ctrl_c.abort();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match result {
        Ok(stats) => Ok(stats),
        Err(IndexError::Cancelled) => anyhow::bail!("Indexing cancelled"),
        Err(e @ IndexError::RepositoryUnavailable { .. }) => Err(anyhow::Error::new(e).context(
            "Pass --source <DIR> or set [source] root in mudscope.toml to point at a MudBlazor checkout",
        )),
        Err(e) => Err(e.into()),
    }
}

fn run_command(engine: &QueryEngine, command: Command, stats: &IndexStats, quiet: bool) -> Result<()> {
    match command {
        Command::Index { json, pretty } => handle_index(stats, quiet, json, pretty),
        Command::Search { query, fields, max, json, pretty } => {
            handle_search(engine, &query, &fields, max, json, pretty)
        }
        Command::Component { name: Some(name), json, pretty, .. } => {
            handle_component(engine, &name, json, pretty)
        }
        Command::Component { name: None, category, json, pretty } => {
            handle_component_list(engine, category.as_deref(), json, pretty)
        }
        Command::Categories { json, pretty } => handle_categories(engine, json, pretty),
        Command::Category { name, json, pretty } => handle_category(engine, &name, json, pretty),
        Command::Related { name, kind, json, pretty } => {
            handle_related(engine, &name, &kind, json, pretty)
        }
        Command::Api { name, json, pretty } => handle_api(engine, name.as_deref(), json, pretty),
        Command::Stats { json, pretty } => handle_stats(engine, json, pretty),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json_output);
    Ok(())
}

/// Handle the `index` subcommand
fn handle_index(stats: &IndexStats, quiet: bool, as_json: bool, pretty_json: bool) -> Result<()> {
    if as_json {
        return print_json(stats, pretty_json);
    }
    if quiet {
        return Ok(());
    }

    println!("Indexing complete!");
    println!("  Components:      {}", stats.total_components);
    println!("  Categories:      {}", stats.total_categories);
    println!("  Parameters:      {}", stats.total_parameters);
    println!("  Events:          {}", stats.total_events);
    println!("  Examples:        {}", stats.total_examples);
    println!("  API references:  {}", stats.total_api_references);
    println!("  Build time:      {} ms", stats.build_duration_ms);
    Ok(())
}

/// Handle the `search` subcommand
fn handle_search(
    engine: &QueryEngine,
    query: &str,
    fields: &str,
    max: usize,
    as_json: bool,
    pretty_json: bool,
) -> Result<()> {
    log::info!("Searching for '{}' in {}", query, fields);

    if max > MAX_SEARCH_RESULTS {
        output::warn(&format!("--max is capped at {}", MAX_SEARCH_RESULTS));
    }
    let results = engine.search_str(query, fields, max.min(MAX_SEARCH_RESULTS))?;

    if as_json {
        return print_json(&results, pretty_json);
    }

    if results.is_empty() {
        output::info(&format!("No components match '{}'", query));
        return Ok(());
    }
    for component in &results {
        print_component_line(component);
    }
    Ok(())
}

/// Handle the `component` subcommand
fn handle_component(engine: &QueryEngine, name: &str, as_json: bool, pretty_json: bool) -> Result<()> {
    let Some(component) = engine.component(name)? else {
        return Err(IndexError::UnknownComponent { name: name.to_string() }.into());
    };

    if as_json {
        return print_json(&component, pretty_json);
    }

    println!("{}", component.name.bold());
    if let Some(category) = &component.category {
        println!("Category:   {}", category);
    }
    if let Some(base) = &component.base_type {
        println!("Inherits:   {}", base);
    }
    if let Some(namespace) = &component.namespace {
        println!("Namespace:  {}", namespace);
    }
    if component.deprecated {
        println!("{}", "Deprecated".yellow());
    }
    if let Some(text) = component.description.as_ref().or(component.summary.as_ref()) {
        println!("\n{}", text);
    }

    if !component.parameters.is_empty() {
        println!("\nParameters:");
        for param in &component.parameters {
            let mut flags = Vec::new();
            if param.is_required {
                flags.push("required");
            }
            if param.is_cascading {
                flags.push("cascading");
            }
            let flags = if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) };
            let default = param
                .default_value
                .as_ref()
                .map(|d| format!(" = {}", d))
                .unwrap_or_default();
            println!("  {}: {}{}{}", param.name.cyan(), param.type_name, default, flags.dimmed());
        }
    }

    if !component.events.is_empty() {
        println!("\nEvents:");
        for event in &component.events {
            match &event.event_args_type {
                Some(args) => println!("  {} ({})", event.name.cyan(), args),
                None => println!("  {}", event.name.cyan()),
            }
        }
    }

    if !component.methods.is_empty() {
        println!("\nMethods:");
        for method in &component.methods {
            let params: Vec<String> = method
                .parameters
                .iter()
                .map(|p| format!("{} {}", p.type_name, p.name))
                .collect();
            println!("  {} {}({})", method.return_type, method.name.cyan(), params.join(", "));
        }
    }

    if !component.examples.is_empty() {
        println!("\nExamples:");
        for example in &component.examples {
            if example.features.is_empty() {
                println!("  {}", example.name);
            } else {
                println!("  {} {}", example.name, format!("({})", example.features.join(", ")).dimmed());
            }
        }
    }

    if !component.related_components.is_empty() {
        println!("\nSee also: {}", component.related_components.join(", "));
    }
    Ok(())
}

/// Handle `component` without a name
fn handle_component_list(
    engine: &QueryEngine,
    category: Option<&str>,
    as_json: bool,
    pretty_json: bool,
) -> Result<()> {
    let names = engine.list_components(category)?;
    if as_json {
        return print_json(&names, pretty_json);
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// Handle the `categories` subcommand
fn handle_categories(engine: &QueryEngine, as_json: bool, pretty_json: bool) -> Result<()> {
    let categories = engine.categories()?;
    if as_json {
        return print_json(&categories, pretty_json);
    }
    for category in &categories {
        print_category(category);
    }
    Ok(())
}

/// Handle the `category` subcommand
fn handle_category(engine: &QueryEngine, name: &str, as_json: bool, pretty_json: bool) -> Result<()> {
    let category = engine.category(name)?;
    if as_json {
        return print_json(&category, pretty_json);
    }

    print_category(&category);
    for component in engine.components_in_category(&category.name)? {
        print_component_line(&component);
    }
    Ok(())
}

/// Handle the `related` subcommand
fn handle_related(
    engine: &QueryEngine,
    name: &str,
    kind: &str,
    as_json: bool,
    pretty_json: bool,
) -> Result<()> {
    let related = engine.related_str(name, kind)?;
    if as_json {
        return print_json(&related, pretty_json);
    }

    if related.is_empty() {
        // Parsed again only for the message; related_str already validated it
        let kind = kind.parse::<RelationshipKind>().map(|k| k.to_string()).unwrap_or_default();
        output::info(&format!("No {} relationships for {}", kind, name));
        return Ok(());
    }
    for component in &related {
        print_component_line(component);
    }
    Ok(())
}

/// Handle the `api` subcommand
fn handle_api(engine: &QueryEngine, name: Option<&str>, as_json: bool, pretty_json: bool) -> Result<()> {
    let Some(name) = name else {
        let names = engine.list_api_references()?;
        if as_json {
            return print_json(&names, pretty_json);
        }
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    };

    let Some(reference) = engine.api_reference(name)? else {
        anyhow::bail!("No API reference for '{}'. Run 'mudscope api' to list known types.", name);
    };
    if as_json {
        return print_json(&reference, pretty_json);
    }
    print_api_reference(&reference);
    Ok(())
}

/// Handle the `stats` subcommand
fn handle_stats(engine: &QueryEngine, as_json: bool, pretty_json: bool) -> Result<()> {
    let stats = engine.stats()?;
    let cache = engine.cache_statistics()?;

    if as_json {
        #[derive(Serialize)]
        struct StatsOutput<'a> {
            #[serde(flatten)]
            index: &'a IndexStats,
            cache: crate::cache::CacheStatistics,
        }
        return print_json(&StatsOutput { index: &stats, cache }, pretty_json);
    }

    println!("mudscope Index Statistics");
    println!("=========================");
    println!("Source:          {}", engine.source().root_path().display());
    println!("Components:      {}", stats.total_components);
    println!("Categories:      {}", stats.total_categories);
    println!("Parameters:      {}", stats.total_parameters);
    println!("Events:          {}", stats.total_events);
    println!("Methods:         {}", stats.total_methods);
    println!("Examples:        {}", stats.total_examples);
    println!("API references:  {}", stats.total_api_references);
    println!("Built at:        {}", stats.built_at.to_rfc3339());
    println!("Build time:      {} ms", stats.build_duration_ms);
    println!("Cache entries:   {} ({} hits, {} misses)", cache.item_count, cache.hit_count, cache.miss_count);
    Ok(())
}

fn print_component_line(component: &ComponentRecord) {
    let summary = component
        .summary
        .as_deref()
        .or(component.description.as_deref())
        .map(|s| truncate_preview(s, 80))
        .unwrap_or_default();
    println!("{:<28} {}", component.name.bold(), summary.dimmed());
}

fn print_category(category: &Category) {
    let title = category.title.as_deref().unwrap_or(&category.name);
    println!("{} ({})", title.bold(), category.components.len());
    if let Some(description) = &category.description {
        println!("  {}", description.dimmed());
    }
    if !category.components.is_empty() {
        println!("  {}", category.components.join(", "));
    }
}

fn print_api_reference(reference: &ApiReference) {
    println!("{} {}", reference.kind, reference.name.bold());
    if let Some(namespace) = &reference.namespace {
        println!("Namespace: {}", namespace);
    }
    if let Some(base) = &reference.base_type {
        println!("Inherits:  {}", base);
    }
    if let Some(summary) = &reference.summary {
        println!("\n{}", summary);
    }
    if !reference.values.is_empty() {
        println!("\nValues:");
        for value in &reference.values {
            match &value.value {
                Some(v) => println!("  {} = {}", value.name.cyan(), v),
                None => println!("  {}", value.name.cyan()),
            }
        }
    }
    if !reference.members.is_empty() {
        println!("\nMembers:");
        for member in &reference.members {
            println!("  {} {}: {}", member.kind, member.name.cyan(), member.type_name);
        }
    }
}

/// Truncate at a word boundary, adding an ellipsis if truncated
pub fn truncate_preview(preview: &str, max_length: usize) -> String {
    if preview.chars().count() <= max_length {
        return preview.to_string();
    }

    let truncate_at = preview
        .char_indices()
        .take(max_length)
        .filter(|(_, c)| c.is_whitespace())
        .last()
        .map(|(i, _)| i)
        .unwrap_or_else(|| {
            preview
                .char_indices()
                .nth(max_length)
                .map(|(i, _)| i)
                .unwrap_or(preview.len())
        });

    let mut truncated = preview[..truncate_at].trim_end().to_string();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let cli = Cli::try_parse_from([
            "mudscope", "search", "button", "--fields", "name,description", "--max", "5", "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Search { query, fields, max, json, pretty } => {
                assert_eq!(query, "button");
                assert_eq!(fields, "name,description");
                assert_eq!(max, 5);
                assert!(json);
                assert!(!pretty);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mudscope", "stats", "--source", "/tmp/mud", "--include-internal", "-vv", "-q",
        ])
        .unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("/tmp/mud")));
        assert!(cli.include_internal);
        assert!(cli.quiet);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_related_kind_defaults_to_all() {
        let cli = Cli::try_parse_from(["mudscope", "related", "MudButton"]).unwrap();
        match cli.command {
            Command::Related { name, kind, .. } => {
                assert_eq!(name, "MudButton");
                assert_eq!(kind, "all");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_component_without_name_lists() {
        let cli = Cli::try_parse_from(["mudscope", "component", "--category", "buttons"]).unwrap();
        match cli.command {
            Command::Component { name, category, .. } => {
                assert!(name.is_none());
                assert_eq!(category.as_deref(), Some("buttons"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_api_name_is_optional() {
        let cli = Cli::try_parse_from(["mudscope", "api"]).unwrap();
        assert!(matches!(cli.command, Command::Api { name: None, .. }));
    }

    #[test]
    fn test_source_override_drops_remote() {
        let cli = Cli::try_parse_from(["mudscope", "--source", "/tmp/mud", "index"]).unwrap();
        let mut config = Config::default();
        config.source.repository_url = Some("https://example.com/mud.git".into());
        cli.apply_overrides(&mut config);
        assert_eq!(config.source.root, PathBuf::from("/tmp/mud"));
        assert!(config.source.repository_url.is_none());
        assert!(!config.index.include_internal);
    }

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("short", 10), "short");
        assert_eq!(truncate_preview("a button with a long summary", 12), "a button…");
        assert_eq!(truncate_preview("abcdefghij", 4), "abcd…");
    }
}
