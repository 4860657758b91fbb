//! Immutable index snapshot
//!
//! A snapshot is the complete result of one build: components in index
//! order, categories, API references and the lookup tables over them. It is
//! never mutated after construction; a rebuild produces a new snapshot that
//! replaces the old one wholesale.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::models::{ApiReference, Category, ComponentRecord, IndexStats};

bitflags! {
    /// Fields a search query is matched against
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SearchFields: u8 {
        const NAME = 1 << 0;
        const DESCRIPTION = 1 << 1;
        const PARAMETERS = 1 << 2;
        const EXAMPLES = 1 << 3;
        const ALL = Self::NAME.bits()
            | Self::DESCRIPTION.bits()
            | Self::PARAMETERS.bits()
            | Self::EXAMPLES.bits();
    }
}

impl Default for SearchFields {
    fn default() -> Self {
        SearchFields::ALL
    }
}

impl FromStr for SearchFields {
    type Err = String;

    /// Parse a comma-separated selector such as `name,parameters` or `all`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = SearchFields::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            fields |= match part.to_ascii_lowercase().as_str() {
                "name" | "names" => SearchFields::NAME,
                "description" | "descriptions" => SearchFields::DESCRIPTION,
                "parameter" | "parameters" => SearchFields::PARAMETERS,
                "example" | "examples" => SearchFields::EXAMPLES,
                "all" => SearchFields::ALL,
                other => {
                    return Err(format!(
                        "unknown field '{}' (expected name, description, parameters, examples or all)",
                        other
                    ));
                }
            };
        }
        if fields.is_empty() {
            return Err("no fields selected".to_string());
        }
        Ok(fields)
    }
}

/// How two components are related
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum RelationshipKind {
    #[strum(serialize = "parent")]
    Parent,
    #[strum(to_string = "child", serialize = "children")]
    Child,
    #[strum(to_string = "sibling", serialize = "siblings")]
    Sibling,
    #[strum(
        to_string = "commonly_used_with",
        serialize = "commonlyusedwith",
        serialize = "commonly-used-with",
        serialize = "related"
    )]
    CommonlyUsedWith,
    #[strum(serialize = "all")]
    All,
}

/// One complete, immutable build result
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    components: Vec<ComponentRecord>,
    by_name: HashMap<String, usize>,
    categories: Vec<Category>,
    by_category: HashMap<String, usize>,
    api_references: Vec<ApiReference>,
    by_api_name: HashMap<String, usize>,
    prefix: String,
    generation: u64,
    built_at: DateTime<Utc>,
    build_duration: Duration,
}

impl IndexSnapshot {
    /// Assemble a snapshot. Lookup tables are keyed by lowercase name; on a
    /// duplicate name the first entry wins.
    pub fn new(
        components: Vec<ComponentRecord>,
        categories: Vec<Category>,
        api_references: Vec<ApiReference>,
        prefix: impl Into<String>,
        build_duration: Duration,
    ) -> Self {
        let index_of = |names: Vec<String>| {
            let mut map = HashMap::with_capacity(names.len());
            for (i, name) in names.into_iter().enumerate() {
                map.entry(name.to_lowercase()).or_insert(i);
            }
            map
        };

        let by_name = index_of(components.iter().map(|c| c.name.clone()).collect());
        let by_category = index_of(categories.iter().map(|c| c.name.clone()).collect());
        let by_api_name = index_of(api_references.iter().map(|a| a.name.clone()).collect());

        Self {
            components,
            by_name,
            categories,
            by_category,
            api_references,
            by_api_name,
            prefix: prefix.into(),
            generation: 0,
            built_at: Utc::now(),
            build_duration,
        }
    }

    /// Stamp the publication generation
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn components(&self) -> &[ComponentRecord] {
        &self.components
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn api_references(&self) -> &[ApiReference] {
        &self.api_references
    }

    /// Find a component by full name or by display name without the prefix.
    ///
    /// Matching is case-insensitive and ignores a namespace and a generic
    /// suffix, so `button`, `MudButton`, `MudSelect<T>` and
    /// `MudBlazor.MudSelect` all resolve.
    pub fn resolve(&self, name: &str) -> Option<&ComponentRecord> {
        let name = strip_generics(name.trim());
        let name = name.rsplit('.').next().unwrap_or(name).trim().to_lowercase();
        if name.is_empty() {
            return None;
        }

        let prefixed = format!("{}{}", self.prefix.to_lowercase(), name);
        self.by_name
            .get(&name)
            .or_else(|| self.by_name.get(&prefixed))
            .map(|&i| &self.components[i])
    }

    fn exact(&self, name: &str) -> Option<&ComponentRecord> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&i| &self.components[i])
    }

    /// Components matching `query` (case-insensitive substring) in any of
    /// `fields`, in index order, at most `max_results`.
    pub fn search(&self, query: &str, fields: SearchFields, max_results: usize) -> Vec<&ComponentRecord> {
        let needle = query.trim().to_lowercase();
        self.components
            .iter()
            .filter(|c| matches_query(c, &needle, fields))
            .take(max_results)
            .collect()
    }

    /// Category by name, case-insensitive
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.by_category
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.categories[i])
    }

    /// Members of a category; empty for an unknown category
    pub fn components_in_category(&self, name: &str) -> Vec<&ComponentRecord> {
        self.category(name)
            .map(|category| {
                category
                    .components
                    .iter()
                    .filter_map(|member| self.exact(member))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Components related to `component` by `kind`.
    ///
    /// Parent and child relations come from base types, siblings share the
    /// category, and commonly-used-with comes from documentation links. A
    /// name placed as parent or child is never listed again as a sibling or
    /// commonly-used-with, and siblings are not repeated as commonly-used-with.
    pub fn related(&self, component: &ComponentRecord, kind: RelationshipKind) -> Vec<&ComponentRecord> {
        let parent: Vec<&ComponentRecord> = component
            .base_type
            .as_deref()
            .and_then(|base| self.exact(base))
            .filter(|p| p.name != component.name)
            .into_iter()
            .collect();
        if kind == RelationshipKind::Parent {
            return parent;
        }

        let children: Vec<&ComponentRecord> = self
            .components
            .iter()
            .filter(|c| c.name != component.name)
            .filter(|c| {
                c.base_type
                    .as_deref()
                    .is_some_and(|base| base.eq_ignore_ascii_case(&component.name))
            })
            .collect();
        if kind == RelationshipKind::Child {
            return children;
        }

        let mut placed: HashSet<&str> = HashSet::new();
        placed.insert(component.name.as_str());
        placed.extend(parent.iter().map(|c| c.name.as_str()));
        placed.extend(children.iter().map(|c| c.name.as_str()));

        let siblings: Vec<&ComponentRecord> = component
            .category
            .as_deref()
            .map(|category| self.components_in_category(category))
            .unwrap_or_default()
            .into_iter()
            .filter(|c| !placed.contains(c.name.as_str()))
            .collect();
        if kind == RelationshipKind::Sibling {
            return siblings;
        }

        placed.extend(siblings.iter().map(|c| c.name.as_str()));
        let mut commonly_used: Vec<&ComponentRecord> = Vec::new();
        for name in &component.related_components {
            if let Some(related) = self.resolve(name) {
                if placed.insert(related.name.as_str()) {
                    commonly_used.push(related);
                }
            }
        }
        if kind == RelationshipKind::CommonlyUsedWith {
            return commonly_used;
        }

        // The four sets are disjoint by construction
        parent
            .into_iter()
            .chain(children)
            .chain(siblings)
            .chain(commonly_used)
            .collect()
    }

    /// API reference by simple, qualified or generic name
    pub fn api_reference(&self, name: &str) -> Option<&ApiReference> {
        let simple = strip_generics(name.trim());
        let simple = simple.rsplit('.').next().unwrap_or(simple).to_lowercase();
        self.by_api_name
            .get(&simple)
            .map(|&i| &self.api_references[i])
    }

    pub fn stats(&self) -> IndexStats {
        let count = |f: fn(&ComponentRecord) -> usize| self.components.iter().map(f).sum::<usize>();
        IndexStats {
            total_components: self.components.len(),
            total_categories: self.categories.len(),
            total_parameters: count(|c| c.parameters.len()),
            total_events: count(|c| c.events.len()),
            total_methods: count(|c| c.methods.len()),
            total_examples: count(|c| c.examples.len()),
            total_api_references: self.api_references.len(),
            generation: self.generation,
            built_at: self.built_at,
            build_duration_ms: self.build_duration.as_millis() as u64,
        }
    }
}

/// `MudSelect<T>` → `MudSelect`
fn strip_generics(name: &str) -> &str {
    match name.find('<') {
        Some(index) => name[..index].trim_end(),
        None => name,
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn contains_opt(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| contains(h, needle))
}

fn matches_query(component: &ComponentRecord, needle: &str, fields: SearchFields) -> bool {
    if fields.contains(SearchFields::NAME) && contains(&component.name, needle) {
        return true;
    }
    if fields.contains(SearchFields::DESCRIPTION)
        && (contains_opt(component.summary.as_deref(), needle)
            || contains_opt(component.description.as_deref(), needle))
    {
        return true;
    }
    if fields.contains(SearchFields::PARAMETERS)
        && component.parameters.iter().any(|p| {
            contains(&p.name, needle) || contains_opt(p.description.as_deref(), needle)
        })
    {
        return true;
    }
    if fields.contains(SearchFields::EXAMPLES)
        && component.examples.iter().any(|e| {
            contains(&e.name, needle)
                || contains_opt(e.description.as_deref(), needle)
                || contains(&e.markup, needle)
                || contains_opt(e.csharp_code.as_deref(), needle)
        })
    {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Example, Parameter};

    fn component(name: &str, base: Option<&str>, category: &str) -> ComponentRecord {
        ComponentRecord {
            base_type: base.map(str::to_string),
            category: Some(category.to_string()),
            ..ComponentRecord::new(name)
        }
    }

    fn category(name: &str, members: &[&str]) -> Category {
        Category {
            name: name.to_string(),
            title: None,
            description: None,
            components: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn snapshot() -> IndexSnapshot {
        let mut button = component("MudButton", Some("MudBaseButton"), "Buttons");
        button.summary = Some("A clickable button.".into());
        button.related_components = vec!["icon".into(), "MudFab".into(), "MudButton".into()];
        button.parameters.push(Parameter {
            name: "Variant".into(),
            type_name: "Variant".into(),
            description: Some("The display variant.".into()),
            ..Default::default()
        });

        let mut text_field = component("MudTextField", Some("MudDebouncedInput"), "Form Inputs & Controls");
        text_field.examples.push(Example {
            name: "TextFieldBasicExample".into(),
            markup: "<MudTextField Label=\"Standard\" />".into(),
            source_file: "x".into(),
            ..Default::default()
        });

        let components = vec![
            component("MudBaseButton", Some("MudComponentBase"), "Buttons"),
            button,
            component("MudIconButton", Some("MudBaseButton"), "Buttons"),
            component("MudFab", Some("MudBaseButton"), "Buttons"),
            component("MudToggleIconButton", Some("MudComponentBase"), "Buttons"),
            text_field,
            component("MudIcon", Some("MudComponentBase"), "Utilities"),
        ];
        let categories = vec![
            category(
                "Buttons",
                &["MudBaseButton", "MudButton", "MudIconButton", "MudFab", "MudToggleIconButton"],
            ),
            category("Form Inputs & Controls", &["MudTextField"]),
            category("Utilities", &["MudIcon"]),
            category("Charts", &[]),
        ];
        IndexSnapshot::new(components, categories, Vec::new(), "Mud", Duration::from_millis(5))
    }

    fn names(records: &[&ComponentRecord]) -> Vec<String> {
        records.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_resolve_display_names() {
        let snap = snapshot();
        assert_eq!(snap.resolve("button").unwrap().name, "MudButton");
        assert_eq!(snap.resolve("MUDBUTTON").unwrap().name, "MudButton");
        assert_eq!(snap.resolve("TextField<T>").unwrap().name, "MudTextField");
        assert_eq!(snap.resolve("MudBlazor.MudButton").unwrap().name, "MudButton");
        assert_eq!(
            snap.resolve("MudBlazor.MudTextField<System.String>").unwrap().name,
            "MudTextField"
        );
        assert!(snap.resolve("MudBlazor.").is_none());
        assert!(snap.resolve("Nope").is_none());
        assert!(snap.resolve("  ").is_none());
    }

    #[test]
    fn test_search_fields() {
        let snap = snapshot();
        assert_eq!(names(&snap.search("button", SearchFields::NAME, 10)).len(), 4);
        assert_eq!(
            names(&snap.search("clickable", SearchFields::NAME, 10)),
            Vec::<String>::new()
        );
        assert_eq!(
            names(&snap.search("CLICKABLE", SearchFields::DESCRIPTION, 10)),
            vec!["MudButton"]
        );
        assert_eq!(
            names(&snap.search("display variant", SearchFields::PARAMETERS, 10)),
            vec!["MudButton"]
        );
        assert_eq!(
            names(&snap.search("standard", SearchFields::EXAMPLES, 10)),
            vec!["MudTextField"]
        );
        assert_eq!(snap.search("mud", SearchFields::ALL, 3).len(), 3);
    }

    #[test]
    fn test_search_is_idempotent() {
        let snap = snapshot();
        let first = names(&snap.search("icon", SearchFields::ALL, 50));
        let second = names(&snap.search("icon", SearchFields::ALL, 50));
        assert_eq!(first, second);
    }

    #[test]
    fn test_components_in_category() {
        let snap = snapshot();
        assert_eq!(snap.components_in_category("buttons").len(), 5);
        assert!(snap.components_in_category("Charts").is_empty());
        assert!(snap.components_in_category("Nonexistent").is_empty());
        assert!(snap.category("Charts").is_some());
        assert!(snap.category("Nonexistent").is_none());
    }

    #[test]
    fn test_parent_and_children_are_consistent() {
        let snap = snapshot();
        let base = snap.resolve("MudBaseButton").unwrap();
        let children = snap.related(base, RelationshipKind::Child);
        assert_eq!(names(&children), vec!["MudButton", "MudIconButton", "MudFab"]);

        for child in children {
            let parent = snap.related(child, RelationshipKind::Parent);
            assert_eq!(names(&parent), vec!["MudBaseButton"]);
        }
    }

    #[test]
    fn test_siblings_exclude_parent_and_children() {
        let snap = snapshot();
        let button = snap.resolve("MudButton").unwrap();
        let siblings = snap.related(button, RelationshipKind::Sibling);
        assert_eq!(names(&siblings), vec!["MudIconButton", "MudFab", "MudToggleIconButton"]);

        let base = snap.resolve("MudBaseButton").unwrap();
        let siblings = snap.related(base, RelationshipKind::Sibling);
        assert_eq!(names(&siblings), vec!["MudToggleIconButton"]);
    }

    #[test]
    fn test_commonly_used_with_excludes_earlier_sets() {
        let snap = snapshot();
        let button = snap.resolve("MudButton").unwrap();
        let related = snap.related(button, RelationshipKind::CommonlyUsedWith);
        // MudFab is a sibling and MudButton is itself
        assert_eq!(names(&related), vec!["MudIcon"]);
    }

    #[test]
    fn test_all_is_deduplicated_union() {
        let snap = snapshot();
        let button = snap.resolve("MudButton").unwrap();
        let all = names(&snap.related(button, RelationshipKind::All));
        assert_eq!(
            all,
            vec!["MudBaseButton", "MudIconButton", "MudFab", "MudToggleIconButton", "MudIcon"]
        );
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_search_fields_from_str() {
        assert_eq!("all".parse::<SearchFields>().unwrap(), SearchFields::ALL);
        assert_eq!(
            "Name, parameters".parse::<SearchFields>().unwrap(),
            SearchFields::NAME | SearchFields::PARAMETERS
        );
        assert!("colour".parse::<SearchFields>().is_err());
        assert!("".parse::<SearchFields>().is_err());
    }

    #[test]
    fn test_relationship_kind_from_str() {
        assert_eq!("Parent".parse::<RelationshipKind>().unwrap(), RelationshipKind::Parent);
        assert_eq!("children".parse::<RelationshipKind>().unwrap(), RelationshipKind::Child);
        assert_eq!(
            "CommonlyUsedWith".parse::<RelationshipKind>().unwrap(),
            RelationshipKind::CommonlyUsedWith
        );
        assert!("cousin".parse::<RelationshipKind>().is_err());
    }

    #[test]
    fn test_stats() {
        let stats = snapshot().with_generation(3).stats();
        assert_eq!(stats.total_components, 7);
        assert_eq!(stats.total_categories, 4);
        assert_eq!(stats.total_parameters, 1);
        assert_eq!(stats.total_examples, 1);
        assert_eq!(stats.generation, 3);
        assert_eq!(stats.build_duration_ms, 5);
    }
}
