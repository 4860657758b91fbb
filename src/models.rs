//! Core data models for Mudscope
//!
//! These structures represent the normalized component metadata that the
//! indexer extracts from the library source tree and that the query engine
//! hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A documented UI component with its parameters, events, methods, and examples
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Component class name (e.g., "MudButton"), unique within a snapshot
    pub name: String,
    /// Declaring namespace (e.g., "MudBlazor")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// One-line summary from the `<summary>` doc comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description from the `<remarks>` doc comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resolved category name (always set after a successful build)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Base class name without generic arguments (e.g., "MudBaseButton")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub parameters: Vec<Parameter>,
    pub events: Vec<EventDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub examples: Vec<Example>,
    /// Names of components referenced from this component's documentation page
    pub related_components: Vec<String>,
    /// Page title from the documentation page header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_title: Option<String>,
    /// Page subtitle from the documentation page header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_subtitle: Option<String>,
    /// Ordered (heading, body) sections of the documentation page
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sections: Vec<DocSection>,
    /// Declaration file the record was extracted from (relative to the source root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Marked `[Obsolete]`
    #[serde(default)]
    pub deprecated: bool,
    /// Declared `internal` rather than `public`
    #[serde(default)]
    pub internal: bool,
}

impl ComponentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up a parameter by name (case-insensitive)
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// A component parameter (a property carrying the parameter marker)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Declared type as written in source (e.g., "Color", "RenderFragment?")
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: Option<String>,
    /// Initializer text (e.g., "Color.Default"), if any
    pub default_value: Option<String>,
    /// Annotated as editor-required
    pub is_required: bool,
    /// Supplied through a cascading value rather than an attribute
    pub is_cascading: bool,
    /// UI category tag from the `[Category]` attribute (e.g., "Appearance")
    pub ui_category: Option<String>,
}

/// An event-callback parameter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDescriptor {
    pub name: String,
    /// Generic argument of the callback; `None` for a payload-free event
    pub event_args_type: Option<String>,
    pub description: Option<String>,
}

/// A public method of a component
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub return_type: String,
    pub description: Option<String>,
    pub parameters: Vec<MethodParameter>,
    pub is_async: bool,
}

/// A single formal parameter of a method
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

/// A usage example extracted from a documentation example file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Example {
    /// File base name without extension (e.g., "ButtonFilledExample")
    pub name: String,
    pub description: Option<String>,
    /// Markup portion with non-content directives removed
    pub markup: String,
    /// Contents of the `@code { }` block, if any
    pub csharp_code: Option<String>,
    /// Example file path (relative to the source root)
    pub source_file: String,
    /// Demonstrated feature tags inferred from attribute usage
    pub features: Vec<String>,
}

/// A heading and body from a documentation page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocSection {
    pub heading: String,
    pub body: String,
    /// Example components rendered inside this section
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub examples: Vec<String>,
}

/// A named group of components
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Ordered, duplicate-free member component names
    pub components: Vec<String>,
}

/// Kind of a non-component (or component) type in the API reference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ApiTypeKind {
    Class,
    Interface,
    Enum,
    Struct,
    Record,
}

/// Kind of a member listed in an API reference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum ApiMemberKind {
    Property,
    Method,
}

/// A public member of a class or interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiMember {
    pub name: String,
    pub kind: ApiMemberKind,
    /// Property type or method return type
    #[serde(rename = "type")]
    pub type_name: String,
    pub summary: Option<String>,
}

/// A single enumeration value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    /// Explicit initializer (e.g., "4"), if any
    pub value: Option<String>,
    pub summary: Option<String>,
}

/// Type-level view of a declared class, interface, enum, struct, or record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiReference {
    pub name: String,
    pub kind: ApiTypeKind,
    pub namespace: Option<String>,
    pub summary: Option<String>,
    pub base_type: Option<String>,
    /// Public members (classes, interfaces, structs, records)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub members: Vec<ApiMember>,
    /// Declared values (enums)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub values: Vec<EnumValue>,
    pub source_file: Option<String>,
}

/// Lifecycle state of the index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// No snapshot has been published yet
    NotIndexed,
    /// A build is running (a previous snapshot may still be served)
    Building,
    /// A snapshot is published
    Indexed,
}

/// Summary statistics about the active snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_components: usize,
    pub total_categories: usize,
    pub total_parameters: usize,
    pub total_events: usize,
    pub total_methods: usize,
    pub total_examples: usize,
    pub total_api_references: usize,
    /// Snapshot generation (increments with each published build)
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub build_duration_ms: u64,
}
