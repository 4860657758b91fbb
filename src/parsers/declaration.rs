//! Declaration parser for component class sources
//!
//! Extracts from C# class files (`MudButton.razor.cs`) and Razor component
//! files with an `@code` block (`MudSpacer.razor`):
//! - The first visible top-level type: name, namespace, base type, doc summary/remarks
//! - Properties carrying `[Parameter]` / `[CascadingParameter]` as parameters
//! - `EventCallback` / `EventCallback<T>` parameters as events
//! - Public methods, minus lifecycle and disposal plumbing
//! - Every visible top-level type as an API reference (enums with their values)
//!
//! C# is parsed with tree-sitter. Namespaces and type declarations are
//! located with queries; members are read from each type's declaration
//! list, and `///` comments are the `comment` siblings just before a
//! declaration. Razor components are turned into an equivalent partial
//! class first. Sources that do not parse into a visible type yield `None`.

use anyhow::{Context, Result};
use bitflags::bitflags;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::models::{
    ApiMember, ApiMemberKind, ApiReference, ApiTypeKind, ComponentRecord, EnumValue,
    EventDescriptor, MethodDescriptor, MethodParameter, Parameter,
};
use crate::parsers::example::split_code_block;
use crate::parsers::rules::{lookup_marker, normalize_whitespace, split_top_level};
use crate::parsers::Extractor;

bitflags! {
    /// Attribute markers relevant to classification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Markers: u8 {
        const PARAMETER = 1 << 0;
        const CASCADING = 1 << 1;
        const REQUIRED = 1 << 2;
        const DEPRECATED = 1 << 3;
        const UI_CATEGORY = 1 << 4;
    }
}

/// Attribute name → marker role
const MARKER_RULES: &[(&str, Markers)] = &[
    ("Parameter", Markers::PARAMETER),
    ("CascadingParameter", Markers::CASCADING),
    ("EditorRequired", Markers::REQUIRED),
    ("Obsolete", Markers::DEPRECATED),
    ("Category", Markers::UI_CATEGORY),
];

/// Methods that are component plumbing rather than API
const EXCLUDED_METHODS: &[&str] = &[
    "OnInitialized",
    "OnInitializedAsync",
    "OnParametersSet",
    "OnParametersSetAsync",
    "OnAfterRender",
    "OnAfterRenderAsync",
    "SetParametersAsync",
    "ShouldRender",
    "BuildRenderTree",
    "StateHasChanged",
    "HandleEventAsync",
    "Dispose",
    "DisposeAsync",
    "DisposeAsyncCore",
    "ToString",
    "Equals",
    "GetHashCode",
];

const MODIFIERS: &[&str] = &[
    "public", "protected", "internal", "private", "static", "virtual", "override", "sealed",
    "abstract", "new", "required", "readonly", "extern", "unsafe", "async", "partial", "const",
    "volatile", "file", "ref",
];

const NAMESPACE_QUERY: &str = r#"
    (namespace_declaration
        name: (_) @name) @namespace

    (file_scoped_namespace_declaration
        name: (_) @name) @namespace
"#;

const TYPE_QUERY: &str = r#"
    (class_declaration name: (identifier) @name) @type
    (interface_declaration name: (identifier) @name) @type
    (struct_declaration name: (identifier) @name) @type
    (enum_declaration name: (identifier) @name) @type
    (record_declaration name: (identifier) @name) @type
"#;

const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "enum_declaration",
    "record_declaration",
    "record_struct_declaration",
];

static EVENT_CALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w.]+\.)?EventCallback(?:<(?P<arg>.+)>)?\??$").expect("valid regex")
});

static ASYNC_RETURN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w.]+\.)?(?:Task|ValueTask)(?:<.+>)?$").expect("valid regex")
});

static DOC_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(?P<tag>summary|remarks|returns|param)(?:\s+name="(?P<name>[^"]*)")?\s*>(?P<body>.*?)</(?:summary|remarks|returns|param)>"#)
        .expect("valid regex")
});

static DOC_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:see|seealso|paramref|typeparamref)\s+(?:cref|name|langword|href)="(?:[A-Z]:)?(?P<target>[^"]*)"\s*/>"#)
        .expect("valid regex")
});

static XML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex"));

static RAZOR_DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*@(?P<directive>inherits|namespace|typeparam)\s+(?P<value>[^\r\n]+?)\s*$")
        .expect("valid regex")
});

/// How a property participates in the component API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRole {
    Parameter,
    CascadingParameter,
    Event { args_type: Option<String> },
}

/// Classify a property by its markers and declared type.
///
/// Only properties with a parameter or cascading marker take part. An
/// event-callback type wins over the cascading marker.
pub fn classify_member(markers: Markers, type_name: &str) -> Option<MemberRole> {
    if !markers.intersects(Markers::PARAMETER | Markers::CASCADING) {
        return None;
    }
    if let Some(caps) = EVENT_CALLBACK_RE.captures(type_name) {
        return Some(MemberRole::Event {
            args_type: caps.name("arg").map(|m| m.as_str().trim().to_string()),
        });
    }
    if markers.contains(Markers::CASCADING) {
        Some(MemberRole::CascadingParameter)
    } else {
        Some(MemberRole::Parameter)
    }
}

/// Whether a return type belongs to the awaitable task family
pub fn is_async_return(type_name: &str) -> bool {
    ASYNC_RETURN_RE.is_match(type_name)
}

/// A parsed `[Name(args)]` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    name: String,
    args: Option<String>,
}

impl Attribute {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (name, args) = match text.find('(') {
            Some(open) => {
                let args = text[open + 1..].trim_end();
                let args = args.strip_suffix(')').unwrap_or(args);
                (&text[..open], Some(args.trim().to_string()))
            }
            None => (text, None),
        };
        // Drop target specifiers (`return:`) and namespace qualifiers
        let name = name.rsplit(':').next().unwrap_or(name).trim();
        let name = name.rsplit('.').next().unwrap_or(name);
        let name = name.strip_suffix("Attribute").unwrap_or(name);
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            args,
        })
    }
}

fn markers_of(attributes: &[Attribute]) -> Markers {
    attributes
        .iter()
        .filter_map(|a| lookup_marker(MARKER_RULES, &a.name))
        .fold(Markers::empty(), |acc, m| acc | m)
}

/// `[Category(CategoryTypes.Button.Appearance)]` → "Appearance"
fn ui_category_of(attributes: &[Attribute]) -> Option<String> {
    let args = attributes
        .iter()
        .find(|a| a.name == "Category")?
        .args
        .as_deref()?;
    let value = args.trim().trim_matches('"');
    let value = value.rsplit('.').next().unwrap_or(value).trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parsed `///` documentation block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DocComment {
    summary: Option<String>,
    remarks: Option<String>,
    returns: Option<String>,
    params: HashMap<String, String>,
}

impl DocComment {
    fn parse(lines: &[String]) -> Self {
        let mut doc = DocComment::default();
        if lines.is_empty() {
            return doc;
        }

        let xml = lines.join("\n");
        for caps in DOC_TAG_RE.captures_iter(&xml) {
            let Some(body) = clean_doc_text(&caps["body"]) else {
                continue;
            };
            match &caps["tag"] {
                "summary" => doc.summary = Some(body),
                "remarks" => doc.remarks = Some(body),
                "returns" => doc.returns = Some(body),
                "param" => {
                    if let Some(name) = caps.name("name") {
                        doc.params.insert(name.as_str().to_string(), body);
                    }
                }
                _ => {}
            }
        }

        // Plain `/// text` without XML tags counts as a summary
        if doc.summary.is_none() && !xml.contains('<') {
            doc.summary = clean_doc_text(&xml);
        }
        doc
    }
}

fn clean_doc_text(text: &str) -> Option<String> {
    let text = DOC_REF_RE.replace_all(text, "$target");
    let text = XML_TAG_RE.replace_all(&text, " ");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    let text = normalize_whitespace(&text);
    (!text.is_empty()).then_some(text)
}

/// Split leading `[...]` attribute lists off a parameter declaration
fn take_attributes(text: &str) -> (Vec<Attribute>, &str) {
    let mut attributes = Vec::new();
    let mut rest = text.trim_start();

    while rest.starts_with('[') {
        let mut depth = 0i32;
        let mut in_string = false;
        let mut end = None;
        for (index, ch) in rest.char_indices() {
            match ch {
                '"' => in_string = !in_string,
                '[' if !in_string => depth += 1,
                ']' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(index);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            break;
        };
        attributes.extend(split_top_level(&rest[1..end]).iter().filter_map(|a| Attribute::parse(a)));
        rest = rest[end + 1..].trim_start();
    }

    (attributes, rest)
}

/// `Foo.Bar<T>` → `Bar`
pub fn simple_type_name(type_name: &str) -> String {
    let without_generics = match type_name.find('<') {
        Some(index) => &type_name[..index],
        None => type_name,
    };
    let trimmed = without_generics.trim().trim_end_matches('?');
    trimmed.rsplit('.').next().unwrap_or(trimmed).to_string()
}

fn looks_like_interface(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some('I'), Some(c)) if c.is_ascii_uppercase())
}

/// Parse a formal parameter list (without the parentheses)
fn parse_method_parameters(text: &str, doc: &DocComment) -> Vec<MethodParameter> {
    split_top_level(text)
        .into_iter()
        .filter_map(|raw| {
            let (_, raw) = take_attributes(&raw);
            let (decl, default_value) = match raw.split_once('=') {
                Some((decl, value)) => (decl.trim(), Some(value.trim().to_string())),
                None => (raw.trim(), None),
            };
            let words: Vec<&str> = decl
                .split_whitespace()
                .filter(|w| !matches!(*w, "this" | "params" | "ref" | "out" | "in" | "scoped"))
                .collect();
            let (name, type_words) = words.split_last()?;
            if type_words.is_empty() {
                return None;
            }
            Some(MethodParameter {
                name: name.to_string(),
                type_name: type_words.join(" "),
                default_value,
                description: doc.params.get(*name).cloned(),
            })
        })
        .collect()
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Modifier keywords written on a declaration
fn modifiers_of<'a>(node: Node, source: &'a str) -> Vec<&'a str> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == "modifier" || MODIFIERS.contains(&child.kind()))
        .map(|child| node_text(child, source).trim())
        .collect()
}

/// Attributes from every `[...]` list written on a declaration
fn attributes_of(node: Node, source: &str) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    let mut cursor = node.walk();
    for list in node.children(&mut cursor).filter(|c| c.kind() == "attribute_list") {
        let mut list_cursor = list.walk();
        attributes.extend(
            list.named_children(&mut list_cursor)
                .filter(|c| c.kind() == "attribute")
                .filter_map(|c| Attribute::parse(node_text(c, source))),
        );
    }
    attributes
}

/// The `///` block directly above a declaration. Plain `//` comments and
/// preprocessor lines in between are skipped over.
fn doc_comment_of(node: Node, source: &str) -> DocComment {
    let mut lines = Vec::new();
    let mut previous = node.prev_sibling();
    while let Some(sibling) = previous {
        if sibling.kind() == "comment" {
            let text = node_text(sibling, source);
            if let Some(doc) = text.strip_prefix("///") {
                lines.push(doc.strip_prefix(' ').unwrap_or(doc).trim_end().to_string());
            }
        } else if !sibling.kind().starts_with("preproc") {
            break;
        }
        previous = sibling.prev_sibling();
    }
    lines.reverse();
    DocComment::parse(&lines)
}

fn field_or_kind<'tree>(node: Node<'tree>, field: &str, kind: &str) -> Option<Node<'tree>> {
    node.child_by_field_name(field).or_else(|| {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).find(|c| c.kind() == kind)
    })
}

fn is_nested(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if TYPE_KINDS.contains(&parent.kind()) {
            return true;
        }
        current = parent.parent();
    }
    false
}

fn type_kind(kind: &str) -> ApiTypeKind {
    match kind {
        "interface_declaration" => ApiTypeKind::Interface,
        "enum_declaration" => ApiTypeKind::Enum,
        "struct_declaration" => ApiTypeKind::Struct,
        "record_declaration" | "record_struct_declaration" => ApiTypeKind::Record,
        _ => ApiTypeKind::Class,
    }
}

/// First base class in a type's base list; interfaces only count for interfaces
fn base_type_of(node: Node, source: &str, kind: ApiTypeKind) -> Option<String> {
    let mut cursor = node.walk();
    let base_list = node.children(&mut cursor).find(|c| c.kind() == "base_list")?;
    let mut list_cursor = base_list.walk();
    let first = base_list.named_children(&mut list_cursor).next()?;

    // A record's primary constructor base carries its arguments
    let text = node_text(first, source);
    let text = text.split('(').next().unwrap_or(text);
    let name = simple_type_name(text);
    if name.is_empty() || (kind != ApiTypeKind::Interface && looks_like_interface(&name)) {
        return None;
    }
    Some(name)
}

/// Namespace spans found in one file
#[derive(Debug, Default)]
struct Namespaces {
    /// `namespace A { ... }` blocks as byte ranges
    blocks: Vec<(usize, usize, String)>,
    /// `namespace A;` applies to the whole file
    file_scoped: Option<String>,
}

impl Namespaces {
    fn enclosing(&self, node: Node) -> Option<String> {
        let start = node.start_byte();
        let mut blocks: Vec<&(usize, usize, String)> = self
            .blocks
            .iter()
            .filter(|(from, to, _)| *from <= start && start < *to)
            .collect();
        blocks.sort_by_key(|(from, _, _)| *from);

        let mut parts: Vec<&str> = self.file_scoped.iter().map(String::as_str).collect();
        parts.extend(blocks.iter().map(|(_, _, name)| name.as_str()));
        (!parts.is_empty()).then(|| parts.join("."))
    }
}

fn find_namespaces(source: &str, root: Node, language: &Language) -> Result<Namespaces> {
    let query = Query::new(language, NAMESPACE_QUERY).context("Failed to create namespace query")?;

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source.as_bytes());
    let mut namespaces = Namespaces::default();

    while let Some(match_) = matches.next() {
        let mut name = None;
        let mut namespace_node = None;
        for capture in match_.captures {
            let capture_name: &str = query.capture_names()[capture.index as usize];
            match capture_name {
                "name" => name = Some(normalize_whitespace(node_text(capture.node, source))),
                "namespace" => namespace_node = Some(capture.node),
                _ => {}
            }
        }

        if let (Some(name), Some(node)) = (name, namespace_node) {
            if node.kind() == "file_scoped_namespace_declaration" {
                namespaces.file_scoped = Some(name);
            } else {
                namespaces.blocks.push((node.start_byte(), node.end_byte(), name));
            }
        }
    }

    Ok(namespaces)
}

/// Top-level type declarations in source order
fn find_types<'tree>(source: &str, root: Node<'tree>, language: &Language) -> Result<Vec<Node<'tree>>> {
    let query = Query::new(language, TYPE_QUERY).context("Failed to create type query")?;

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source.as_bytes());
    let mut types = Vec::new();

    while let Some(match_) = matches.next() {
        for capture in match_.captures {
            let capture_name: &str = query.capture_names()[capture.index as usize];
            if capture_name == "type" && !is_nested(capture.node) {
                types.push(capture.node);
            }
        }
    }

    types.sort_by_key(|node| node.start_byte());
    types.dedup_by_key(|node| node.id());
    Ok(types)
}

/// Full parse result for one source file
#[derive(Debug, Clone)]
pub struct ParsedDeclaration {
    /// Kind of the primary (first visible top-level) type
    pub kind: ApiTypeKind,
    pub is_static: bool,
    /// Primary type as a partial component record
    pub record: ComponentRecord,
    /// Every visible top-level type, primary included
    pub api_types: Vec<ApiReference>,
}

struct TypeBuilder {
    kind: ApiTypeKind,
    name: String,
    namespace: Option<String>,
    base_type: Option<String>,
    doc: DocComment,
    is_public: bool,
    is_static: bool,
    deprecated: bool,
    parameters: Vec<Parameter>,
    events: Vec<EventDescriptor>,
    methods: Vec<MethodDescriptor>,
    members: Vec<ApiMember>,
    values: Vec<EnumValue>,
}

impl TypeBuilder {
    fn add_property(
        &mut self,
        name: &str,
        type_name: &str,
        default_value: Option<String>,
        is_public: bool,
        attributes: &[Attribute],
        doc: &DocComment,
    ) {
        let markers = markers_of(attributes);
        let description = doc.summary.clone();

        if is_public {
            self.members.push(ApiMember {
                name: name.to_string(),
                kind: ApiMemberKind::Property,
                type_name: type_name.to_string(),
                summary: description.clone(),
            });
        }

        // Parameters may be non-public (cascading parameters often are)
        match classify_member(markers, type_name) {
            Some(MemberRole::Event { args_type }) => {
                if self.events.iter().any(|e| e.name == name) {
                    return;
                }
                self.events.push(EventDescriptor {
                    name: name.to_string(),
                    event_args_type: args_type,
                    description,
                });
            }
            Some(role) => {
                if self.parameters.iter().any(|p| p.name == name) {
                    return;
                }
                self.parameters.push(Parameter {
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                    description,
                    default_value,
                    is_required: markers.contains(Markers::REQUIRED),
                    is_cascading: role == MemberRole::CascadingParameter
                        || markers.contains(Markers::CASCADING),
                    ui_category: ui_category_of(attributes),
                });
            }
            None => {}
        }
    }

    fn add_method(&mut self, name: &str, return_type: &str, params: &str, doc: &DocComment) {
        if EXCLUDED_METHODS.contains(&name) {
            return;
        }

        let parameters = parse_method_parameters(params, doc);
        let duplicate = self.methods.iter().any(|m| {
            m.name == name
                && m.parameters.len() == parameters.len()
                && m.parameters
                    .iter()
                    .zip(&parameters)
                    .all(|(a, b)| a.type_name == b.type_name)
        });
        if duplicate {
            return;
        }

        self.members.push(ApiMember {
            name: name.to_string(),
            kind: ApiMemberKind::Method,
            type_name: return_type.to_string(),
            summary: doc.summary.clone(),
        });
        self.methods.push(MethodDescriptor {
            name: name.to_string(),
            return_type: return_type.to_string(),
            description: doc.summary.clone(),
            parameters,
            is_async: is_async_return(return_type),
        });
    }

    /// Interface members are public unless marked otherwise
    fn member_visible(&self, mods: &[&str]) -> bool {
        mods.contains(&"public") || (self.kind == ApiTypeKind::Interface && !mods.contains(&"private"))
    }

    /// Read properties and methods from a class-like body
    fn read_members(&mut self, body: Node, source: &str) {

        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "property_declaration" => {
                    let (Some(type_node), Some(name_node)) =
                        (member.child_by_field_name("type"), member.child_by_field_name("name"))
                    else {
                        continue;
                    };
                    let mods = modifiers_of(member, source);
                    let type_name = normalize_whitespace(node_text(type_node, source));
                    self.add_property(
                        node_text(name_node, source),
                        &type_name,
                        property_default(member, source),
                        self.member_visible(&mods),
                        &attributes_of(member, source),
                        &doc_comment_of(member, source),
                    );
                }
                "method_declaration" => {
                    let mods = modifiers_of(member, source);
                    if !self.member_visible(&mods) {
                        continue;
                    }
                    let Some(name_node) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let Some(return_node) = member
                        .child_by_field_name("returns")
                        .or_else(|| member.child_by_field_name("type"))
                    else {
                        continue;
                    };
                    let params = field_or_kind(member, "parameters", "parameter_list")
                        .map(|list| node_text(list, source))
                        .unwrap_or("()");
                    let params = params.trim();
                    let params = params.strip_prefix('(').unwrap_or(params);
                    let params = params.strip_suffix(')').unwrap_or(params);
                    self.add_method(
                        node_text(name_node, source),
                        &normalize_whitespace(node_text(return_node, source)),
                        params,
                        &doc_comment_of(member, source),
                    );
                }
                _ => {}
            }
        }
    }

    /// Read the members of an enum body
    fn read_enum_values(&mut self, body: Node, source: &str) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "enum_member_declaration" {
                continue;
            }
            // `[Description("x")] Name = 1` without its attributes
            let (_, text) = take_attributes(node_text(member, source));
            let (name, value) = match text.split_once('=') {
                Some((name, value)) => (name.trim(), Some(normalize_whitespace(value))),
                None => (text.trim(), None),
            };
            let name = match member.child_by_field_name("name") {
                Some(node) => node_text(node, source).to_string(),
                None => name.to_string(),
            };
            if name.is_empty() || self.values.iter().any(|v| v.name == name) {
                continue;
            }
            let value = member
                .child_by_field_name("value")
                .map(|node| normalize_whitespace(node_text(node, source)))
                .or(value)
                .filter(|value| !value.is_empty());
            self.values.push(EnumValue {
                name,
                value,
                summary: doc_comment_of(member, source).summary,
            });
        }
    }

    fn api_reference(&self, source_file: &str) -> ApiReference {
        ApiReference {
            name: self.name.clone(),
            kind: self.kind,
            namespace: self.namespace.clone(),
            summary: self.doc.summary.clone(),
            base_type: self.base_type.clone(),
            members: self.members.clone(),
            values: self.values.clone(),
            source_file: Some(source_file.to_string()),
        }
    }

    fn record(&self, source_file: &str) -> ComponentRecord {
        ComponentRecord {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            summary: self.doc.summary.clone(),
            description: self.doc.remarks.clone(),
            base_type: self.base_type.clone(),
            parameters: self.parameters.clone(),
            events: self.events.clone(),
            methods: self.methods.clone(),
            source_file: Some(source_file.to_string()),
            deprecated: self.deprecated,
            internal: !self.is_public,
            ..Default::default()
        }
    }
}

/// `{ get; set; } = Color.Default;` → `Color.Default`
fn property_default(property: Node, source: &str) -> Option<String> {
    let mut cursor = property.walk();
    let accessors = property
        .children(&mut cursor)
        .find(|c| c.kind() == "accessor_list")?;
    let tail = source.get(accessors.end_byte()..property.end_byte())?;
    let value = tail.trim().strip_prefix('=')?.trim();
    let value = value.strip_suffix(';').unwrap_or(value).trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Extracts component declarations from C# and Razor sources
#[derive(Debug, Clone, Default)]
pub struct DeclarationParser {
    include_internal: bool,
}

impl Extractor for DeclarationParser {
    type Output = ParsedDeclaration;

    fn extract(&self, path: &Path, source: &str) -> Option<ParsedDeclaration> {
        self.parse(&path.to_string_lossy(), source)
    }
}

impl DeclarationParser {
    pub fn new(include_internal: bool) -> Self {
        Self { include_internal }
    }

    /// Parse a source file, dispatching on its extension.
    ///
    /// Returns `None` when the file declares no visible type.
    pub fn parse(&self, path: &str, source: &str) -> Option<ParsedDeclaration> {
        if path.ends_with(".razor") {
            self.parse_razor(path, source)
        } else {
            self.parse_csharp(path, source)
        }
    }

    /// Parse a Razor component: the file stem names the class, `@inherits`
    /// names the base, and the `@code` block holds the members.
    pub fn parse_razor(&self, path: &str, source: &str) -> Option<ParsedDeclaration> {
        let stem = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".razor"))?;
        if stem.is_empty() || !stem.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }

        let mut inherits = None;
        let mut namespace = None;
        for caps in RAZOR_DIRECTIVE_RE.captures_iter(source) {
            let value = caps["value"].trim().to_string();
            match &caps["directive"] {
                "inherits" => inherits = Some(value),
                "namespace" => namespace = Some(value),
                _ => {}
            }
        }

        let (_, code) = split_code_block(source);
        let mut synthetic = String::new();
        if let Some(ns) = namespace {
            synthetic.push_str(&format!("namespace {};\n", ns));
        }
        match inherits {
            Some(base) => synthetic.push_str(&format!("public partial class {} : {}\n{{\n", stem, base)),
            None => synthetic.push_str(&format!("public partial class {}\n{{\n", stem)),
        }
        if let Some(code) = code {
            synthetic.push_str(&code);
            synthetic.push('\n');
        }
        synthetic.push_str("}\n");

        self.parse_csharp(path, &synthetic)
    }

    /// Parse C# source text
    pub fn parse_csharp(&self, path: &str, source: &str) -> Option<ParsedDeclaration> {
        match self.parse_tree(path, source) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Failed to parse {}: {:#}", path, e);
                None
            }
        }
    }

    fn parse_tree(&self, path: &str, source: &str) -> Result<Option<ParsedDeclaration>> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_c_sharp::LANGUAGE.into();

        parser
            .set_language(&language)
            .context("Failed to set C# language")?;

        let tree = parser
            .parse(source, None)
            .context("Failed to parse C# source")?;

        let root_node = tree.root_node();
        if root_node.has_error() {
            log::debug!("Syntax errors in {}, reading what parsed", path);
        }

        let namespaces = find_namespaces(source, root_node, &language)?;
        let mut types: Vec<TypeBuilder> = Vec::new();

        for node in find_types(source, root_node, &language)? {
            let mods = modifiers_of(node, source);
            let is_public = mods.contains(&"public");
            if !(is_public || (self.include_internal && !mods.contains(&"private"))) {
                continue;
            }
            let Some(name_node) = node.child_by_field_name("name") else {
                continue;
            };

            let kind = type_kind(node.kind());
            let mut builder = TypeBuilder {
                kind,
                name: node_text(name_node, source).to_string(),
                namespace: namespaces.enclosing(node),
                base_type: if kind == ApiTypeKind::Enum {
                    None
                } else {
                    base_type_of(node, source, kind)
                },
                doc: doc_comment_of(node, source),
                is_public,
                is_static: mods.contains(&"static"),
                deprecated: markers_of(&attributes_of(node, source)).contains(Markers::DEPRECATED),
                parameters: Vec::new(),
                events: Vec::new(),
                methods: Vec::new(),
                members: Vec::new(),
                values: Vec::new(),
            };

            if kind == ApiTypeKind::Enum {
                if let Some(body) = field_or_kind(node, "body", "enum_member_declaration_list") {
                    builder.read_enum_values(body, source);
                }
            } else if let Some(body) = field_or_kind(node, "body", "declaration_list") {
                builder.read_members(body, source);
            }
            types.push(builder);
        }

        let Some(primary) = types.first() else {
            return Ok(None);
        };
        let api_types = types.iter().map(|t| t.api_reference(path)).collect();

        Ok(Some(ParsedDeclaration {
            kind: primary.kind,
            is_static: primary.is_static,
            record: primary.record(path),
            api_types,
        }))
    }
}
