//! Corpus-based tests over a small copy of the library layout
//!
//! These exercise the whole pipeline: declarations, documentation pages,
//! examples, categories and relationship derivation.

mod test_helpers;

use mudscope::{ApiReference, IndexError, RelationshipKind, SearchFields};
use mudscope::models::ApiTypeKind;
use test_helpers::*;

#[tokio::test]
async fn test_corpus_components() {
    let engine = corpus_engine().await;
    assert_eq!(
        engine.list_components(None).unwrap(),
        vec![
            "MudBaseButton",
            "MudBaseInput",
            "MudButton",
            "MudCard",
            "MudIconButton",
            "MudTextField",
        ]
    );
}

#[tokio::test]
async fn test_static_helpers_are_not_components() {
    let engine = corpus_engine().await;
    assert!(engine.component("ButtonDefaults").unwrap().is_none());
    assert!(engine.api_reference("ButtonDefaults").unwrap().is_some());
}

#[tokio::test]
async fn test_declaration_fields() {
    let engine = corpus_engine().await;
    let button = component(&engine, "MudButton");

    assert_eq!(button.namespace.as_deref(), Some("MudBlazor"));
    assert_eq!(button.base_type.as_deref(), Some("MudBaseButton"));
    assert_eq!(
        button.summary.as_deref(),
        Some("A Material Design button for triggering actions.")
    );

    let params: Vec<&str> = button.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["Color", "Variant", "Label"]);

    let color = button.parameter("Color").unwrap();
    assert_eq!(color.default_value.as_deref(), Some("Color.Default"));
    assert_eq!(color.ui_category.as_deref(), Some("Appearance"));
    assert!(button.parameter("Label").unwrap().is_required);

    // Lifecycle overrides are not API
    assert!(button.methods.iter().all(|m| m.name != "OnInitialized"));
}

#[tokio::test]
async fn test_partial_classes_are_merged() {
    let engine = corpus_engine().await;
    let icon = component(&engine, "MudIconButton");

    assert_eq!(icon.parameters.len(), 1);
    assert_eq!(icon.parameters[0].name, "Icon");
    assert_eq!(icon.events.len(), 1);
    assert_eq!(icon.events[0].name, "PressedChanged");
    assert_eq!(icon.events[0].event_args_type.as_deref(), Some("bool"));
}

#[tokio::test]
async fn test_block_namespace_and_expression_bodied_method() {
    let engine = corpus_engine().await;
    let base = component(&engine, "MudBaseButton");

    assert_eq!(base.namespace.as_deref(), Some("MudBlazor"));
    assert_eq!(base.events.len(), 1);
    assert_eq!(base.events[0].event_args_type.as_deref(), Some("MouseEventArgs"));

    let focus = base.methods.iter().find(|m| m.name == "FocusAsync").unwrap();
    assert_eq!(focus.return_type, "ValueTask");
    assert!(focus.is_async);
}

#[tokio::test]
async fn test_generic_component_methods() {
    let engine = corpus_engine().await;
    let field = component(&engine, "MudTextField<T>");

    assert_eq!(field.name, "MudTextField");
    assert_eq!(field.base_type.as_deref(), Some("MudBaseInput"));

    let select = field.methods.iter().find(|m| m.name == "SelectRangeAsync").unwrap();
    assert!(select.is_async);
    assert_eq!(select.parameters.len(), 2);
    assert_eq!(select.parameters[0].name, "start");
    assert_eq!(
        select.parameters[0].description.as_deref(),
        Some("First character to select.")
    );
    assert_eq!(select.parameters[1].default_value.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_razor_component() {
    let engine = corpus_engine().await;
    let card = component(&engine, "Card");

    assert_eq!(card.name, "MudCard");
    assert_eq!(card.base_type.as_deref(), Some("MudComponentBase"));
    let elevation = card.parameter("Elevation").unwrap();
    assert_eq!(elevation.type_name, "int");
    assert_eq!(elevation.default_value.as_deref(), Some("1"));
    assert!(card.parameter("ChildContent").is_some());
}

#[tokio::test]
async fn test_docs_page_fields() {
    let engine = corpus_engine().await;
    let button = component(&engine, "Button");

    assert_eq!(button.doc_title.as_deref(), Some("Button"));
    assert_eq!(
        button.doc_subtitle.as_deref(),
        Some("Buttons trigger actions with a single tap.")
    );
    let headings: Vec<&str> = button.sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["Filled Buttons", "Disabled"]);
    assert_eq!(button.related_components, vec!["MudIconButton", "MudCard"]);

    // Header description stands in for a missing subtitle
    let field = component(&engine, "TextField");
    assert_eq!(field.doc_title.as_deref(), Some("Text Field"));
    assert_eq!(
        field.doc_subtitle.as_deref(),
        Some("Text fields let users enter and edit text.")
    );
}

#[tokio::test]
async fn test_examples_attached() {
    let engine = corpus_engine().await;
    let button = component(&engine, "MudButton");

    let names: Vec<&str> = button.examples.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ButtonDisabledExample", "ButtonFilledExample"]);

    let disabled = &button.examples[0];
    assert!(disabled.features.contains(&"disabled".to_string()));
    assert!(disabled.features.contains(&"events".to_string()));
    assert!(disabled.csharp_code.as_deref().unwrap().contains("_count++"));
    assert!(!disabled.markup.contains("@code"));

    let filled = &button.examples[1];
    assert_eq!(
        filled.description.as_deref(),
        Some("Filled buttons draw the most attention.")
    );
    assert!(filled.features.contains(&"color".to_string()));
    assert!(filled.features.contains(&"variant".to_string()));
    assert!(!filled.markup.contains("@namespace"));
    assert!(!filled.markup.contains("@using"));
    assert!(filled.csharp_code.is_none());

    let field = component(&engine, "MudTextField");
    assert_eq!(field.examples.len(), 1);
    assert!(field.examples[0].features.contains(&"binding".to_string()));
}

#[tokio::test]
async fn test_every_component_has_a_listed_category() {
    let engine = corpus_engine().await;
    let categories = engine.categories().unwrap();

    for name in engine.list_components(None).unwrap() {
        let record = component(&engine, &name);
        let category = record
            .category
            .unwrap_or_else(|| panic!("{} has no category", name));
        let owner = categories
            .iter()
            .find(|c| c.name == category)
            .unwrap_or_else(|| panic!("{} is not a listed category", category));
        assert!(owner.components.contains(&name));
    }

    assert_eq!(component(&engine, "MudButton").category.as_deref(), Some("Buttons"));
    assert_eq!(component(&engine, "MudCard").category.as_deref(), Some("Layout"));
    assert_eq!(
        component(&engine, "MudTextField").category.as_deref(),
        Some("Form Inputs & Controls")
    );
}

#[tokio::test]
async fn test_unknown_category_is_empty() {
    let engine = corpus_engine().await;

    let members = engine.components_in_category("Spaceships").unwrap();
    assert!(members.is_empty());
    assert!(engine.categories().unwrap().iter().all(|c| c.name != "Spaceships"));
    assert!(matches!(
        engine.category("Spaceships"),
        Err(IndexError::UnknownCategory { .. })
    ));

    let buttons = engine.components_in_category("buttons").unwrap();
    assert!(names(&buttons).contains(&"MudButton"));
}

#[tokio::test]
async fn test_display_name_resolves_to_prefixed_name() {
    let engine = corpus_engine().await;
    for (short, full) in [("Button", "MudButton"), ("iconbutton", "MudIconButton"), ("TextField", "MudTextField")] {
        assert_eq!(component(&engine, short).name, component(&engine, full).name);
    }
    assert!(engine.component("Spaceship").unwrap().is_none());
}

#[tokio::test]
async fn test_relationships() {
    let engine = corpus_engine().await;

    let parent = engine.related("MudButton", RelationshipKind::Parent).unwrap();
    assert_eq!(names(&parent), vec!["MudBaseButton"]);

    let children = engine.related("MudBaseButton", RelationshipKind::Child).unwrap();
    assert_eq!(names(&children), vec!["MudButton", "MudIconButton"]);

    let siblings = engine.related("MudButton", RelationshipKind::Sibling).unwrap();
    assert_eq!(names(&siblings), vec!["MudIconButton"]);

    let used_with = engine.related("MudButton", RelationshipKind::CommonlyUsedWith).unwrap();
    assert_eq!(names(&used_with), vec!["MudCard"]);

    let all = engine.related("Button", RelationshipKind::All).unwrap();
    assert_eq!(names(&all), vec!["MudBaseButton", "MudIconButton", "MudCard"]);
}

#[tokio::test]
async fn test_parent_and_child_are_consistent() {
    let engine = corpus_engine().await;

    for name in engine.list_components(None).unwrap() {
        for child in engine.related(&name, RelationshipKind::Child).unwrap() {
            let parents = engine.related(&child.name, RelationshipKind::Parent).unwrap();
            assert_eq!(names(&parents), vec![name.as_str()]);
        }
        for parent in engine.related(&name, RelationshipKind::Parent).unwrap() {
            let children = engine.related(&parent.name, RelationshipKind::Child).unwrap();
            assert!(names(&children).contains(&name.as_str()));
        }
    }
}

#[tokio::test]
async fn test_siblings_exclude_parent_and_children() {
    let engine = corpus_engine().await;

    for name in engine.list_components(None).unwrap() {
        let siblings = engine.related(&name, RelationshipKind::Sibling).unwrap();
        let parents = engine.related(&name, RelationshipKind::Parent).unwrap();
        let children = engine.related(&name, RelationshipKind::Child).unwrap();
        for sibling in &siblings {
            assert_ne!(sibling.name, name);
            assert!(parents.iter().all(|p| p.name != sibling.name));
            assert!(children.iter().all(|c| c.name != sibling.name));
        }
    }
}

#[tokio::test]
async fn test_search_fields() {
    let engine = corpus_engine().await;

    let by_name = engine.search("button", SearchFields::NAME, 10).unwrap();
    assert_eq!(names(&by_name), vec!["MudBaseButton", "MudButton", "MudIconButton"]);

    let by_example = engine.search("attention", SearchFields::EXAMPLES, 10).unwrap();
    assert_eq!(names(&by_example), vec!["MudButton"]);
    assert!(engine.search("attention", SearchFields::NAME, 10).unwrap().is_empty());

    let by_parameter = engine.search("clearable", SearchFields::PARAMETERS, 10).unwrap();
    assert_eq!(names(&by_parameter), vec!["MudTextField"]);

    let truncated = engine.search("mud", SearchFields::ALL, 2).unwrap();
    assert_eq!(names(&truncated), vec!["MudBaseButton", "MudBaseInput"]);
}

#[tokio::test]
async fn test_search_is_idempotent() {
    let engine = corpus_engine().await;
    let first = engine.search_str("button", "name,description", 10).unwrap();
    let second = engine.search_str("BUTTON", "name,description", 10).unwrap();
    assert_eq!(names(&first), names(&second));
    assert_eq!(engine.cache_statistics().unwrap().hit_count, 1);
}

#[tokio::test]
async fn test_api_references() {
    let engine = corpus_engine().await;

    let color: ApiReference = engine.api_reference("Color").unwrap().unwrap();
    assert_eq!(color.kind, ApiTypeKind::Enum);
    let values: Vec<&str> = color.values.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(values, vec!["Default", "Primary", "Secondary", "Error"]);
    assert_eq!(color.values[3].value.as_deref(), Some("7"));

    let variant = engine.api_reference("MudBlazor.Variant").unwrap().unwrap();
    assert_eq!(variant.values.len(), 3);

    let listed = engine.list_api_references().unwrap();
    for name in ["ButtonDefaults", "Color", "Size", "Variant"] {
        assert!(listed.iter().any(|n| n == name), "missing {}", name);
    }
}

#[tokio::test]
async fn test_stats() {
    let engine = corpus_engine().await;
    let stats = engine.stats().unwrap();
    assert_eq!(stats.total_components, 6);
    assert_eq!(stats.total_examples, 3);
    assert_eq!(stats.generation, 1);
    assert!(stats.total_api_references >= 4);
}
