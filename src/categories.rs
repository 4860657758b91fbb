//! Component category mapping
//!
//! Categories come from a curated table (name, title, description, seed
//! members) that is independent of the source tree. Components missing from
//! the table are placed by an ordered list of name-pattern rules; the first
//! matching rule wins.
//!
//! The table is plain configuration: it is constructed once per build and
//! passed into the mapper, never stored in process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Category;

/// Category for unmapped names that match no inference rule
pub const OTHER_CATEGORY: &str = "Other";

/// Category used when inference is disabled
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One curated category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Seed member component names
    #[serde(default)]
    pub members: Vec<String>,
}

/// A name-pattern rule mapping unlisted components to a category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InferenceRule {
    pub category: String,
    /// Match when the name contains any of these
    #[serde(default)]
    pub contains: Vec<String>,
    /// Match when the name ends with any of these
    #[serde(default)]
    pub ends_with: Vec<String>,
}

impl InferenceRule {
    pub fn matches(&self, name: &str) -> bool {
        self.contains.iter().any(|p| name.contains(p.as_str()))
            || self.ends_with.iter().any(|p| name.ends_with(p.as_str()))
    }
}

/// Curated categories plus inference rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CategoryTable {
    pub entries: Vec<CategoryEntry>,
    pub rules: Vec<InferenceRule>,
    /// Apply `rules` to unlisted components
    pub infer: bool,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

type Seed = (&'static str, &'static str, &'static str, &'static [&'static str]);

const BUILTIN_CATEGORIES: &[Seed] = &[
    (
        "Buttons",
        "Buttons",
        "Clickable controls that trigger actions",
        &[
            "MudButton",
            "MudIconButton",
            "MudFab",
            "MudToggleIconButton",
            "MudButtonGroup",
            "MudToggleGroup",
            "MudToggleItem",
        ],
    ),
    (
        "Form Inputs & Controls",
        "Form Inputs & Controls",
        "Text fields, selections, toggles, and form containers",
        &[
            "MudTextField",
            "MudNumericField",
            "MudSelect",
            "MudSelectItem",
            "MudAutocomplete",
            "MudCheckBox",
            "MudRadio",
            "MudRadioGroup",
            "MudSwitch",
            "MudSlider",
            "MudRating",
            "MudForm",
            "MudFileUpload",
            "MudInput",
            "MudInputLabel",
            "MudField",
        ],
    ),
    (
        "Pickers",
        "Pickers",
        "Date, time, and color selection",
        &[
            "MudDatePicker",
            "MudDateRangePicker",
            "MudTimePicker",
            "MudColorPicker",
        ],
    ),
    (
        "Navigation",
        "Navigation",
        "Menus, links, tabs, and app-level navigation",
        &[
            "MudNavMenu",
            "MudNavLink",
            "MudNavGroup",
            "MudMenu",
            "MudMenuItem",
            "MudBreadcrumbs",
            "MudTabs",
            "MudTabPanel",
            "MudLink",
            "MudPagination",
            "MudAppBar",
            "MudDrawer",
            "MudStepper",
        ],
    ),
    (
        "Layout",
        "Layout",
        "Structural containers and spacing",
        &[
            "MudContainer",
            "MudGrid",
            "MudItem",
            "MudStack",
            "MudPaper",
            "MudCard",
            "MudLayout",
            "MudMainContent",
            "MudSpacer",
            "MudDivider",
            "MudHidden",
            "MudBreakpointProvider",
            "MudSwipeArea",
        ],
    ),
    (
        "Data Display",
        "Data Display",
        "Tables, lists, trees, and visual indicators",
        &[
            "MudTable",
            "MudDataGrid",
            "MudSimpleTable",
            "MudList",
            "MudListItem",
            "MudTreeView",
            "MudTreeViewItem",
            "MudAvatar",
            "MudBadge",
            "MudChip",
            "MudChipSet",
            "MudIcon",
            "MudText",
            "MudTimeline",
            "MudTimelineItem",
            "MudCarousel",
            "MudImage",
            "MudExpansionPanels",
            "MudExpansionPanel",
            "MudVirtualize",
        ],
    ),
    (
        "Feedback",
        "Feedback",
        "Alerts, dialogs, progress, and transient messages",
        &[
            "MudAlert",
            "MudDialog",
            "MudMessageBox",
            "MudSnackbarProvider",
            "MudProgressCircular",
            "MudProgressLinear",
            "MudSkeleton",
            "MudTooltip",
            "MudOverlay",
            "MudPopover",
        ],
    ),
    (
        "Charts",
        "Charts",
        "Data visualisation",
        &["MudChart", "MudTimeSeriesChart"],
    ),
    (
        "Utilities",
        "Utilities",
        "Providers and behavior helpers without visual output of their own",
        &[
            "MudElement",
            "MudFocusTrap",
            "MudScrollToTop",
            "MudThemeProvider",
            "MudPopoverProvider",
            "MudDialogProvider",
            "MudHighlighter",
            "MudRTLProvider",
        ],
    ),
];

type RuleSeed = (&'static str, &'static [&'static str], &'static [&'static str]);

const BUILTIN_RULES: &[RuleSeed] = &[
    ("Buttons", &["Button"], &["Fab"]),
    ("Pickers", &["Picker"], &[]),
    ("Charts", &["Chart"], &[]),
    (
        "Form Inputs & Controls",
        &[
            "Field",
            "Select",
            "Input",
            "CheckBox",
            "Radio",
            "Switch",
            "Slider",
            "Autocomplete",
            "Form",
            "Upload",
            "Rating",
            "Mask",
        ],
        &[],
    ),
    (
        "Navigation",
        &[
            "Nav",
            "Menu",
            "Breadcrumb",
            "Tab",
            "Link",
            "Pagination",
            "Drawer",
            "AppBar",
            "Stepper",
        ],
        &[],
    ),
    (
        "Feedback",
        &[
            "Dialog",
            "Snackbar",
            "Alert",
            "Progress",
            "Skeleton",
            "Tooltip",
            "Overlay",
            "Popover",
            "Message",
        ],
        &[],
    ),
    (
        "Data Display",
        &[
            "Table", "DataGrid", "List", "Tree", "Timeline", "Chip", "Avatar", "Badge",
            "Carousel", "Icon", "Text", "Image",
        ],
        &[],
    ),
    (
        "Layout",
        &[],
        &[
            "Container", "Paper", "Card", "Stack", "Layout", "Grid", "Item", "Panel", "Divider",
            "Spacer",
        ],
    ),
    ("Utilities", &["Provider", "Theme", "Focus", "Scroll"], &[]),
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl CategoryTable {
    /// The built-in curated table
    pub fn builtin() -> Self {
        let entries = BUILTIN_CATEGORIES
            .iter()
            .map(|(name, title, description, members)| CategoryEntry {
                name: name.to_string(),
                title: Some(title.to_string()),
                description: Some(description.to_string()),
                members: strings(members),
            })
            .collect();

        let rules = BUILTIN_RULES
            .iter()
            .map(|(category, contains, ends_with)| InferenceRule {
                category: category.to_string(),
                contains: strings(contains),
                ends_with: strings(ends_with),
            })
            .collect();

        Self {
            entries,
            rules,
            infer: true,
        }
    }
}

/// Resolves component names to categories for one build
#[derive(Debug, Clone)]
pub struct CategoryMapper {
    seeds: Vec<Category>,
    owners: HashMap<String, usize>,
    rules: Vec<InferenceRule>,
    infer: bool,
}

impl CategoryMapper {
    /// Load the curated table. A name seeded into several categories belongs
    /// to the first one listed.
    pub fn initialize(table: &CategoryTable) -> Self {
        let mut seeds: Vec<Category> = Vec::with_capacity(table.entries.len());
        let mut owners = HashMap::new();

        for entry in &table.entries {
            let index = match seeds.iter().position(|c| c.name == entry.name) {
                Some(existing) => existing,
                None => {
                    seeds.push(Category {
                        name: entry.name.clone(),
                        title: entry.title.clone(),
                        description: entry.description.clone(),
                        components: Vec::new(),
                    });
                    seeds.len() - 1
                }
            };

            for member in &entry.members {
                if owners.contains_key(member) {
                    log::debug!(
                        "'{}' already mapped, ignoring duplicate in category '{}'",
                        member,
                        entry.name
                    );
                    continue;
                }
                owners.insert(member.clone(), index);
                seeds[index].components.push(member.clone());
            }
        }

        log::debug!(
            "Category table loaded: {} categories, {} seeded components",
            seeds.len(),
            owners.len()
        );

        Self {
            seeds,
            owners,
            rules: table.rules.clone(),
            infer: table.infer,
        }
    }

    /// Category owning `component` in the curated table, if any
    pub fn category_name(&self, component: &str) -> Option<&str> {
        self.owners
            .get(component)
            .map(|&index| self.seeds[index].name.as_str())
    }

    /// First rule matching `component`, else the fallback category
    pub fn infer_category_from_name(&self, component: &str) -> &str {
        if !self.infer {
            return UNCATEGORIZED;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(component))
            .map(|rule| rule.category.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }

    /// Curated lookup first, inference second. Never fails.
    pub fn resolve(&self, component: &str) -> String {
        match self.category_name(component) {
            Some(name) => name.to_string(),
            None => self.infer_category_from_name(component).to_string(),
        }
    }

    /// Curated categories with their title and description, members cleared
    pub fn seed_categories(&self) -> Vec<Category> {
        self.seeds
            .iter()
            .map(|c| Category {
                components: Vec::new(),
                ..c.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CategoryMapper {
        CategoryMapper::initialize(&CategoryTable::builtin())
    }

    #[test]
    fn test_seeded_lookup() {
        let mapper = mapper();
        assert_eq!(mapper.category_name("MudButton"), Some("Buttons"));
        assert_eq!(mapper.category_name("MudDatePicker"), Some("Pickers"));
        assert_eq!(mapper.category_name("MudUnknownThing"), None);
    }

    #[test]
    fn test_inference_rules_in_order() {
        let mapper = mapper();
        assert_eq!(mapper.infer_category_from_name("MudSplitButton"), "Buttons");
        assert_eq!(
            mapper.infer_category_from_name("MudPasswordField"),
            "Form Inputs & Controls"
        );
        assert_eq!(
            mapper.infer_category_from_name("MudMultiSelect"),
            "Form Inputs & Controls"
        );
        assert_eq!(mapper.infer_category_from_name("MudMonthPicker"), "Pickers");
        // "Icon" would match Data Display, but Buttons comes first
        assert_eq!(mapper.infer_category_from_name("MudIconButtonX"), "Buttons");
        assert_eq!(mapper.infer_category_from_name("MudFlexPanel"), "Layout");
        assert_eq!(mapper.infer_category_from_name("MudSomething"), OTHER_CATEGORY);
    }

    #[test]
    fn test_resolve_prefers_table() {
        let mapper = mapper();
        // MudHidden matches no rule but is seeded
        assert_eq!(mapper.resolve("MudHidden"), "Layout");
        assert_eq!(mapper.resolve("MudGizmo"), OTHER_CATEGORY);
    }

    #[test]
    fn test_duplicate_seed_goes_to_first_category() {
        let table = CategoryTable {
            entries: vec![
                CategoryEntry {
                    name: "A".to_string(),
                    title: None,
                    description: None,
                    members: vec!["MudX".to_string()],
                },
                CategoryEntry {
                    name: "B".to_string(),
                    title: None,
                    description: None,
                    members: vec!["MudX".to_string(), "MudY".to_string()],
                },
            ],
            rules: vec![],
            infer: true,
        };
        let mapper = CategoryMapper::initialize(&table);
        assert_eq!(mapper.category_name("MudX"), Some("A"));
        assert_eq!(mapper.category_name("MudY"), Some("B"));
    }

    #[test]
    fn test_inference_disabled() {
        let table = CategoryTable {
            infer: false,
            ..CategoryTable::builtin()
        };
        let mapper = CategoryMapper::initialize(&table);
        assert_eq!(mapper.resolve("MudSplitButton"), UNCATEGORIZED);
        assert_eq!(mapper.resolve("MudButton"), "Buttons");
    }

    #[test]
    fn test_table_from_toml() {
        let table: CategoryTable = toml::from_str(
            r#"
            [[entries]]
            name = "Widgets"
            members = ["MudWidget"]

            [[rules]]
            category = "Gadgets"
            ends_with = ["Gadget"]
            "#,
        )
        .unwrap();

        assert!(table.infer);
        let mapper = CategoryMapper::initialize(&table);
        assert_eq!(mapper.resolve("MudWidget"), "Widgets");
        assert_eq!(mapper.resolve("MudTinyGadget"), "Gadgets");
        assert_eq!(mapper.resolve("MudButton"), OTHER_CATEGORY);
    }
}
