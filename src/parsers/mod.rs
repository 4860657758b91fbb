//! Extractors for the three source formats of the component library
//!
//! - [`declaration`]: C# class files and Razor components with an `@code` block
//! - [`docs_page`]: documentation pages (header, sections, cross-links)
//! - [`example`]: example files (markup, code, feature tags)
//!
//! [`SourceKind`] tells the indexer which format a file is in, and the
//! indexer hands its contents to that format's [`Extractor`]. Each
//! extractor is unit-tested on its own. Extractors never fail hard: input
//! they cannot make sense of yields `None`.

pub mod declaration;
pub mod docs_page;
pub mod example;
pub mod rules;

use std::path::Path;

pub use declaration::DeclarationParser;
pub use docs_page::DocsPageParser;
pub use example::ExampleExtractor;

/// A parser for one source format
pub trait Extractor {
    type Output;

    /// Extract from file contents; `path` is used for naming and diagnostics
    fn extract(&self, path: &Path, source: &str) -> Option<Self::Output>;
}

/// What a file in the source tree is, judged by its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `*.cs` or `*.razor` component source
    Declaration,
    /// `*Page.razor` documentation page
    DocsPage,
    /// `*Example.razor` example file
    Example,
}

impl SourceKind {
    /// Classify a file name. Names are checked from most to least specific.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with("Example.razor") {
            Some(SourceKind::Example)
        } else if name.ends_with("Page.razor") {
            Some(SourceKind::DocsPage)
        } else if name.ends_with(".cs") || name.ends_with(".razor") {
            Some(SourceKind::Declaration)
        } else {
            None
        }
    }
}
