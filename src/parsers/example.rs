//! Example file extractor
//!
//! Example files (`ButtonFilledExample.razor`) hold markup followed by an
//! optional `@code { ... }` block. The extractor splits the two, drops
//! directive lines that carry no content (`@page`, `@using`, `@namespace`, ...)
//! and tags the example with the attribute families its markup demonstrates.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

use crate::models::Example;
use crate::parsers::rules::PatternTable;
use crate::parsers::Extractor;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*@(?:page|using|namespace|inject|implements|inherits|attribute|layout|typeparam|rendermode|preservewhitespace)\b",
    )
    .expect("valid regex")
});

static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@code\s*\{").expect("valid regex"));

/// Attribute usage → feature tag
const FEATURE_PATTERNS: &[(&str, &str)] = &[
    (r#"\bColor\s*=\s*""#, "color"),
    (r#"\bSize\s*=\s*""#, "size"),
    (r#"\bVariant\s*=\s*""#, "variant"),
    (r#"\bTypo\s*=\s*""#, "typography"),
    (r#"\b(?:Align|HorizontalAlignment)\s*=\s*""#, "align"),
    (r#"\bJustify\s*=\s*""#, "justify"),
    (r#"\bEdge\s*=\s*""#, "edge"),
    (r#"\bAdornment\s*=\s*""#, "adornment"),
    (r#"\b(?:AnchorOrigin|TransformOrigin|Origin)\s*=\s*""#, "origin"),
    (r#"\bPlacement\s*=\s*""#, "placement"),
    (r#"\bOrientation\s*=\s*""#, "orientation"),
    (r#"\bBreakpoint\s*=\s*""#, "breakpoint"),
    (r#"\bElevation\s*=\s*""#, "elevation"),
    (r"\bIcons\.\w+", "icons"),
    (r"\bDisabled\b", "disabled"),
    (r"\bDense\b", "dense"),
    (r"\bFullWidth\b", "fullwidth"),
    (r"@bind-\w+", "binding"),
    (r#"\bOn[A-Z]\w*\s*=\s*""#, "events"),
];

static FEATURE_RULES: LazyLock<PatternTable<&'static str>> =
    LazyLock::new(|| PatternTable::new(FEATURE_PATTERNS).expect("valid feature patterns"));

/// Split a Razor file into its markup and the body of its `@code` block.
///
/// Text after the block's closing brace is kept as markup. An unterminated
/// block runs to the end of the file.
pub fn split_code_block(source: &str) -> (String, Option<String>) {
    let Some(open) = CODE_BLOCK_RE.find(source) else {
        return (source.to_string(), None);
    };

    let body_start = open.end();
    let mut depth = 1i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut close = None;

    for (index, ch) in source[body_start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(body_start + index);
                    break;
                }
            }
            _ => {}
        }
    }

    let (code, after) = match close {
        Some(close) => (&source[body_start..close], &source[close + 1..]),
        None => (&source[body_start..], ""),
    };

    let mut markup = source[..open.start()].to_string();
    if !after.trim().is_empty() {
        markup.push('\n');
        markup.push_str(after);
    }
    (markup, Some(dedent(code)))
}

/// Remove directive lines and surrounding blank lines
pub fn strip_directives(markup: &str) -> String {
    let kept: Vec<&str> = markup
        .lines()
        .filter(|line| !DIRECTIVE_RE.is_match(line))
        .collect();
    kept.join("\n").trim().to_string()
}

/// Feature tags demonstrated by the markup, in table order
pub fn infer_features(markup: &str) -> Vec<String> {
    FEATURE_RULES
        .all_matches(markup)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Remove the common leading indentation of non-blank lines
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Build an example from file contents.
///
/// Returns `None` when both the markup and the code are empty.
pub fn extract(path: &Path, source: &str) -> Option<Example> {
    let name = path.file_stem()?.to_str()?.to_string();
    let (markup, code) = split_code_block(source);
    let markup = strip_directives(&markup);
    let code = code.filter(|c| !c.is_empty());

    if markup.is_empty() && code.is_none() {
        log::debug!("Skipping empty example {}", path.display());
        return None;
    }

    Some(Example {
        name,
        description: None,
        features: infer_features(&markup),
        markup,
        csharp_code: code,
        source_file: path.to_string_lossy().to_string(),
    })
}

/// Example file [`Extractor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleExtractor;

impl Extractor for ExampleExtractor {
    type Output = Example;

    fn extract(&self, path: &Path, source: &str) -> Option<Example> {
        extract(path, source)
    }
}

/// Read and extract an example file for `component`.
///
/// A missing or unreadable file is an expected outcome and yields `None`,
/// as does cancellation.
pub async fn extract_file(
    path: &Path,
    component: &str,
    cancel: &CancellationToken,
) -> Option<Example> {
    let source = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        read = tokio::fs::read_to_string(path) => match read {
            Ok(source) => source,
            Err(e) => {
                log::debug!("No example at {} for {}: {}", path.display(), component, e);
                return None;
            }
        },
    };
    ExampleExtractor.extract(path, &source)
}
