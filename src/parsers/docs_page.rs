//! Documentation page parser
//!
//! Reads a component's documentation page (`ButtonPage.razor`) and extracts
//! the page header, the ordered sections with the examples each renders,
//! and the component names referenced through `/components/{name}` links.
//!
//! Pages are markup written by hand, so every construct is optional: a page
//! without a `<DocsPageHeader>` still yields its sections and links.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::DocSection;
use crate::parsers::Extractor;
use crate::parsers::rules::normalize_whitespace;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<DocsPageHeader\b(?P<attrs>(?:[^>"]|"[^"]*")*?)(?P<selfclose>/)?>"#)
        .expect("valid regex")
});

static HEADER_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</DocsPageHeader\s*>").expect("valid regex"));

static SECTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<SectionHeader\b(?P<attrs>(?:[^>"]|"[^"]*")*?)/?>"#).expect("valid regex")
});

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<name>[A-Za-z][\w-]*)\s*=\s*"(?P<value>[^"]*)""#).expect("valid regex")
});

static TYPEOF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@?typeof\(\s*(?:[\w.]+\.)?(?P<name>\w+)(?:<[^)]*>)?\s*\)").expect("valid regex")
});

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<Description\s*>(?P<body>.*?)</Description\s*>").expect("valid regex")
});

static TITLE_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Title\s*>(?P<body>.*?)</Title\s*>").expect("valid regex"));

static EXAMPLE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?P<name>[A-Z]\w*Example)\b").expect("valid regex"));

static NAMEOF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@?nameof\(\s*(?P<name>\w+)\s*\)").expect("valid regex"));

static COMPONENT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*"(?:https?://[^"/]+)?/?components/(?P<name>[\w-]+)[^"]*""#)
        .expect("valid regex")
});

static MARKUP_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex"));

static RAZOR_EXPR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\(?\w+(?:\.\w+)*\)?").expect("valid regex"));

/// Everything extracted from one documentation page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocsPage {
    /// Component named by the header's `Component="@typeof(X)"`
    pub component: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub sections: Vec<DocSection>,
    /// Link targets as written (`button`, `mudtextfield`), deduplicated
    pub links: Vec<String>,
}

impl DocsPage {
    /// Description of the section that renders `example`, if any
    pub fn example_description(&self, example: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.examples.iter().any(|e| e == example))
            .map(|s| s.body.as_str())
            .filter(|body| !body.is_empty())
    }
}

/// Documentation page [`Extractor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DocsPageParser;

impl Extractor for DocsPageParser {
    type Output = DocsPage;

    fn extract(&self, _path: &Path, source: &str) -> Option<DocsPage> {
        Some(parse(source))
    }
}

/// Parse documentation page markup. Never fails.
pub fn parse(source: &str) -> DocsPage {
    let mut page = DocsPage::default();

    if let Some(header) = HEADER_RE.captures(source) {
        let attrs = attributes(&header["attrs"]);
        page.title = attr(&attrs, "Title").and_then(clean_text);
        page.subtitle = attr(&attrs, "SubTitle").and_then(clean_text);
        page.component = attr(&attrs, "Component")
            .and_then(|value| TYPEOF_RE.captures(value))
            .map(|caps| caps["name"].to_string());

        if page.subtitle.is_none() && header.name("selfclose").is_none() {
            let body_start = header.get(0).map(|m| m.end()).unwrap_or(0);
            let body = &source[body_start..];
            let body = match HEADER_END_RE.find(body) {
                Some(end) => &body[..end.start()],
                None => body,
            };
            page.subtitle = DESCRIPTION_RE
                .captures(body)
                .and_then(|caps| clean_text(&caps["body"]));
        }
    }

    page.sections = parse_sections(source);

    for caps in COMPONENT_LINK_RE.captures_iter(source) {
        let name = caps["name"].to_string();
        if !page.links.iter().any(|l| l.eq_ignore_ascii_case(&name)) {
            page.links.push(name);
        }
    }

    page
}

fn parse_sections(source: &str) -> Vec<DocSection> {
    let headers: Vec<_> = SECTION_HEADER_RE.captures_iter(source).collect();
    let mut sections = Vec::with_capacity(headers.len());

    for (index, header) in headers.iter().enumerate() {
        let Some(whole) = header.get(0) else {
            continue;
        };
        let end = headers
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(source.len());
        let segment = &source[whole.end()..end];

        let attrs = attributes(&header["attrs"]);
        let heading = attr(&attrs, "Title")
            .and_then(clean_text)
            .or_else(|| {
                TITLE_ELEMENT_RE
                    .captures(segment)
                    .and_then(|caps| clean_text(&caps["body"]))
            })
            .unwrap_or_default();
        let body = DESCRIPTION_RE
            .captures(segment)
            .and_then(|caps| clean_text(&caps["body"]))
            .unwrap_or_default();

        let mut examples: Vec<String> = Vec::new();
        let found = EXAMPLE_TAG_RE
            .captures_iter(segment)
            .chain(NAMEOF_RE.captures_iter(segment))
            .map(|caps| caps["name"].to_string());
        for name in found {
            if !examples.contains(&name) {
                examples.push(name);
            }
        }

        sections.push(DocSection {
            heading,
            body,
            examples,
        });
    }

    sections
}

fn attributes(text: &str) -> Vec<(String, String)> {
    ATTRIBUTE_RE
        .captures_iter(text)
        .map(|caps| (caps["name"].to_string(), caps["value"].to_string()))
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Strip markup and Razor expressions, collapse whitespace
fn clean_text(text: &str) -> Option<String> {
    let text = MARKUP_TAG_RE.replace_all(text, " ");
    let text = RAZOR_EXPR_RE.replace_all(&text, |caps: &regex::Captures| {
        // Keep the last identifier of `@Icons.Material.Filled.Add`
        let expr = caps[0].trim_start_matches('@').trim_matches(|c| c == '(' || c == ')');
        expr.rsplit('.').next().unwrap_or(expr).to_string()
    });
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    let text = normalize_whitespace(&text);
    (!text.is_empty()).then_some(text)
}
