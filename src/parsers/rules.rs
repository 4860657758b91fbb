//! Declarative rule tables shared by the extractors
//!
//! Format-specific parsers describe what they look for as data: a table of
//! `(pattern, tag)` pairs for text inspection and `(marker, role)` pairs for
//! attribute classification. The matchers here evaluate those tables.

use regex::Regex;

/// A compiled pattern with the tag it produces
#[derive(Debug, Clone)]
pub struct PatternRule<T> {
    pub pattern: Regex,
    pub tag: T,
}

/// Ordered list of pattern rules
#[derive(Debug, Clone)]
pub struct PatternTable<T> {
    rules: Vec<PatternRule<T>>,
}

impl<T: Clone> PatternTable<T> {
    /// Compile a table from `(regex, tag)` pairs
    pub fn new(rules: &[(&str, T)]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(pattern, tag)| {
                Ok(PatternRule {
                    pattern: Regex::new(pattern)?,
                    tag: tag.clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Tags of every matching rule, in table order, without duplicates
    pub fn all_matches(&self, text: &str) -> Vec<T>
    where
        T: PartialEq,
    {
        let mut tags: Vec<T> = Vec::new();
        for rule in &self.rules {
            if rule.pattern.is_match(text) && !tags.contains(&rule.tag) {
                tags.push(rule.tag.clone());
            }
        }
        tags
    }
}

/// Look up `name` in a `(marker, role)` table (exact match)
pub fn lookup_marker<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(marker, _)| *marker == name)
        .map(|(_, role)| *role)
}

/// Split on commas that are not nested inside `<>`, `()`, `[]`, `{}`, or string literals
pub fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut current = String::new();

    for ch in text.chars() {
        if in_string {
            current.push(ch);
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
            '"' => {
                in_string = true;
                current.push(ch);
            }
            '<' | '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth <= 0 => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Role {
        A,
        B,
    }

    #[test]
    fn test_pattern_table_all_matches() {
        let table = PatternTable::new(&[(r"foo", "f"), (r"ba[rz]", "b"), (r"o+", "f")]).unwrap();

        assert!(table.all_matches("xyz").is_empty());
        assert_eq!(table.all_matches("foo bar"), vec!["f", "b"]);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(PatternTable::new(&[(r"(", 1)]).is_err());
    }

    #[test]
    fn test_lookup_marker() {
        let table = [("Alpha", Role::A), ("Beta", Role::B)];
        assert_eq!(lookup_marker(&table, "Beta"), Some(Role::B));
        assert_eq!(lookup_marker(&table, "beta"), None);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("Dictionary<string, int> map, Func<int, bool> pred = null"),
            vec!["Dictionary<string, int> map", "Func<int, bool> pred = null"]
        );
        assert_eq!(
            split_top_level(r#"Obsolete("a, b"), Parameter"#),
            vec![r#"Obsolete("a, b")"#, "Parameter"]
        );
        assert!(split_top_level("  ").is_empty());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }
}
