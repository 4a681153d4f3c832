// Shell-style glob matching for resource lookups
//
// Globs are split into a cheap server-side prefilter (`__exact`,
// `__startswith`, `__endswith`) plus a client-side test that enforces the
// full pattern. Brace sets `{a,b?,c*c}` are expanded before matching.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Any glob construct: a `[...]` sequence, a `*`/`?` wildcard, or a `{...}` set.
static GLOB_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*\]|[*?]|\{.*\}").expect("valid glob token regex"));

/// Returns `true` if the text contains any glob construct.
pub fn is_glob(text: &str) -> bool {
    GLOB_TOKEN.is_match(text)
}

/// A field-level glob: server filters plus a client-side test.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    field: String,
    pattern: String,
    filters: Vec<(String, String)>,
}

impl GlobFilter {
    pub fn new(field: &str, criteria: &str) -> Self {
        let mut filters = Vec::new();
        let pieces: Vec<&str> = GLOB_TOKEN.split(criteria).collect();
        match pieces.as_slice() {
            [_] | [] => filters.push((format!("{field}__exact"), criteria.to_owned())),
            [head, .., tail] => {
                if !head.is_empty() {
                    filters.push((format!("{field}__startswith"), (*head).to_owned()));
                }
                if !tail.is_empty() {
                    filters.push((format!("{field}__endswith"), (*tail).to_owned()));
                }
            }
        }
        Self {
            field: field.to_owned(),
            pattern: criteria.to_owned(),
            filters,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Server-side query filters narrowing the candidates.
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Full client-side check of a record's field against the pattern.
    pub fn test(&self, record: &Value) -> bool {
        match record.get(&self.field) {
            Some(Value::String(s)) => glob_match(s, &self.pattern),
            Some(Value::Number(n)) => glob_match(&n.to_string(), &self.pattern),
            Some(Value::Bool(b)) => glob_match(&b.to_string(), &self.pattern),
            _ => false,
        }
    }
}

/// Case-sensitive shell-style match with brace set expansion.
pub fn glob_match(text: &str, pattern: &str) -> bool {
    expand_braces(pattern)
        .iter()
        .any(|p| fnmatch_regex(p).is_some_and(|re| re.is_match(text)))
}

/// Expand bash brace sets, recursively: `a{b,c{d,e}}` -> `ab`, `acd`, `ace`.
///
/// Braces without a top-level comma are kept literally.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_owned()];
    };
    let Some(close) = matching_brace(pattern, open) else {
        return vec![pattern.to_owned()];
    };
    let prefix = &pattern[..open];
    let inner = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];
    let alternatives = split_top_level(inner);
    if alternatives.len() < 2 {
        let literal = &pattern[..=close];
        return expand_braces(suffix)
            .into_iter()
            .map(|rest| format!("{literal}{rest}"))
            .collect();
    }
    alternatives
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

fn matching_brace(pattern: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in pattern[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in inner.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// Translate an fnmatch pattern into an anchored regex.
fn fnmatch_regex(pattern: &str) -> Option<Regex> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut j = i + 1;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                // A leading `]` is part of the set.
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str(r"\[");
                } else {
                    let mut set = String::from("[");
                    let mut k = i + 1;
                    if chars[k] == '!' {
                        set.push('^');
                        k += 1;
                    }
                    for &c in &chars[k..j] {
                        if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
                            set.push('\\');
                        }
                        set.push(c);
                    }
                    set.push(']');
                    out.push_str(&set);
                    i = j;
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    Regex::new(&out).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn pairs(filter: &GlobFilter) -> Vec<(&str, &str)> {
        filter
            .filters()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn literal_is_exact_filter() {
        let filter = GlobFilter::new("foo", "bar");
        assert_eq!(pairs(&filter), vec![("foo__exact", "bar")]);
        assert!(filter.test(&json!({"foo": "bar"})));
        assert!(!filter.test(&json!({"foo": "Bar"})));
        assert!(!filter.test(&json!({})));
    }

    #[test]
    fn star_has_no_server_filter() {
        let filter = GlobFilter::new("foo", "*");
        assert!(filter.filters().is_empty());
        assert!(filter.test(&json!({"foo": "bar"})));
        assert!(filter.test(&json!({"foo": ""})));
        assert!(!filter.test(&json!({"foo": null})));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let filter = GlobFilter::new("foo", "?");
        assert!(filter.filters().is_empty());
        assert!(filter.test(&json!({"foo": "b"})));
        assert!(!filter.test(&json!({"foo": "bar"})));
        assert!(!filter.test(&json!({"foo": ""})));
    }

    #[test]
    fn head_and_tail_become_prefix_suffix_filters() {
        let filter = GlobFilter::new("foo", "bar*");
        assert_eq!(pairs(&filter), vec![("foo__startswith", "bar")]);
        assert!(filter.test(&json!({"foo": "barn"})));
        assert!(!filter.test(&json!({"foo": "abar"})));

        let filter = GlobFilter::new("foo", "*bar");
        assert_eq!(pairs(&filter), vec![("foo__endswith", "bar")]);
        assert!(filter.test(&json!({"foo": "crowbar"})));
        assert!(!filter.test(&json!({"foo": "bars"})));

        let filter = GlobFilter::new("foo", "*bar*");
        assert!(filter.filters().is_empty());
        assert!(filter.test(&json!({"foo": "crowbars"})));
    }

    #[test]
    fn numeric_fields_match_as_text() {
        let filter = GlobFilter::new("id", "12*");
        assert!(filter.test(&json!({"id": 1234})));
        assert!(filter.test(&json!({"id": "129"})));
    }

    #[test]
    fn sequences_and_negation() {
        assert!(glob_match("b", "[abc]"));
        assert!(!glob_match("d", "[abc]"));
        assert!(glob_match("d", "[!abc]"));
        assert!(glob_match("]", "[]]"));
        assert!(glob_match("[x", "[x"));
        assert!(glob_match("a.b", "a.b"));
        assert!(!glob_match("axb", "a.b"));
    }

    #[test]
    fn brace_sets_expand() {
        assert_eq!(expand_braces("a{b,c}d"), vec!["abd", "acd"]);
        assert_eq!(expand_braces("{x,y{1,2}}"), vec!["x", "y1", "y2"]);
        assert_eq!(expand_braces("{solo}z"), vec!["{solo}z"]);
        assert!(glob_match("wan", "{lan,wan}"));
        assert!(glob_match("cccc", "{a,b?,c*c}"));
        assert!(!glob_match("b", "{a,b?,c*c}"));
    }

    #[test]
    fn is_glob_detects_tokens() {
        assert!(is_glob("rules.*"));
        assert!(is_glob("{a,b}"));
        assert!(!is_glob("status.wan"));
    }
}
