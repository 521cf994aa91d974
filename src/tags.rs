//! Tag predicate translation.
//!
//! Books keep many logically distinct facets in one `tags` array, as
//! `key:value` strings (`topic:Math`, `bookshelf:Enabling Writers`,
//! `list:Bible Stories`). A tag predicate is either a literal tag or a
//! pattern with a `*` wildcard at one or both ends:
//!
//! | Predicate | Match | Constraint |
//! |-----------|-------|------------|
//! | `list:Bible Stories` | exact | `"list:Bible Stories"` |
//! | `list:Bible*` | prefix | `{"$regex":"^list:Bible"}` |
//! | `*Bible` | suffix | `{"$regex":"Bible$"}` |
//! | `*Bible*` | substring | `{"$regex":"Bible"}` |
//!
//! Text around the wildcards is regex-escaped, so `list:Bible (NT)*` still
//! means "starts with `list:Bible (NT)`". A `*` anywhere else is not a
//! supported pattern; such predicates become an unanchored regex of the
//! whole escaped tag, i.e. a literal substring match.

use serde_json::{Value, json};

/// How a `$regex` tag constraint matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Prefix,
    Suffix,
    Substring,
}

impl MatchKind {
    pub fn label(self) -> &'static str {
        match self {
            MatchKind::Prefix => "prefix match",
            MatchKind::Suffix => "suffix match",
            MatchKind::Substring => "substring match",
        }
    }
}

/// A single compiled tag predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagConstraint {
    /// Exact tag match.
    Literal(String),
    /// Pattern match against any tag in the array.
    Regex { kind: MatchKind, pattern: String },
}

impl TagConstraint {
    pub fn is_pattern(&self) -> bool {
        matches!(self, TagConstraint::Regex { .. })
    }

    /// Wire form: a bare string or a `{"$regex": ...}` object.
    pub fn to_json(&self) -> Value {
        match self {
            TagConstraint::Literal(tag) => Value::String(tag.clone()),
            TagConstraint::Regex { pattern, .. } => json!({ "$regex": pattern }),
        }
    }
}

/// True for predicates that must not constrain anything: blank strings and
/// facets with nothing after the colon (`"publisher:"`).
pub fn is_noop_facet(tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() {
        return true;
    }
    match tag.split_once(':') {
        Some((_, value)) => value.trim().is_empty(),
        None => false,
    }
}

/// Translate one tag predicate into its constraint.
pub fn parse_tag(tag: &str) -> TagConstraint {
    if !tag.contains('*') {
        return TagConstraint::Literal(tag.to_string());
    }

    let (leading, rest) = match tag.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, tag),
    };
    let (trailing, inner) = match rest.strip_suffix('*') {
        Some(inner) => (true, inner),
        None => (false, rest),
    };

    if inner.contains('*') {
        log::warn!("unsupported wildcard position in tag {tag:?}; matching it literally");
        return TagConstraint::Regex {
            kind: MatchKind::Substring,
            pattern: regex::escape(tag),
        };
    }

    let literal = regex::escape(inner);
    let (kind, pattern) = match (leading, trailing) {
        (true, true) => (MatchKind::Substring, literal),
        (false, true) => (MatchKind::Prefix, format!("^{literal}")),
        // leading only
        _ => (MatchKind::Suffix, format!("{literal}$")),
    };
    TagConstraint::Regex { kind, pattern }
}
