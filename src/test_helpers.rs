//! Shared test utilities for the bookquery test suite.
//!
//! Filter builders for the shapes tests use over and over, plus serializers
//! that return the exact JSON strings the backend would receive.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let filter = any_of(vec![tag_filter("bookshelf:first"), tag_filter("list:Bible*")]);
//! assert!(where_json(&filter, &[]).contains(r#""$or""#));
//! ```

use crate::compile::{self, CompiledQuery};
use crate::filter::Filter;

/// A filter with only `otherTags` set.
pub fn tag_filter(tag: &str) -> Filter {
    Filter {
        other_tags: Some(tag.to_string()),
        ..Default::default()
    }
}

/// A filter with only `anyOfThese` set.
pub fn any_of(children: Vec<Filter>) -> Filter {
    Filter {
        any_of_these: children,
        ..Default::default()
    }
}

/// Serialize a compiled query exactly as it goes on the wire.
pub fn to_json(query: &CompiledQuery) -> String {
    serde_json::to_string(query).unwrap()
}

/// Serialize just the top-level where clause for `filter`.
pub fn where_json(filter: &Filter, extra_tags: &[String]) -> String {
    serde_json::to_string(&compile::where_clause(filter, extra_tags)).unwrap()
}
