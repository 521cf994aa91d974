//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! ## Check
//!
//! ```text
//! Filter
//!     publisher: Pratham
//!     otherTags: list:Bible* (prefix match)
//!     inCirculation: Yes (default)
//!     Any of these (2)
//!         001
//!             topic: Math
//!         002
//!             topic: Science
//! Within collection
//!     bookshelf: Enabling Writers
//! ```
//!
//! ## Bulk plan
//!
//! ```text
//! Bulk edit: add tag "list:Bible"
//!     Lookup: GET classes/books
//!         count=1
//!         where={...}
//!     Update: PUT classes/books/<objectId>
//!         {"tags":{"__op":"AddUnique","objects":["list:Bible"]}}
//! ```

use crate::bulk::BulkPlan;
use crate::compile::CompiledQuery;
use crate::filter::Filter;
use crate::tags::{self, TagConstraint};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn describe_tag(tag: &str) -> String {
    if tags::is_noop_facet(tag) {
        return format!("{tag} (ignored: empty facet)");
    }
    match tags::parse_tag(tag) {
        TagConstraint::Literal(_) => tag.to_string(),
        TagConstraint::Regex { kind, .. } => format!("{tag} ({})", kind.label()),
    }
}

fn filter_lines(filter: &Filter, depth: usize, top_level: bool, lines: &mut Vec<String>) {
    let pad = indent(depth);
    for (field, value) in filter.scalars() {
        lines.push(format!("{pad}{}: {value}", field.name()));
    }
    if let Some(tag) = filter.other_tags() {
        lines.push(format!("{pad}otherTags: {}", describe_tag(tag)));
    }
    if top_level {
        match filter.in_circulation {
            Some(c) => lines.push(format!("{pad}inCirculation: {c:?}")),
            None => lines.push(format!("{pad}inCirculation: Yes (default)")),
        }
        if let Some(search) = filter.search() {
            lines.push(format!("{pad}search: {search:?}"));
        }
    }
    if !filter.any_of_these.is_empty() {
        lines.push(format!("{pad}Any of these ({})", filter.any_of_these.len()));
        for (i, child) in filter.any_of_these.iter().enumerate() {
            lines.push(format!("{}{}", indent(depth + 1), format_index(i + 1)));
            filter_lines(child, depth + 2, false, lines);
        }
    }
}

/// Summarize a filter and the collection filters it sits within.
pub fn format_filter_summary(filter: &Filter) -> Vec<String> {
    let mut lines = vec!["Filter".to_string()];
    filter_lines(filter, 1, true, &mut lines);
    if filter.is_unrestricted() {
        lines.push(format!("{}(matches every visible book)", indent(1)));
    }
    let mut parent = filter.parent();
    while let Some(p) = parent {
        lines.push("Within collection".to_string());
        filter_lines(p, 1, false, &mut lines);
        parent = p.parent();
    }
    lines
}

/// One `name=value` line per query-string parameter.
pub fn format_query_string(query: &CompiledQuery) -> Vec<String> {
    query
        .to_query_pairs()
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect()
}

/// Describe the two requests a bulk edit will make.
pub fn format_bulk_plan(plan: &BulkPlan) -> Vec<String> {
    let mut lines = vec![format!("Bulk edit: {}", plan.operation.describe())];
    lines.push(format!("{}Lookup: GET classes/books", indent(1)));
    for line in format_query_string(&plan.lookup) {
        lines.push(format!("{}{line}", indent(2)));
    }
    lines.push(format!(
        "{}Update: PUT {}",
        indent(1),
        BulkPlan::update_path("<objectId>")
    ));
    lines.push(format!("{}{}", indent(2), plan.update));
    lines
}

pub fn print_filter_summary(filter: &Filter) {
    for line in format_filter_summary(filter) {
        println!("{}", line);
    }
}

pub fn print_query_string(query: &CompiledQuery) {
    for line in format_query_string(query) {
        println!("{}", line);
    }
}

pub fn print_bulk_plan(plan: &BulkPlan) {
    for line in format_bulk_plan(plan) {
        println!("{}", line);
    }
}
