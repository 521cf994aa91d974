//! # bookquery
//!
//! Compiles the digital library's catalog filters into Parse-server query
//! documents. The catalog grid, the search box and the moderator bulk-edit
//! panels all describe "which books" with the same [`filter::Filter`]
//! model; this crate turns one into the `where` document and paging
//! parameters sent to `GET classes/books`.
//!
//! ```text
//! Filter (JSON from UI state)
//!   → compile()            scalar columns, tags, visibility defaults, $or
//!   → CompiledQuery        {"count":1,"limit":40,"where":{...}}
//!   → query-string pairs   count=1&limit=40&where={...}
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`filter`] | The filter model, its JSON form, and the fixed field → column mapping |
//! | [`tags`] | Tag predicate translation: literals, `*` wildcards → `$regex`, empty facets |
//! | [`compile`] | The compiler: `BaseParams` + `Filter` → `CompiledQuery` |
//! | [`bulk`] | Moderator bulk edits: lookup query and per-book update bodies |
//! | [`config`] | `bookquery.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Ordered Where Clauses
//!
//! The backend does not care about key order in a `where` object, but
//! people debugging queries and the tests that pin exact JSON do. The
//! compiler therefore builds every clause in a fixed sequence into a
//! `serde_json::Map` with `preserve_order`, so the same filter always
//! serializes to the same bytes.
//!
//! ## Visibility Defaults Apply Once
//!
//! `inCirculation` and `draft` constraints are added only at the top level.
//! `anyOfThese` children are narrowing predicates combined under `$or`;
//! repeating the defaults inside every branch would be redundant.
//!
//! ## Pure Compilation
//!
//! [`compile::compile`] borrows its input, allocates a fresh output, and has
//! no I/O or shared state, so any number of callers can use it at once.
//! Network concerns (retries, timeouts, issuing bulk updates) stay with the
//! caller.

pub mod bulk;
pub mod compile;
pub mod config;
pub mod filter;
pub mod output;
pub mod tags;

#[cfg(test)]
pub(crate) mod test_helpers;
