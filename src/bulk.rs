//! Moderator bulk-edit planning.
//!
//! A bulk edit applies one change to every book matching a filter. It runs
//! in two steps against the backend, both described by a [`BulkPlan`]:
//!
//! ```text
//! GET classes/books?count=1&limit=10000&keys=objectId,title&where={...}
//!     → {"results":[{"objectId":"a1"},...],"count":N}
//! PUT classes/books/a1   {"tags":{"__op":"AddUnique","objects":["list:Bible"]}}
//! PUT classes/books/...
//! ```
//!
//! The lookup goes through the same compiler as the catalog grid, so a
//! moderator edits exactly the books they were looking at. Issuing the
//! requests is left to the HTTP layer.

use serde_json::{Value, json};
use thiserror::Error;

use crate::compile::{self, CompiledQuery};
use crate::config::QueryConfig;
use crate::filter::Filter;
use crate::tags;

#[derive(Error, Debug, PartialEq)]
pub enum BulkError {
    #[error("bulk edit value for {0} is empty")]
    EmptyValue(&'static str),
    #[error("refusing to bulk edit without any filter predicates")]
    Unrestricted,
}

/// A single change applied to every matching book.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    AddTag(String),
    RemoveTag(String),
    SetPublisher(String),
    SetOriginalPublisher(String),
    AddToBookshelf(String),
    SetInCirculation(bool),
}

impl BulkOperation {
    fn validate(&self) -> Result<(), BulkError> {
        match self {
            BulkOperation::AddTag(tag) | BulkOperation::RemoveTag(tag) => {
                if tags::is_noop_facet(tag) {
                    return Err(BulkError::EmptyValue("tag"));
                }
            }
            BulkOperation::SetPublisher(v) if v.trim().is_empty() => {
                return Err(BulkError::EmptyValue("publisher"));
            }
            BulkOperation::SetOriginalPublisher(v) if v.trim().is_empty() => {
                return Err(BulkError::EmptyValue("originalPublisher"));
            }
            BulkOperation::AddToBookshelf(v) if v.trim().is_empty() => {
                return Err(BulkError::EmptyValue("bookshelf"));
            }
            _ => {}
        }
        Ok(())
    }

    /// Body of the per-book `PUT` request.
    pub fn update_body(&self) -> Value {
        match self {
            BulkOperation::AddTag(tag) => {
                json!({ "tags": { "__op": "AddUnique", "objects": [tag] } })
            }
            BulkOperation::RemoveTag(tag) => {
                json!({ "tags": { "__op": "Remove", "objects": [tag] } })
            }
            BulkOperation::SetPublisher(publisher) => json!({ "publisher": publisher }),
            BulkOperation::SetOriginalPublisher(publisher) => {
                json!({ "originalPublisher": publisher })
            }
            BulkOperation::AddToBookshelf(shelf) => {
                json!({ "bookshelves": { "__op": "AddUnique", "objects": [shelf] } })
            }
            BulkOperation::SetInCirculation(value) => json!({ "inCirculation": value }),
        }
    }

    /// Short human description, used in CLI output.
    pub fn describe(&self) -> String {
        match self {
            BulkOperation::AddTag(tag) => format!("add tag {tag:?}"),
            BulkOperation::RemoveTag(tag) => format!("remove tag {tag:?}"),
            BulkOperation::SetPublisher(p) => format!("set publisher to {p:?}"),
            BulkOperation::SetOriginalPublisher(p) => format!("set original publisher to {p:?}"),
            BulkOperation::AddToBookshelf(s) => format!("add to bookshelf {s:?}"),
            BulkOperation::SetInCirculation(v) => format!("set inCirculation to {v}"),
        }
    }
}

/// Lookup query plus the update each matching book receives.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPlan {
    pub lookup: CompiledQuery,
    pub operation: BulkOperation,
    pub update: Value,
}

impl BulkPlan {
    /// REST path for updating one book.
    pub fn update_path(object_id: &str) -> String {
        format!("classes/books/{object_id}")
    }
}

/// Build a bulk-edit plan for all books matching `filter`.
pub fn plan(
    filter: &Filter,
    operation: BulkOperation,
    config: &QueryConfig,
) -> Result<BulkPlan, BulkError> {
    operation.validate()?;
    if filter.is_unrestricted() {
        return Err(BulkError::Unrestricted);
    }
    let lookup = compile::compile(&config.bulk_params(), filter, &config.tags.extra);
    let update = operation.update_body();
    log::debug!("bulk edit planned: {}", operation.describe());
    Ok(BulkPlan {
        lookup,
        operation,
        update,
    })
}

/// Object ids from a `GET classes/books` response body.
///
/// Results without a string `objectId` are skipped.
pub fn object_ids(response: &Value) -> Vec<String> {
    response
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r.get("objectId").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
