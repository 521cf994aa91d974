//! Filter → Parse-server query compilation.
//!
//! [`compile`] is a pure function from a [`Filter`] to a [`CompiledQuery`]:
//! pagination/projection parameters copied from [`BaseParams`], plus a
//! Mongo-style `where` document for `GET classes/books`.
//!
//! # Where-Clause Order
//!
//! Key order in the serialized `where` object is part of the contract, so
//! the clause is a `serde_json::Map` built with `preserve_order` and filled
//! in a fixed sequence:
//!
//! 1. scalar columns, in [`ScalarField::ALL`] order
//! 2. `tags` (literal, `$regex`, or `$all` of several)
//! 3. `inCirculation` and `draft` visibility defaults (top level only)
//! 4. `$or` of the compiled `anyOfThese` children
//!
//! ```text
//! {"otherTags":"bookshelf:first","anyOfThese":[{"otherTags":"bookshelf:second"}]}
//!   → {"tags":"bookshelf:first",
//!      "inCirculation":{"$in":[true,null]},
//!      "draft":{"$in":[false,null]},
//!      "$or":[{"tags":"bookshelf:second"}]}
//! ```
//!
//! # Topic Folding
//!
//! `topic` is normally its own column. When the same filter also has a
//! wildcard `otherTags`, the topic is instead added to the tag list as a
//! `topic:<value>` literal, right after the wildcard, because topics are
//! stored as tags on the backend. No other scalar field folds this way.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::filter::{Filter, InCirculation, ScalarField, TAGS_COLUMN};
use crate::tags::{self, TagConstraint};

/// Pagination and projection parameters, copied verbatim into the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseParams {
    /// `1` asks the backend to include the total match count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    /// Sort specification, e.g. `-createdAt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Field selection, comma-separated column names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
}

impl BaseParams {
    /// Parameters for one page of a grid (`page_index` is 0-based).
    pub fn page(page_size: u32, page_index: u32) -> Self {
        Self {
            limit: Some(page_size),
            skip: Some(page_size.saturating_mul(page_index)),
            ..Default::default()
        }
    }
}

/// A backend-ready query document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
    #[serde(rename = "where")]
    pub where_clause: Map<String, Value>,
    /// Raw full-text search string, forwarded untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl CompiledQuery {
    /// Query-string parameters for `GET classes/books`, with `where` as
    /// compact JSON. Values are not percent-encoded.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(count) = self.count {
            pairs.push(("count", count.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        if let Some(order) = &self.order {
            pairs.push(("order", order.clone()));
        }
        if let Some(keys) = &self.keys {
            pairs.push(("keys", keys.clone()));
        }
        pairs.push((
            "where",
            Value::Object(self.where_clause.clone()).to_string(),
        ));
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

/// Compile a filter into a query.
///
/// `extra_tags` are literal tag predicates (e.g. `"region:Pacific"`) ANDed
/// with the filter's own tag predicates. Never fails and never touches
/// `filter.parent_collection_filter`.
pub fn compile(base: &BaseParams, filter: &Filter, extra_tags: &[String]) -> CompiledQuery {
    CompiledQuery {
        count: base.count,
        limit: base.limit,
        skip: base.skip,
        order: base.order.clone(),
        keys: base.keys.clone(),
        where_clause: where_clause(filter, extra_tags),
        search: filter.search().map(str::to_string),
    }
}

/// The top-level `where` document for a filter, visibility defaults included.
pub fn where_clause(filter: &Filter, extra_tags: &[String]) -> Map<String, Value> {
    let mut clause = Map::new();
    add_field_constraints(&mut clause, filter, extra_tags);
    add_visibility_defaults(&mut clause, filter.circulation());
    add_any_of_these(&mut clause, filter);
    clause
}

/// A nested `anyOfThese` member: same field logic, no defaults.
fn child_clause(filter: &Filter) -> Map<String, Value> {
    if filter.in_circulation.is_some() {
        log::debug!("inCirculation on a nested filter is ignored");
    }
    if filter.search().is_some() {
        log::debug!("search on a nested filter is ignored");
    }
    let mut clause = Map::new();
    add_field_constraints(&mut clause, filter, &[]);
    add_any_of_these(&mut clause, filter);
    clause
}

fn add_field_constraints(clause: &mut Map<String, Value>, filter: &Filter, extra_tags: &[String]) {
    let own_tag = filter.other_tags().and_then(|tag| {
        if tags::is_noop_facet(tag) {
            log::debug!("dropping empty facet {tag:?}");
            None
        } else {
            Some(tags::parse_tag(tag))
        }
    });
    let folded_topic = match (&own_tag, filter.scalar(ScalarField::Topic)) {
        (Some(tag), Some(topic)) if tag.is_pattern() => {
            log::debug!("folding topic {topic:?} into tag predicates");
            Some(topic)
        }
        _ => None,
    };

    for (field, value) in filter.scalars() {
        if field == ScalarField::Topic && folded_topic.is_some() {
            continue;
        }
        clause.insert(field.column().to_string(), Value::String(value.to_string()));
    }

    let mut predicates: Vec<TagConstraint> = own_tag.into_iter().collect();
    if let Some(topic) = folded_topic {
        predicates.push(TagConstraint::Literal(format!("topic:{topic}")));
    }
    for tag in extra_tags {
        if tags::is_noop_facet(tag) {
            log::debug!("dropping empty facet {tag:?}");
            continue;
        }
        predicates.push(tags::parse_tag(tag));
    }

    let constraint = match predicates.as_slice() {
        [] => return,
        [single] => single.to_json(),
        many => {
            let all: Vec<Value> = many.iter().map(TagConstraint::to_json).collect();
            json!({ "$all": all })
        }
    };
    clause.insert(TAGS_COLUMN.to_string(), constraint);
}

fn add_visibility_defaults(clause: &mut Map<String, Value>, circulation: InCirculation) {
    match circulation {
        InCirculation::All => {}
        InCirculation::No => {
            clause.insert("inCirculation".to_string(), json!({ "$in": [false] }));
        }
        InCirculation::Yes => {
            clause.insert("inCirculation".to_string(), json!({ "$in": [true, null] }));
        }
    }
    clause.insert("draft".to_string(), json!({ "$in": [false, null] }));
}

fn add_any_of_these(clause: &mut Map<String, Value>, filter: &Filter) {
    if filter.any_of_these.is_empty() {
        return;
    }
    let children = filter
        .any_of_these
        .iter()
        .map(|child| Value::Object(child_clause(child)))
        .collect();
    clause.insert("$or".to_string(), Value::Array(children));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    const DEFAULTS: &str = r#""inCirculation":{"$in":[true,null]},"draft":{"$in":[false,null]}"#;

    #[test]
    fn empty_filter_gets_visibility_defaults() {
        let query = compile(&BaseParams::default(), &Filter::default(), &[]);
        assert_eq!(to_json(&query), format!(r#"{{"where":{{{DEFAULTS}}}}}"#));
    }

    #[test]
    fn base_params_copied_verbatim() {
        let base = BaseParams {
            count: Some(1),
            limit: Some(20),
            skip: Some(40),
            order: Some("-createdAt".to_string()),
            keys: Some("title,tags".to_string()),
        };
        let query = compile(&base, &Filter::default(), &[]);
        assert_eq!(
            to_json(&query),
            format!(
                r#"{{"count":1,"limit":20,"skip":40,"order":"-createdAt","keys":"title,tags","where":{{{DEFAULTS}}}}}"#
            )
        );
    }

    #[test]
    fn circulation_all_omits_constraint() {
        let filter = Filter {
            in_circulation: Some(InCirculation::All),
            ..Default::default()
        };
        assert_eq!(
            where_json(&filter, &[]),
            r#"{"draft":{"$in":[false,null]}}"#
        );
    }

    #[test]
    fn circulation_no_selects_withdrawn_books() {
        let filter = Filter {
            in_circulation: Some(InCirculation::No),
            ..Default::default()
        };
        assert_eq!(
            where_json(&filter, &[]),
            r#"{"inCirculation":{"$in":[false]},"draft":{"$in":[false,null]}}"#
        );
    }

    #[test]
    fn circulation_yes_same_as_absent() {
        let explicit = Filter {
            in_circulation: Some(InCirculation::Yes),
            ..Default::default()
        };
        assert_eq!(
            where_json(&explicit, &[]),
            where_json(&Filter::default(), &[])
        );
    }

    #[test]
    fn scalar_fields_use_backend_columns() {
        let filter = Filter {
            bookshelf: Some("Enabling Writers".to_string()),
            feature: Some("talkingBook".to_string()),
            keywords_text: Some("dogs".to_string()),
            derived_from: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(
            where_json(&filter, &[]),
            format!(
                r#"{{"bookshelves":"Enabling Writers","features":"talkingBook","keywords":"dogs","bookLineage":"abc123",{DEFAULTS}}}"#
            )
        );
    }

    #[test]
    fn scalars_precede_tags() {
        let filter = Filter {
            language: Some("en".to_string()),
            other_tags: Some("region:Asia".to_string()),
            publisher: Some("Pratham".to_string()),
            ..Default::default()
        };
        assert_eq!(
            where_json(&filter, &[]),
            format!(r#"{{"publisher":"Pratham","language":"en","tags":"region:Asia",{DEFAULTS}}}"#)
        );
    }

    #[test]
    fn other_tags_compile_onto_tags_column() {
        let clause = where_clause(&tag_filter("bookshelf:first"), &[]);
        assert!(clause.get("otherTags").is_none());
        assert_eq!(clause.get("tags"), Some(&json!("bookshelf:first")));
    }

    #[test]
    fn single_wildcard_tag_is_regex() {
        let clause = where_clause(&tag_filter("*Bible*"), &[]);
        assert_eq!(clause.get("tags"), Some(&json!({ "$regex": "Bible" })));
    }

    #[test]
    fn extra_tags_anded_with_own_tag() {
        let clause = where_clause(
            &tag_filter("list:Bible*"),
            &["region:Pacific".to_string(), "level:2".to_string()],
        );
        assert_eq!(
            clause.get("tags"),
            Some(&json!({ "$all": [{ "$regex": "^list:Bible" }, "region:Pacific", "level:2"] }))
        );
    }

    #[test]
    fn single_extra_tag_is_exact_match() {
        let clause = where_clause(&Filter::default(), &["region:Pacific".to_string()]);
        assert_eq!(clause.get("tags"), Some(&json!("region:Pacific")));
    }

    #[test]
    fn topic_folds_into_tags_with_wildcard() {
        let filter = Filter {
            other_tags: Some("list:Bible*".to_string()),
            topic: Some("Animal Stories".to_string()),
            ..Default::default()
        };
        assert_eq!(
            where_json(&filter, &[]),
            format!(
                r#"{{"tags":{{"$all":[{{"$regex":"^list:Bible"}},"topic:Animal Stories"]}},{DEFAULTS}}}"#
            )
        );
    }

    #[test]
    fn folded_topic_precedes_extra_tags() {
        let filter = Filter {
            other_tags: Some("*Bible".to_string()),
            topic: Some("Math".to_string()),
            ..Default::default()
        };
        let clause = where_clause(&filter, &["region:Pacific".to_string()]);
        assert_eq!(
            clause.get("tags"),
            Some(&json!({ "$all": [{ "$regex": "Bible$" }, "topic:Math", "region:Pacific"] }))
        );
        assert!(clause.get("topic").is_none());
    }

    #[test]
    fn topic_stays_scalar_with_literal_tag() {
        let filter = Filter {
            other_tags: Some("list:Bible".to_string()),
            topic: Some("Math".to_string()),
            ..Default::default()
        };
        assert_eq!(
            where_json(&filter, &[]),
            format!(r#"{{"topic":"Math","tags":"list:Bible",{DEFAULTS}}}"#)
        );
    }

    #[test]
    fn topic_stays_scalar_with_wildcard_extra_tag() {
        let filter = Filter {
            topic: Some("Math".to_string()),
            ..Default::default()
        };
        let clause = where_clause(&filter, &["list:*".to_string()]);
        assert_eq!(clause.get("topic"), Some(&json!("Math")));
        assert_eq!(clause.get("tags"), Some(&json!({ "$regex": "^list:" })));
    }

    #[test]
    fn empty_facet_is_noop() {
        assert_eq!(
            where_json(&tag_filter("publisher:"), &[]),
            where_json(&Filter::default(), &[])
        );
        assert_eq!(
            where_json(&Filter::default(), &["publisher:".to_string()]),
            where_json(&Filter::default(), &[])
        );
    }

    #[test]
    fn empty_facet_does_not_force_all() {
        let clause = where_clause(&tag_filter("publisher:"), &["region:Pacific".to_string()]);
        assert_eq!(clause.get("tags"), Some(&json!("region:Pacific")));
    }

    #[test]
    fn empty_facet_does_not_fold_topic() {
        let filter = Filter {
            other_tags: Some("list:".to_string()),
            topic: Some("Math".to_string()),
            ..Default::default()
        };
        assert_eq!(where_clause(&filter, &[]).get("topic"), Some(&json!("Math")));
    }

    #[test]
    fn any_of_these_becomes_or() {
        let filter = any_of(vec![
            tag_filter("bookshelf:first"),
            tag_filter("bookshelf:second"),
        ]);
        assert_eq!(
            where_json(&filter, &[]),
            format!(r#"{{{DEFAULTS},"$or":[{{"tags":"bookshelf:first"}},{{"tags":"bookshelf:second"}}]}}"#)
        );
    }

    #[test]
    fn empty_any_of_these_adds_nothing() {
        let filter = any_of(vec![]);
        assert!(where_clause(&filter, &[]).get("$or").is_none());
    }

    #[test]
    fn children_get_no_defaults_or_extra_tags() {
        let child = Filter {
            publisher: Some("Pratham".to_string()),
            in_circulation: Some(InCirculation::All),
            ..Default::default()
        };
        let clause = where_clause(&any_of(vec![child]), &["region:Pacific".to_string()]);
        assert_eq!(clause.get("$or"), Some(&json!([{ "publisher": "Pratham" }])));
        assert_eq!(clause.get("tags"), Some(&json!("region:Pacific")));
        assert_eq!(clause.get("inCirculation"), Some(&json!({ "$in": [true, null] })));
    }

    #[test]
    fn children_fold_topic_independently() {
        let child = Filter {
            other_tags: Some("list:*".to_string()),
            topic: Some("Math".to_string()),
            ..Default::default()
        };
        let clause = where_clause(&any_of(vec![child]), &[]);
        assert_eq!(
            clause.get("$or"),
            Some(&json!([{ "tags": { "$all": [{ "$regex": "^list:" }, "topic:Math"] } }]))
        );
    }

    #[test]
    fn search_forwarded_raw() {
        let filter = Filter {
            search: Some(r#"dogs "big cats" level:2"#.to_string()),
            ..Default::default()
        };
        let query = compile(&BaseParams::default(), &filter, &[]);
        assert_eq!(query.search.as_deref(), Some(r#"dogs "big cats" level:2"#));
        assert_eq!(query.where_clause, where_clause(&Filter::default(), &[]));
    }

    #[test]
    fn child_search_not_forwarded() {
        let child = Filter {
            search: Some("dogs".to_string()),
            ..Default::default()
        };
        let query = compile(&BaseParams::default(), &any_of(vec![child]), &[]);
        assert_eq!(query.search, None);
    }

    #[test]
    fn parent_filter_not_compiled() {
        let parent = std::sync::Arc::new(Filter {
            publisher: Some("Pratham".to_string()),
            ..Default::default()
        });
        let filter = tag_filter("topic:Math").within(parent);
        assert_eq!(
            where_json(&filter, &[]),
            where_json(&tag_filter("topic:Math"), &[])
        );
    }

    #[test]
    fn compile_leaves_input_untouched() {
        let filter = any_of(vec![tag_filter("list:Bible*")]);
        let before = filter.clone();
        let _ = compile(&BaseParams::page(10, 2), &filter, &["level:1".to_string()]);
        assert_eq!(filter, before);
    }

    #[test]
    fn page_params() {
        let params = BaseParams::page(40, 3);
        assert_eq!(params.limit, Some(40));
        assert_eq!(params.skip, Some(120));
        assert_eq!(params.count, None);
    }

    #[test]
    fn query_pairs_in_order() {
        let base = BaseParams {
            count: Some(1),
            limit: Some(0),
            ..Default::default()
        };
        let filter = Filter {
            search: Some("dogs".to_string()),
            ..tag_filter("topic:Math")
        };
        let query = compile(&base, &filter, &[]);
        let pairs = query.to_query_pairs();
        let names: Vec<_> = pairs.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["count", "limit", "where", "search"]);
        assert_eq!(pairs[0].1, "1");
        assert_eq!(pairs[1].1, "0");
        assert_eq!(
            pairs[2].1,
            format!(r#"{{"tags":"topic:Math",{DEFAULTS}}}"#)
        );
        assert_eq!(pairs[3].1, "dogs");
    }
}
