//! The user-facing filter model.
//!
//! A [`Filter`] is what the catalog grid, the search box and the moderator
//! bulk-edit panels build from UI state. It is a record of optional
//! predicates plus a recursive `anyOfThese` list (a logical OR of child
//! filters). Filters arrive as JSON in the same camelCase shape the front
//! end uses:
//!
//! ```json
//! {
//!   "publisher": "Pratham",
//!   "otherTags": "list:Bible*",
//!   "inCirculation": "All",
//!   "anyOfThese": [{ "topic": "Math" }, { "topic": "Science" }]
//! }
//! ```
//!
//! Absent fields mean "not specified". Empty strings are treated the same
//! way, because cleared text boxes in the UI produce them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Filter JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tri-state circulation selector.
///
/// An absent value is NOT the same as `All`: absence falls back to `Yes`,
/// so the general catalog only shows books that are in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InCirculation {
    All,
    No,
    #[default]
    Yes,
}

/// Filter fields that compile to a single exact-match column constraint.
///
/// Declaration order is the order the columns appear in a where clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    Publisher,
    OriginalPublisher,
    Bookshelf,
    Feature,
    Topic,
    BookShelfCategory,
    BrandingProjectName,
    Language,
    KeywordsText,
    DerivedFrom,
}

impl ScalarField {
    pub const ALL: [ScalarField; 10] = [
        ScalarField::Publisher,
        ScalarField::OriginalPublisher,
        ScalarField::Bookshelf,
        ScalarField::Feature,
        ScalarField::Topic,
        ScalarField::BookShelfCategory,
        ScalarField::BrandingProjectName,
        ScalarField::Language,
        ScalarField::KeywordsText,
        ScalarField::DerivedFrom,
    ];

    /// Field name as it appears in filter JSON.
    pub fn name(self) -> &'static str {
        match self {
            ScalarField::Publisher => "publisher",
            ScalarField::OriginalPublisher => "originalPublisher",
            ScalarField::Bookshelf => "bookshelf",
            ScalarField::Feature => "feature",
            ScalarField::Topic => "topic",
            ScalarField::BookShelfCategory => "bookShelfCategory",
            ScalarField::BrandingProjectName => "brandingProjectName",
            ScalarField::Language => "language",
            ScalarField::KeywordsText => "keywordsText",
            ScalarField::DerivedFrom => "derivedFrom",
        }
    }

    /// Backend column the field is matched against. This mapping is fixed.
    pub fn column(self) -> &'static str {
        match self {
            ScalarField::Publisher => "publisher",
            ScalarField::OriginalPublisher => "originalPublisher",
            ScalarField::Bookshelf => "bookshelves",
            ScalarField::Feature => "features",
            ScalarField::Topic => "topic",
            ScalarField::BookShelfCategory => "bookshelfCategory",
            ScalarField::BrandingProjectName => "brandingProjectName",
            ScalarField::Language => "language",
            ScalarField::KeywordsText => "keywords",
            ScalarField::DerivedFrom => "bookLineage",
        }
    }
}

/// Backend column for `otherTags` and every other tag predicate.
pub const TAGS_COLUMN: &str = "tags";

/// Which books to match.
///
/// The compiler only ever borrows a `Filter`; nothing in this crate mutates
/// one after it has been built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookshelf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_shelf_category: Option<String>,
    /// A single tag predicate, possibly with `*` wildcards at either end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_circulation: Option<InCirculation>,
    /// Raw full-text search string; the backend parses it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding_project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    /// Logical OR of child filters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of_these: Vec<Filter>,
    /// Read-only back-link to the filter of an enclosing collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_collection_filter: Option<Arc<Filter>>,
}

impl Filter {
    /// Value of a scalar predicate, or `None` when absent or empty.
    pub fn scalar(&self, field: ScalarField) -> Option<&str> {
        let value = match field {
            ScalarField::Publisher => &self.publisher,
            ScalarField::OriginalPublisher => &self.original_publisher,
            ScalarField::Bookshelf => &self.bookshelf,
            ScalarField::Feature => &self.feature,
            ScalarField::Topic => &self.topic,
            ScalarField::BookShelfCategory => &self.book_shelf_category,
            ScalarField::BrandingProjectName => &self.branding_project_name,
            ScalarField::Language => &self.language,
            ScalarField::KeywordsText => &self.keywords_text,
            ScalarField::DerivedFrom => &self.derived_from,
        };
        non_empty(value)
    }

    /// Scalar predicates that are set, in where-clause order.
    pub fn scalars(&self) -> impl Iterator<Item = (ScalarField, &str)> + '_ {
        ScalarField::ALL
            .into_iter()
            .filter_map(|field| self.scalar(field).map(|value| (field, value)))
    }

    pub fn other_tags(&self) -> Option<&str> {
        non_empty(&self.other_tags)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Effective circulation selector (absent means `Yes`).
    pub fn circulation(&self) -> InCirculation {
        self.in_circulation.unwrap_or_default()
    }

    /// The enclosing collection's filter, if this filter was opened from one.
    pub fn parent(&self) -> Option<&Filter> {
        self.parent_collection_filter.as_deref()
    }

    /// Attach an enclosing collection's filter as narrowing context.
    pub fn within(mut self, parent: Arc<Filter>) -> Self {
        self.parent_collection_filter = Some(parent);
        self
    }

    /// True when the filter carries no predicate that narrows the book set.
    ///
    /// The circulation selector does not count: it only picks between
    /// visibility defaults.
    pub fn is_unrestricted(&self) -> bool {
        self.search().is_none() && self.narrows_nothing()
    }

    /// True when the compiled where clause, defaults aside, matches every
    /// book. One match-all `anyOfThese` branch makes the whole `$or` match
    /// everything. `search` is not compiled into nested clauses, so it is
    /// not checked here.
    fn narrows_nothing(&self) -> bool {
        self.scalars().next().is_none()
            && self
                .other_tags()
                .is_none_or(crate::tags::is_noop_facet)
            && (self.any_of_these.is_empty()
                || self.any_of_these.iter().any(Filter::narrows_nothing))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse a filter from its JSON representation.
pub fn parse_filter(json: &str) -> Result<Filter, FilterError> {
    Ok(serde_json::from_str(json)?)
}

/// Read a filter from any reader (used for stdin).
pub fn read_filter(mut reader: impl Read) -> Result<Filter, FilterError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    parse_filter(&content)
}

/// Load a filter from a JSON file.
pub fn load_filter(path: &Path) -> Result<Filter, FilterError> {
    let content = fs::read_to_string(path)?;
    parse_filter(&content)
}
