//! Query configuration module.
//!
//! Handles loading, validating, and merging `bookquery.toml`. Stock defaults
//! are overridden by whatever the user file specifies; keys it leaves out
//! keep their stock values.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [grid]
//! page_size = 40            # Books per catalog grid page
//! count = true              # Ask the backend for the total match count
//! # order = "-createdAt"    # Sort specification (omit for backend order)
//! keys = []                 # Columns to return (empty = all)
//!
//! [bulk_edit]
//! max_records = 10000       # Upper bound on books one bulk edit may touch
//! keys = ["objectId", "title"]
//!
//! [tags]
//! extra = []                # Literal tags ANDed into every query
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::compile::BaseParams;

/// Conventional file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "bookquery.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Query configuration loaded from `bookquery.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Catalog grid paging and projection.
    pub grid: GridConfig,
    /// Moderator bulk-edit lookups.
    pub bulk_edit: BulkEditConfig,
    /// Tags applied to every query.
    pub tags: TagsConfig,
}

impl QueryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.page_size == 0 {
            return Err(ConfigError::Validation(
                "grid.page_size must be greater than 0".into(),
            ));
        }
        if self.bulk_edit.max_records == 0 {
            return Err(ConfigError::Validation(
                "bulk_edit.max_records must be greater than 0".into(),
            ));
        }
        validate_keys("grid.keys", &self.grid.keys)?;
        validate_keys("bulk_edit.keys", &self.bulk_edit.keys)?;
        if self.tags.extra.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "tags.extra must not contain empty tags".into(),
            ));
        }
        Ok(())
    }

    /// Base parameters for one page of the catalog grid (0-based).
    pub fn grid_params(&self, page_index: u32) -> BaseParams {
        BaseParams {
            count: self.grid.count.then_some(1),
            order: self.grid.order.clone(),
            keys: join_keys(&self.grid.keys),
            ..BaseParams::page(self.grid.page_size, page_index)
        }
    }

    /// Base parameters for a bulk-edit lookup.
    pub fn bulk_params(&self) -> BaseParams {
        BaseParams {
            count: Some(1),
            limit: Some(self.bulk_edit.max_records),
            keys: join_keys(&self.bulk_edit.keys),
            ..Default::default()
        }
    }
}

fn validate_keys(name: &str, keys: &[String]) -> Result<(), ConfigError> {
    for key in keys {
        if key.trim().is_empty() || key.contains(',') {
            return Err(ConfigError::Validation(format!(
                "{name} entries must be non-empty column names without commas, got {key:?}"
            )));
        }
    }
    Ok(())
}

fn join_keys(keys: &[String]) -> Option<String> {
    if keys.is_empty() {
        None
    } else {
        Some(keys.join(","))
    }
}

/// Catalog grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Books per page.
    pub page_size: u32,
    /// Whether to request the total match count alongside results.
    pub count: bool,
    /// Sort specification passed as `order`. `None` leaves ordering to the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Columns to select. Empty selects everything.
    pub keys: Vec<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: 40,
            count: true,
            order: None,
            keys: Vec::new(),
        }
    }
}

/// Bulk-edit lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BulkEditConfig {
    /// Maximum number of books a single bulk edit will fetch and update.
    pub max_records: u32,
    /// Columns fetched for each matching book.
    pub keys: Vec<String>,
}

impl Default for BulkEditConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            keys: vec!["objectId".to_string(), "title".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagsConfig {
    /// Literal tag predicates ANDed into every compiled query.
    pub extra: Vec<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock `[grid]`, `[bulk_edit]` and `[tags]` values as a TOML table, the
/// bottom layer every user `bookquery.toml` is merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(QueryConfig::default()).expect("default config must serialize")
}

/// Lay a user `bookquery.toml` over the stock defaults.
///
/// Sections merge key by key, so `[grid] page_size = 20` leaves `count` and
/// `order` alone. Arrays such as `bulk_edit.keys` or `tags.extra` are
/// replaced wholesale, never appended to.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut sections), toml::Value::Table(user)) => {
            for (key, user_val) in user {
                let merged = match sections.remove(&key) {
                    Some(stock_val) => merge_toml(stock_val, user_val),
                    None => user_val,
                };
                sections.insert(key, merged);
            }
            toml::Value::Table(sections)
        }
        (_, user) => user,
    }
}

/// Read a `bookquery.toml` without applying defaults.
///
/// A missing file is `Ok(None)`: running without a config is normal.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Apply the user layer (if any), then check the result can drive queries.
pub fn resolve_config(
    base: toml::Value,
    user: Option<toml::Value>,
) -> Result<QueryConfig, ConfigError> {
    let merged = user.map_or_else(|| base.clone(), |user| merge_toml(base.clone(), user));
    let config: QueryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is missing.
pub fn load_config(path: &Path) -> Result<QueryConfig, ConfigError> {
    let user = load_raw_config(path)?;
    if user.is_none() {
        log::debug!("no config at {}, using stock defaults", path.display());
    }
    resolve_config(stock_defaults_value(), user)
}

/// Returns a fully-commented stock `bookquery.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# bookquery Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Catalog grid
# ---------------------------------------------------------------------------
[grid]
# Books per page. Page N skips N * page_size books.
page_size = 40

# Ask the backend for the total number of matching books.
count = true

# Sort specification, e.g. "-createdAt" or "title".
# Omit to leave ordering to the backend.
# order = "-createdAt"

# Columns to return for each book. Empty returns all columns.
keys = []

# ---------------------------------------------------------------------------
# Moderator bulk edit
# ---------------------------------------------------------------------------
[bulk_edit]
# Upper bound on books a single bulk edit fetches and updates.
max_records = 10000

# Columns fetched for each matching book. objectId is needed for updates.
keys = ["objectId", "title"]

# ---------------------------------------------------------------------------
# Tags
# ---------------------------------------------------------------------------
[tags]
# Literal tags ANDed into every query, e.g. ["region:Pacific"].
extra = []
"##
}
