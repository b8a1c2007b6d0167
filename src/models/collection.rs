use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::AppError;
use crate::models::{is_system_column, RESERVED_NAMES, RESERVED_PREFIX};

/// A small, deliberately non-exhaustive set of ANSI/dialect reserved words. A
/// collection or column name that collides with one of these is rejected at
/// validation time rather than relying on a dialect to reject it at DDL time,
/// since dialects disagree on what is actually reserved.
static SQL_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "create", "alter", "table", "from", "where",
    "join", "union", "order", "group", "having", "limit", "offset", "values", "into", "set",
    "index", "view", "trigger", "primary", "key", "foreign", "references", "constraint",
    "unique", "null", "not", "and", "or", "as", "on", "by", "asc", "desc", "distinct", "between",
    "like", "in", "is", "exists", "case", "when", "then", "else", "end", "cast", "default",
    "check", "grant", "revoke", "commit", "rollback", "transaction", "begin", "declare",
    "procedure", "function", "trigger", "database", "schema", "column", "add", "user", "to",
    "all", "any", "with", "for", "returning", "cross", "natural", "using", "outer", "inner",
    "left", "right", "full",
];

static COLLECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("valid regex"));
static COLUMN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid regex"));

pub fn validate_collection_name(name: &str) -> Result<String, AppError> {
    if name.len() < 2 || name.len() > 63 {
        return Err(AppError::validation(
            "name",
            "collection name must be between 2 and 63 characters",
        ));
    }
    if !COLLECTION_NAME_RE.is_match(name) {
        return Err(AppError::validation(
            "name",
            "collection name must match ^[a-zA-Z][a-zA-Z0-9_]*$",
        ));
    }
    let lower = name.to_lowercase();
    if RESERVED_NAMES.contains(&lower.as_str()) {
        return Err(AppError::validation(
            "name",
            format!("'{lower}' is a reserved endpoint name"),
        ));
    }
    if lower.starts_with(RESERVED_PREFIX) {
        return Err(AppError::validation(
            "name",
            format!("collection names may not start with '{RESERVED_PREFIX}'"),
        ));
    }
    if SQL_KEYWORDS.contains(&lower.as_str()) {
        return Err(AppError::validation(
            "name",
            format!("'{lower}' is a SQL keyword"),
        ));
    }
    Ok(lower)
}

pub fn validate_column_name(name: &str) -> Result<(), AppError> {
    if name.len() < 3 || name.len() > 63 {
        return Err(AppError::validation(
            "columns",
            format!("column name '{name}' must be between 3 and 63 characters"),
        ));
    }
    if !COLUMN_NAME_RE.is_match(name) {
        return Err(AppError::validation(
            "columns",
            format!("column name '{name}' must match ^[a-z][a-z0-9_]*$"),
        ));
    }
    if is_system_column(name) {
        return Err(AppError::validation(
            "columns",
            format!("'{name}' is a reserved system column"),
        ));
    }
    if SQL_KEYWORDS.contains(&name) {
        return Err(AppError::validation(
            "columns",
            format!("'{name}' is a SQL keyword"),
        ));
    }
    Ok(())
}

/// The closed set of column types this core understands. `text` and `float`
/// are deliberately absent: they were accepted by an earlier, deprecated
/// iteration and are now rejected explicitly by the Schema Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Integer,
    Boolean,
    Datetime,
    Json,
    Decimal,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Datetime => "datetime",
            ColumnType::Json => "json",
            ColumnType::Decimal => "decimal",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// The authoritative, dialect-neutral description of one managed collection.
/// This is the only thing the planner and validator consult when deciding
/// whether a request is well-formed — they never
/// probe the database to learn a column's type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Collection {
    /// All user-declared columns plus the two system columns, in the order a
    /// `SELECT *` (minus `pkid`) should project them: `id` first, then
    /// declared columns in their stored order.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == "id" || name == "pkid" || self.column(name).is_some()
    }

    pub fn string_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.r#type == ColumnType::String)
    }

    pub fn column_names(&self) -> HashSet<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
