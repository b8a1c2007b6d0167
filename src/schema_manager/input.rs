use serde::Deserialize;

use crate::error::AppError;
use crate::models::collection::validate_column_name;
use crate::models::{Column, ColumnType};

/// The wire shape of a column in `collections:create`/`collections:update`
/// payloads. `type` is a raw string here (not `ColumnType`) so that the
/// deprecated `text`/`float` aliases can be rejected with a
/// specific message instead of a generic "unknown variant" serde error.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInput {
    pub name: String,
    pub r#type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnInput {
    pub fn into_column(self) -> Result<Column, AppError> {
        validate_column_name(&self.name)?;
        let r#type = parse_column_type(&self.name, &self.r#type)?;
        Ok(Column {
            name: self.name,
            r#type,
            nullable: self.nullable,
            unique: self.unique,
            default_value: self.default_value,
        })
    }
}

pub fn parse_column_type(column_name: &str, raw: &str) -> Result<ColumnType, AppError> {
    match raw {
        "string" => Ok(ColumnType::String),
        "integer" => Ok(ColumnType::Integer),
        "boolean" => Ok(ColumnType::Boolean),
        "datetime" => Ok(ColumnType::Datetime),
        "json" => Ok(ColumnType::Json),
        "decimal" => Ok(ColumnType::Decimal),
        "text" | "float" => Err(AppError::validation(
            "columns",
            format!(
                "column '{column_name}' uses the deprecated type '{raw}'; use 'string' or 'decimal' instead"
            ),
        )),
        other => Err(AppError::validation(
            "columns",
            format!("column '{column_name}' has unknown type '{other}'"),
        )),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameColumnInput {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCollectionInput {
    pub name: String,
    #[serde(default)]
    pub add_columns: Vec<ColumnInput>,
    #[serde(default)]
    pub remove_columns: Vec<String>,
    #[serde(default)]
    pub rename_columns: Vec<RenameColumnInput>,
    #[serde(default)]
    pub modify_columns: Vec<ColumnInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollectionInput {
    pub name: String,
    pub columns: Vec<ColumnInput>,
}
