//! The Validator: turns a JSON payload into a `Record`
//! conforming to a collection's declared schema — verifying declared
//! columns exist, coercing JSON-native types to the column type, and
//! rejecting anything the schema doesn't know about.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;

use crate::error::AppError;
use crate::models::{Collection, ColumnType, Record, RecordValue};

/// `^-?\d+(\.\d{1,10})?$` — a decimal's wire representation, scale capped at
/// 10 fractional digits.
pub static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d{1,10})?$").expect("valid regex"));

/// Validates and coerces a create/update payload object against `collection`.
/// `partial`: when true (update), fields absent from `body` are simply
/// skipped rather than treated as null — only fields the caller actually
/// sent are coerced and returned.
pub fn coerce_payload(
    collection: &Collection,
    body: &Json,
    partial: bool,
) -> Result<Record, AppError> {
    let object = body.as_object().ok_or_else(|| {
        AppError::validation_generic("record payload must be a JSON object")
    })?;

    for key in object.keys() {
        if key == "id" || key == "pkid" {
            return Err(AppError::validation(
                key.clone(),
                format!("'{key}' is a system column and may not be set by the client"),
            ));
        }
        if collection.column(key).is_none() {
            return Err(AppError::validation(
                "fields",
                format!(
                    "collection '{}' has no column '{key}'",
                    collection.name
                ),
            ));
        }
    }

    let mut record = Record::new();
    for column in &collection.columns {
        let value = object.get(&column.name);
        match value {
            None => {
                if partial {
                    continue;
                }
                if !column.nullable && column.default_value.is_none() {
                    return Err(AppError::validation(
                        column.name.clone(),
                        format!("column '{}' is required", column.name),
                    ));
                }
                continue;
            }
            Some(Json::Null) => {
                if !column.nullable {
                    return Err(AppError::validation(
                        column.name.clone(),
                        format!("column '{}' is not nullable", column.name),
                    ));
                }
                record.insert(column.name.clone(), RecordValue::Null);
            }
            Some(json_value) => {
                let coerced = coerce_value(column.r#type, &column.name, json_value)?;
                record.insert(column.name.clone(), coerced);
            }
        }
    }

    Ok(record)
}

fn coerce_value(ty: ColumnType, column_name: &str, value: &Json) -> Result<RecordValue, AppError> {
    match ty {
        ColumnType::String => match value {
            Json::String(s) => Ok(RecordValue::String(s.clone())),
            _ => Err(type_error(column_name, ty, value)),
        },
        ColumnType::Integer => match value {
            Json::Number(n) => n
                .as_i64()
                .map(RecordValue::Integer)
                .ok_or_else(|| type_error(column_name, ty, value)),
            Json::String(s) => s
                .parse::<i64>()
                .map(RecordValue::Integer)
                .map_err(|_| type_error(column_name, ty, value)),
            _ => Err(type_error(column_name, ty, value)),
        },
        ColumnType::Boolean => match value {
            Json::Bool(b) => Ok(RecordValue::Boolean(*b)),
            _ => Err(type_error(column_name, ty, value)),
        },
        ColumnType::Datetime => match value {
            Json::String(s) => {
                chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|_| type_error(column_name, ty, value))?;
                Ok(RecordValue::Datetime(s.clone()))
            }
            _ => Err(type_error(column_name, ty, value)),
        },
        ColumnType::Decimal => match value {
            Json::String(s) if DECIMAL_RE.is_match(s) => Ok(RecordValue::Decimal(s.clone())),
            Json::Number(n) if DECIMAL_RE.is_match(&n.to_string()) => {
                Ok(RecordValue::Decimal(n.to_string()))
            }
            _ => Err(AppError::validation(
                column_name.to_string(),
                format!(
                    "column '{column_name}' must be a decimal string matching ^-?\\d+(\\.\\d{{1,10}})?$"
                ),
            )),
        },
        ColumnType::Json => Ok(RecordValue::Json(value.clone())),
    }
}

fn type_error(column_name: &str, ty: ColumnType, value: &Json) -> AppError {
    AppError::validation(
        column_name.to_string(),
        format!("column '{column_name}' expects a {ty}, got {value}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;
    use serde_json::json;

    fn products() -> Collection {
        Collection {
            name: "products".into(),
            columns: vec![
                Column {
                    name: "title".into(),
                    r#type: ColumnType::String,
                    nullable: false,
                    unique: false,
                    default_value: None,
                },
                Column {
                    name: "price".into(),
                    r#type: ColumnType::Decimal,
                    nullable: false,
                    unique: false,
                    default_value: None,
                },
                Column {
                    name: "stock".into(),
                    r#type: ColumnType::Integer,
                    nullable: true,
                    unique: false,
                    default_value: None,
                },
            ],
        }
    }

    #[test]
    fn coerces_valid_payload() {
        let body = json!({"title": "Laptop", "price": "1299.99", "stock": 50});
        let record = coerce_payload(&products(), &body, false).unwrap();
        assert_eq!(
            record.get("price"),
            Some(&RecordValue::Decimal("1299.99".into()))
        );
    }

    #[test]
    fn rejects_unknown_field() {
        let body = json!({"title": "Laptop", "price": "1.00", "bogus": 1});
        assert!(coerce_payload(&products(), &body, false).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        let body = json!({"title": "Laptop"});
        assert!(coerce_payload(&products(), &body, false).is_err());
    }

    #[test]
    fn partial_update_skips_absent_fields() {
        let body = json!({"stock": 5});
        let record = coerce_payload(&products(), &body, true).unwrap();
        assert!(record.get("title").is_none());
        assert_eq!(record.get("stock"), Some(&RecordValue::Integer(5)));
    }

    #[test]
    fn rejects_malformed_decimal() {
        let body = json!({"title": "Laptop", "price": "12.999999999999", "stock": 1});
        assert!(coerce_payload(&products(), &body, false).is_err());
    }

    #[test]
    fn rejects_setting_system_columns() {
        let body = json!({"id": "01ARZ3NDEKTSV4RRFFQ69G5FAV"});
        assert!(coerce_payload(&products(), &body, true).is_err());
    }
}
