//! The Response shaper: turns a database
//! row into a `Record` that respects each column's declared type, and
//! assembles the `{data, total, next_cursor, limit}` list envelope.

use serde::Serialize;
use sqlx::any::AnyRow;
use sqlx::{Column as SqlxColumn, Row};

use crate::error::AppError;
use crate::models::{Collection, Record, RecordValue};

/// Scans one row into a `Record`, consulting the collection's schema for
/// every column present in the row rather than the database's reported
/// native type — the registry is the sole source of truth.
pub fn row_to_record(collection: &Collection, row: &AnyRow) -> Result<Record, AppError> {
    let mut record = Record::new();

    let id: String = row.try_get("id").map_err(sqlx::Error::from)?;
    record.insert("id", RecordValue::String(id));

    for col in row.columns() {
        let name = col.name();
        if name == "id" || name == "pkid" {
            continue;
        }
        let Some(declared) = collection.column(name) else {
            continue;
        };
        let value = scan_value(row, name, declared.r#type)?;
        record.insert(name, value);
    }

    Ok(record)
}

fn scan_value(
    row: &AnyRow,
    name: &str,
    ty: crate::models::ColumnType,
) -> Result<RecordValue, AppError> {
    use crate::models::ColumnType::*;

    macro_rules! nullable_get {
        ($t:ty) => {
            row.try_get::<Option<$t>, _>(name).map_err(sqlx::Error::from)?
        };
    }

    Ok(match ty {
        String | Datetime | Decimal => match nullable_get!(std::string::String) {
            Some(s) if ty == Datetime => RecordValue::Datetime(s),
            Some(s) if ty == Decimal => RecordValue::Decimal(s),
            Some(s) => RecordValue::String(s),
            None => RecordValue::Null,
        },
        Integer => match nullable_get!(i64) {
            Some(i) => RecordValue::Integer(i),
            None => RecordValue::Null,
        },
        Boolean => {
            // SQLite's `Any` driver surfaces booleans as 0/1 integers; try the
            // native bool decode first, fall back to integer.
            if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
                RecordValue::Boolean(b)
            } else {
                match nullable_get!(i64) {
                    Some(i) => RecordValue::Boolean(i != 0),
                    None => RecordValue::Null,
                }
            }
        }
        Json => match nullable_get!(std::string::String) {
            Some(s) => {
                let parsed: serde_json::Value = serde_json::from_str(&s)?;
                RecordValue::Json(parsed)
            }
            None => RecordValue::Null,
        },
    })
}

#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    pub data: Vec<Record>,
    pub total: i64,
    pub next_cursor: Option<String>,
    pub limit: u32,
}

/// Assembles the list envelope. `next_cursor` is emitted only when the
/// fetched page is exactly full.
pub fn build_list_envelope(rows: Vec<Record>, total: i64, limit: u32) -> ListEnvelope {
    let next_cursor = if rows.len() as u32 == limit {
        rows.last().and_then(|r| r.get("id")).and_then(|v| match v {
            RecordValue::String(s) => Some(s.clone()),
            _ => None,
        })
    } else {
        None
    };

    ListEnvelope {
        data: rows,
        total,
        next_cursor,
        limit,
    }
}
