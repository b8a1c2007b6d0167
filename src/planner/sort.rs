use crate::error::AppError;
use crate::models::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortField {
    pub column: String,
    pub direction: SortDirection,
}

/// Parses `sort=-price,title` into validated sort fields, appending a
/// stable `id ASC` tie-breaker unless `id` is already present, so cursor
/// pagination stays stable across pages.
pub fn parse_sort(
    raw: Option<&str>,
    collection: &Collection,
    max_sort_fields: usize,
) -> Result<Vec<SortField>, AppError> {
    let mut fields = Vec::new();
    if let Some(raw) = raw {
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (column, direction) = if let Some(stripped) = part.strip_prefix('-') {
                (stripped, SortDirection::Desc)
            } else {
                (part, SortDirection::Asc)
            };
            if column != "id" && collection.column(column).is_none() {
                return Err(AppError::validation(
                    "sort",
                    format!("collection '{}' has no column '{column}'", collection.name),
                ));
            }
            fields.push(SortField {
                column: column.to_string(),
                direction,
            });
        }
    }

    if fields.len() > max_sort_fields {
        return Err(AppError::validation(
            "sort",
            format!("at most {max_sort_fields} sort fields are allowed per request"),
        ));
    }

    if !fields.iter().any(|f| f.column == "id") {
        fields.push(SortField {
            column: "id".to_string(),
            direction: SortDirection::Asc,
        });
    }

    Ok(fields)
}

pub fn render_order_by(dialect: crate::driver::Dialect, fields: &[SortField]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", dialect.quote_ident(&f.column), f.direction.as_sql()))
        .collect();
    format!("ORDER BY {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnType};

    fn collection() -> Collection {
        Collection {
            name: "products".into(),
            columns: vec![Column {
                name: "price".into(),
                r#type: ColumnType::Decimal,
                nullable: false,
                unique: false,
                default_value: None,
            }],
        }
    }

    #[test]
    fn appends_id_tie_breaker_when_absent() {
        let fields = parse_sort(Some("-price"), &collection(), 5).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].column, "id");
        assert_eq!(fields[1].direction, SortDirection::Asc);
    }

    #[test]
    fn does_not_duplicate_explicit_id_sort() {
        let fields = parse_sort(Some("id"), &collection(), 5).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn rejects_unknown_column() {
        assert!(parse_sort(Some("bogus"), &collection(), 5).is_err());
    }

    #[test]
    fn rejects_too_many_fields() {
        assert!(parse_sort(Some("price,-price,price,price"), &collection(), 2).is_err());
    }
}
