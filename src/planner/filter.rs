use crate::driver::SqlParam;
use crate::error::AppError;
use crate::models::{Column, ColumnType};

/// The closed set of filter operators. `column[op]=value` in
/// a query string; a bare `column=value` is shorthand for `eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    In,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    IsNull,
    NotNull,
}

impl FilterOp {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "lt" => FilterOp::Lt,
            "gte" => FilterOp::Gte,
            "lte" => FilterOp::Lte,
            "like" => FilterOp::Like,
            "in" => FilterOp::In,
            "contains" => FilterOp::Contains,
            "icontains" => FilterOp::IContains,
            "startswith" => FilterOp::StartsWith,
            "endswith" => FilterOp::EndsWith,
            "null" => FilterOp::IsNull,
            "notnull" => FilterOp::NotNull,
            _ => return None,
        })
    }

    fn takes_value(self) -> bool {
        !matches!(self, FilterOp::IsNull | FilterOp::NotNull)
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub raw_value: Option<String>,
}

/// Splits a query key into `(column, op)`. `price[gt]` -> `("price", Gt)`;
/// a bare `price` -> `("price", Eq)`. Keys that don't name a recognized
/// filter shape (`sort`, `fields`, `q`, `after`, `limit`, `field`) are the
/// caller's responsibility to exclude before calling this.
fn split_key(key: &str) -> (String, FilterOp) {
    if let Some(stripped) = key.strip_suffix(']') {
        if let Some(idx) = stripped.find('[') {
            let column = &stripped[..idx];
            let op_str = &stripped[idx + 1..];
            if let Some(op) = FilterOp::parse(op_str) {
                return (column.to_string(), op);
            }
        }
    }
    (key.to_string(), FilterOp::Eq)
}

/// Parses raw query-string pairs into filters, validating column existence,
/// operator count, and per-column type coercion along the way.
/// `reserved_keys` are query keys that name something other than a
/// filter (`sort`, `fields`, `q`, `after`, `limit`, `field`, `atomic`) and
/// are skipped.
pub fn parse_filters(
    pairs: &[(String, String)],
    collection_name: &str,
    find_column: impl Fn(&str) -> Option<Column>,
    max_filters: usize,
    reserved_keys: &[&str],
) -> Result<Vec<Filter>, AppError> {
    let mut filters = Vec::new();
    for (key, value) in pairs {
        if reserved_keys.contains(&key.as_str()) {
            continue;
        }
        let (column_name, op) = split_key(key);
        let column = find_column(&column_name).ok_or_else(|| {
            AppError::validation(
                "filters",
                format!("collection '{collection_name}' has no column '{column_name}'"),
            )
        })?;
        let raw_value = if op.takes_value() {
            Some(value.clone())
        } else {
            None
        };
        filters.push(Filter {
            column: column.name.clone(),
            op,
            raw_value,
        });
    }

    if filters.len() > max_filters {
        return Err(AppError::validation(
            "filters",
            format!("at most {max_filters} filters are allowed per request"),
        ));
    }

    Ok(filters)
}

/// Escapes LIKE metacharacters in a user-supplied value before it is
/// wrapped into a pattern.
pub fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Coerces a raw filter value against the column's declared type, producing
/// the bound parameter(s) `op`'s SQL fragment needs. `IN` may yield more
/// than one parameter; every other operator yields exactly one.
pub fn coerce_value(column: &Column, op: FilterOp, raw: &str) -> Result<Vec<SqlParam>, AppError> {
    match op {
        FilterOp::Like | FilterOp::Contains | FilterOp::IContains | FilterOp::StartsWith
        | FilterOp::EndsWith => {
            let escaped = escape_like(raw);
            let pattern = match op {
                FilterOp::Contains | FilterOp::IContains => format!("%{escaped}%"),
                FilterOp::StartsWith => format!("{escaped}%"),
                FilterOp::EndsWith => format!("%{escaped}"),
                FilterOp::Like => escaped,
                _ => unreachable!(),
            };
            Ok(vec![SqlParam::Text(pattern)])
        }
        FilterOp::In => {
            let mut params = Vec::new();
            for part in raw.split(',') {
                params.push(coerce_scalar(column, part.trim())?);
            }
            if params.is_empty() {
                return Err(AppError::validation(
                    "filters",
                    format!("'in' filter on '{}' must not be empty", column.name),
                ));
            }
            Ok(params)
        }
        _ => Ok(vec![coerce_scalar(column, raw)?]),
    }
}

fn coerce_scalar(column: &Column, raw: &str) -> Result<SqlParam, AppError> {
    match column.r#type {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(SqlParam::Int)
            .map_err(|_| type_error(column, raw)),
        ColumnType::Boolean => match raw {
            "true" | "1" => Ok(SqlParam::Bool(true)),
            "false" | "0" => Ok(SqlParam::Bool(false)),
            _ => Err(type_error(column, raw)),
        },
        ColumnType::Decimal => {
            if crate::validator::DECIMAL_RE.is_match(raw) {
                Ok(SqlParam::Text(raw.to_string()))
            } else {
                Err(type_error(column, raw))
            }
        }
        ColumnType::String | ColumnType::Datetime | ColumnType::Json => {
            Ok(SqlParam::Text(raw.to_string()))
        }
    }
}

fn type_error(column: &Column, raw: &str) -> AppError {
    AppError::validation(
        "filters",
        format!(
            "value '{raw}' is not a valid {} for column '{}'",
            column.r#type, column.name
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_bracketed_operator_keys() {
        assert_eq!(split_key("price[gt]").0, "price");
        assert!(matches!(split_key("price[gt]").1, FilterOp::Gt));
        assert_eq!(split_key("title").0, "title");
        assert!(matches!(split_key("title").1, FilterOp::Eq));
    }

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn rejects_non_integer_for_integer_column() {
        let col = Column {
            name: "stock".into(),
            r#type: ColumnType::Integer,
            nullable: false,
            unique: false,
            default_value: None,
        };
        assert!(coerce_value(&col, FilterOp::Gt, "abc").is_err());
    }

    #[test]
    fn in_filter_expands_comma_separated_values() {
        let col = Column {
            name: "stock".into(),
            r#type: ColumnType::Integer,
            nullable: false,
            unique: false,
            default_value: None,
        };
        let params = coerce_value(&col, FilterOp::In, "1, 2,3").unwrap();
        assert_eq!(params.len(), 3);
    }
}
