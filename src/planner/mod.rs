//! The Query Planner & SQL Builder: turns structured filter,
//! sort, search, projection, and cursor inputs into parameterized SQL, one
//! dialect-neutral code path reused across SQLite/PostgreSQL/MySQL.
//!
//! Grounded on the `RawQuery` builder pattern from the `bottle-orm` example
//! (assembling a SQL string and an `AnyArguments`-compatible parameter list
//! side by side) generalized from one dialect to three via `Dialect`.

pub mod filter;
pub mod sort;

use crate::config::{LimitsSettings, PaginationSettings};
use crate::driver::{Dialect, SqlParam};
use crate::error::AppError;
use crate::models::{Collection, Record};

use filter::Filter;
use sort::SortField;

const RESERVED_QUERY_KEYS: &[&str] = &["sort", "fields", "q", "after", "limit", "field", "atomic"];

/// A ready-to-execute statement: SQL text plus its bound parameters, in
/// the order the placeholders appear.
pub struct Plan {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Everything a `:list` response needs: the row-fetching statement, the
/// matching `COUNT(*)` statement (same filters, no cursor/limit), whether a
/// cursor was supplied, and the effective limit (for `next_cursor` decisions
/// made by the response shaper).
pub struct ListPlan {
    pub select: Plan,
    pub count: Plan,
    pub fields: Vec<String>,
    pub limit: u32,
}

struct Placeholders {
    dialect: Dialect,
    n: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, n: 0 }
    }

    fn next(&mut self) -> String {
        self.n += 1;
        self.dialect.placeholder(self.n)
    }
}

fn find_column(collection: &Collection, name: &str) -> Option<crate::models::Column> {
    collection.column(name).cloned()
}

/// Renders the combined `filters AND search` fragment (no leading `WHERE`),
/// and its parameters. Empty when there is nothing to filter on.
fn render_predicate(
    dialect: Dialect,
    collection: &Collection,
    filters: &[Filter],
    search: Option<&str>,
    placeholders: &mut Placeholders,
) -> Result<(Option<String>, Vec<SqlParam>), AppError> {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for f in filters {
        let column = collection
            .column(&f.column)
            .expect("filter column validated during parsing");
        let col_sql = dialect.quote_ident(&f.column);
        match f.op {
            filter::FilterOp::IsNull => clauses.push(format!("{col_sql} IS NULL")),
            filter::FilterOp::NotNull => clauses.push(format!("{col_sql} IS NOT NULL")),
            filter::FilterOp::In => {
                let raw = f.raw_value.as_deref().unwrap_or_default();
                let values = filter::coerce_value(column, f.op, raw)?;
                let slots: Vec<String> = values.iter().map(|_| placeholders.next()).collect();
                clauses.push(format!("{col_sql} IN ({})", slots.join(", ")));
                params.extend(values);
            }
            filter::FilterOp::IContains => {
                let raw = f.raw_value.as_deref().unwrap_or_default();
                let values = filter::coerce_value(column, f.op, raw)?;
                let slot = placeholders.next();
                clauses.push(format!("LOWER({col_sql}) LIKE LOWER({slot})"));
                params.extend(values);
            }
            _ => {
                let raw = f.raw_value.as_deref().unwrap_or_default();
                let values = filter::coerce_value(column, f.op, raw)?;
                let slot = placeholders.next();
                let sql_op = match f.op {
                    filter::FilterOp::Eq => "=",
                    filter::FilterOp::Ne => "!=",
                    filter::FilterOp::Gt => ">",
                    filter::FilterOp::Lt => "<",
                    filter::FilterOp::Gte => ">=",
                    filter::FilterOp::Lte => "<=",
                    filter::FilterOp::Like
                    | filter::FilterOp::Contains
                    | filter::FilterOp::StartsWith
                    | filter::FilterOp::EndsWith => "LIKE",
                    _ => unreachable!(),
                };
                clauses.push(format!("{col_sql} {sql_op} {slot}"));
                params.extend(values);
            }
        }
    }

    if let Some(q) = search {
        let string_columns: Vec<_> = collection.string_columns().collect();
        if !string_columns.is_empty() {
            let pattern = format!("%{}%", filter::escape_like(q));
            let mut search_clauses = Vec::new();
            for column in string_columns {
                let slot = placeholders.next();
                search_clauses.push(format!("{} LIKE {slot}", dialect.quote_ident(&column.name)));
                params.push(SqlParam::Text(pattern.clone()));
            }
            clauses.push(format!("({})", search_clauses.join(" OR ")));
        }
    }

    if clauses.is_empty() {
        Ok((None, params))
    } else {
        Ok((Some(clauses.join(" AND ")), params))
    }
}

fn parse_fields(raw: Option<&str>, collection: &Collection) -> Result<Vec<String>, AppError> {
    let mut fields: Vec<String> = match raw {
        Some(raw) if !raw.trim().is_empty() => {
            let mut out = Vec::new();
            for name in raw.split(',').map(str::trim) {
                if name == "id" {
                    continue;
                }
                if collection.column(name).is_none() {
                    return Err(AppError::validation(
                        "fields",
                        format!("collection '{}' has no column '{name}'", collection.name),
                    ));
                }
                out.push(name.to_string());
            }
            out
        }
        _ => collection.columns.iter().map(|c| c.name.clone()).collect(),
    };
    fields.retain(|f| f != "id");
    let mut projected = vec!["id".to_string()];
    projected.append(&mut fields);
    Ok(projected)
}

fn query_param(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// Builds the `:list` statement pair from raw query-string pairs.
pub fn build_list(
    dialect: Dialect,
    collection: &Collection,
    pairs: &[(String, String)],
    pagination: &PaginationSettings,
    limits: &LimitsSettings,
) -> Result<ListPlan, AppError> {
    let fields = parse_fields(query_param(pairs, "fields").as_deref(), collection)?;
    let search = query_param(pairs, "q");
    let sort_fields = sort::parse_sort(
        query_param(pairs, "sort").as_deref(),
        collection,
        limits.max_sort_fields_per_request,
    )?;
    let filters = filter::parse_filters(
        pairs,
        &collection.name,
        |name| find_column(collection, name),
        limits.max_filters_per_request,
        RESERVED_QUERY_KEYS,
    )?;

    let limit = match query_param(pairs, "limit") {
        Some(raw) => {
            let parsed: u32 = raw
                .parse()
                .map_err(|_| AppError::validation("limit", "limit must be a positive integer"))?;
            if parsed > pagination.max_page_size {
                return Err(AppError::page_size_exceeded(parsed, pagination.max_page_size));
            }
            parsed.max(1)
        }
        None => pagination.default_page_size,
    };

    let mut count_placeholders = Placeholders::new(dialect);
    let (predicate, count_params) = render_predicate(
        dialect,
        collection,
        &filters,
        search.as_deref(),
        &mut count_placeholders,
    )?;

    let table = dialect.quote_ident(&collection.name);
    let count_sql = match &predicate {
        Some(p) => format!("SELECT COUNT(*) AS total FROM {table} WHERE {p}"),
        None => format!("SELECT COUNT(*) AS total FROM {table}"),
    };

    let mut select_placeholders = Placeholders::new(dialect);
    let (select_predicate, mut select_params) = render_predicate(
        dialect,
        collection,
        &filters,
        search.as_deref(),
        &mut select_placeholders,
    )?;

    let mut where_parts: Vec<String> = select_predicate.into_iter().collect();
    if let Some(after) = query_param(pairs, "after") {
        let canonical = crate::ulid::canonicalize(&after)
            .ok_or_else(|| AppError::invalid_ulid(&after))?;
        let slot = select_placeholders.next();
        where_parts.push(format!("{} > {slot}", dialect.quote_ident("id")));
        select_params.push(SqlParam::Text(canonical));
    }

    let select_column_list: Vec<String> = fields
        .iter()
        .map(|f| dialect.quote_ident(f))
        .collect();
    let order_by = sort::render_order_by(dialect, &sort_fields);

    let mut select_sql = format!(
        "SELECT {} FROM {table}",
        select_column_list.join(", ")
    );
    if !where_parts.is_empty() {
        select_sql.push_str(" WHERE ");
        select_sql.push_str(&where_parts.join(" AND "));
    }
    select_sql.push(' ');
    select_sql.push_str(&order_by);
    select_sql.push_str(&format!(" LIMIT {limit}"));

    Ok(ListPlan {
        select: Plan {
            sql: select_sql,
            params: select_params,
        },
        count: Plan {
            sql: count_sql,
            params: count_params,
        },
        fields,
        limit,
    })
}

pub fn build_get(dialect: Dialect, collection: &Collection, id: &str) -> Plan {
    let columns: Vec<String> = std::iter::once("id".to_string())
        .chain(collection.columns.iter().map(|c| c.name.clone()))
        .map(|c| dialect.quote_ident(&c))
        .collect();
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        columns.join(", "),
        dialect.quote_ident(&collection.name),
        dialect.quote_ident("id"),
        dialect.placeholder(1)
    );
    Plan {
        sql,
        params: vec![SqlParam::Text(id.to_string())],
    }
}

pub fn build_insert(dialect: Dialect, collection: &Collection, id: &str, record: &Record) -> Plan {
    let mut columns = vec!["id".to_string()];
    let mut params = vec![SqlParam::Text(id.to_string())];

    for column in &collection.columns {
        if let Some(value) = record.get(&column.name) {
            columns.push(column.name.clone());
            params.push(record_value_to_param(value));
        }
    }

    let mut placeholders = Placeholders::new(dialect);
    let slots: Vec<String> = columns.iter().map(|_| placeholders.next()).collect();
    let quoted: Vec<String> = columns.iter().map(|c| dialect.quote_ident(c)).collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(&collection.name),
        quoted.join(", "),
        slots.join(", ")
    );
    if dialect.supports_returning() {
        sql.push_str(" RETURNING pkid");
    }

    Plan { sql, params }
}

pub fn build_update(
    dialect: Dialect,
    collection: &Collection,
    id: &str,
    record: &Record,
) -> Result<Plan, AppError> {
    if record.0.is_empty() {
        return Err(AppError::validation_generic(
            "update payload must set at least one field",
        ));
    }

    let mut placeholders = Placeholders::new(dialect);
    let mut set_clauses = Vec::new();
    let mut params = Vec::new();

    for column in &collection.columns {
        if let Some(value) = record.get(&column.name) {
            let slot = placeholders.next();
            set_clauses.push(format!("{} = {slot}", dialect.quote_ident(&column.name)));
            params.push(record_value_to_param(value));
        }
    }

    let id_slot = placeholders.next();
    params.push(SqlParam::Text(id.to_string()));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {id_slot}",
        dialect.quote_ident(&collection.name),
        set_clauses.join(", "),
        dialect.quote_ident("id")
    );

    Ok(Plan { sql, params })
}

pub fn build_delete(dialect: Dialect, collection: &Collection, id: &str) -> Plan {
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        dialect.quote_ident(&collection.name),
        dialect.quote_ident("id"),
        dialect.placeholder(1)
    );
    Plan {
        sql,
        params: vec![SqlParam::Text(id.to_string())],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "count" => AggregateOp::Count,
            "sum" => AggregateOp::Sum,
            "avg" => AggregateOp::Avg,
            "min" => AggregateOp::Min,
            "max" => AggregateOp::Max,
            _ => return None,
        })
    }

    fn as_sql(self) -> &'static str {
        match self {
            AggregateOp::Count => "COUNT",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
        }
    }
}

/// Builds `:count|:sum|:avg|:min|:max`. Everything but `count` requires a
/// `field` naming an `integer` or `decimal` column.
pub fn build_aggregate(
    dialect: Dialect,
    collection: &Collection,
    op: AggregateOp,
    field: Option<&str>,
    pairs: &[(String, String)],
    limits: &LimitsSettings,
) -> Result<Plan, AppError> {
    use crate::models::ColumnType;

    let expr = if op == AggregateOp::Count {
        "COUNT(*)".to_string()
    } else {
        let field_name = field.ok_or_else(|| {
            AppError::validation("field", format!("{} requires a 'field' parameter", op.as_sql()))
        })?;
        let column = collection.column(field_name).ok_or_else(|| {
            AppError::validation(
                "field",
                format!("collection '{}' has no column '{field_name}'", collection.name),
            )
        })?;
        if !matches!(column.r#type, ColumnType::Integer | ColumnType::Decimal) {
            return Err(AppError::validation(
                "field",
                format!("'{field_name}' must be integer or decimal to aggregate"),
            ));
        }
        format!("{}({})", op.as_sql(), dialect.quote_ident(field_name))
    };

    let filters = filter::parse_filters(
        pairs,
        &collection.name,
        |name| find_column(collection, name),
        limits.max_filters_per_request,
        RESERVED_QUERY_KEYS,
    )?;

    let mut placeholders = Placeholders::new(dialect);
    let (predicate, params) =
        render_predicate(dialect, collection, &filters, None, &mut placeholders)?;

    let table = dialect.quote_ident(&collection.name);
    let sql = match predicate {
        Some(p) => format!("SELECT {expr} AS value FROM {table} WHERE {p}"),
        None => format!("SELECT {expr} AS value FROM {table}"),
    };

    Ok(Plan { sql, params })
}

fn record_value_to_param(value: &crate::models::RecordValue) -> SqlParam {
    use crate::models::RecordValue as V;
    match value {
        V::String(s) | V::Datetime(s) | V::Decimal(s) => SqlParam::Text(s.clone()),
        V::Integer(i) => SqlParam::Int(*i),
        V::Boolean(b) => SqlParam::Bool(*b),
        V::Json(j) => SqlParam::Text(j.to_string()),
        V::Null => SqlParam::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitsSettings, PaginationSettings};
    use crate::models::{Column, ColumnType};

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
            ],
        }
    }

    fn pagination() -> PaginationSettings {
        PaginationSettings {
            default_page_size: 15,
            max_page_size: 200,
        }
    }

    fn limits() -> LimitsSettings {
        LimitsSettings {
            max_collections: 1000,
            max_columns_per_collection: 100,
            max_filters_per_request: 20,
            max_sort_fields_per_request: 5,
        }
    }

    #[test]
    fn builds_list_with_filter_and_sort() {
        let pairs = vec![
            ("price[gt]".to_string(), "1000".to_string()),
            ("sort".to_string(), "-price".to_string()),
        ];
        let plan = build_list(
            Dialect::Postgres,
            &products(),
            &pairs,
            &pagination(),
            &limits(),
        )
        .unwrap();
        assert!(plan.select.sql.contains("\"price\" > $1"));
        assert!(plan.select.sql.contains("ORDER BY \"price\" DESC, \"id\" ASC"));
        assert!(!plan.count.sql.contains("LIMIT"));
    }

    #[test]
    fn rejects_limit_above_max_page_size() {
        let pairs = vec![("limit".to_string(), "500".to_string())];
        assert!(build_list(Dialect::Sqlite, &products(), &pairs, &pagination(), &limits()).is_err());
    }

    #[test]
    fn aggregate_requires_field_for_sum() {
        let limits = limits();
        let result = build_aggregate(Dialect::Sqlite, &products(), AggregateOp::Sum, None, &[], &limits);
        assert!(result.is_err());
    }

    #[test]
    fn aggregate_count_needs_no_field() {
        let limits = limits();
        let plan =
            build_aggregate(Dialect::Sqlite, &products(), AggregateOp::Count, None, &[], &limits)
                .unwrap();
        assert!(plan.sql.contains("COUNT(*)"));
    }

    #[test]
    fn build_insert_uses_returning_on_postgres() {
        let mut record = Record::new();
        record.insert("title", crate::models::RecordValue::String("x".into()));
        record.insert("price", crate::models::RecordValue::Decimal("1.00".into()));
        let plan = build_insert(Dialect::Postgres, &products(), "01ARZ3NDEKTSV4RRFFQ69G5FAV", &record);
        assert!(plan.sql.contains("RETURNING pkid"));
    }
}
