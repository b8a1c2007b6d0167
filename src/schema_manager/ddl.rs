use crate::driver::Dialect;
use crate::models::{Column, ColumnType};

fn quoted_default(column: &Column, raw: &str) -> String {
    match column.r#type {
        ColumnType::Integer | ColumnType::Decimal | ColumnType::Boolean => raw.to_string(),
        ColumnType::String | ColumnType::Datetime | ColumnType::Json => {
            let escaped = raw.replace('\'', "''");
            format!("'{escaped}'")
        }
    }
}

fn column_clause(dialect: Dialect, column: &Column) -> String {
    let mut clause = format!(
        "{} {}",
        dialect.quote_ident(&column.name),
        dialect.native_type(column.r#type)
    );
    if !column.nullable {
        clause.push_str(" NOT NULL");
    }
    if column.unique {
        clause.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default_value {
        clause.push_str(" DEFAULT ");
        clause.push_str(&quoted_default(column, default));
    }
    clause
}

/// Renders `CREATE TABLE` for a brand-new collection, injecting the two
/// system columns. Each dialect spells auto-increment
/// differently; everything else (column clauses, the `id` unique
/// constraint) is shared.
pub fn create_table(dialect: Dialect, table: &str, columns: &[Column]) -> String {
    let table_q = dialect.quote_ident(table);
    let id_q = dialect.quote_ident("id");
    let pkid_q = dialect.quote_ident("pkid");

    let pkid_clause = match dialect {
        Dialect::Sqlite => format!("{pkid_q} INTEGER PRIMARY KEY AUTOINCREMENT"),
        Dialect::Postgres => format!("{pkid_q} BIGSERIAL PRIMARY KEY"),
        Dialect::MySql => format!("{pkid_q} BIGINT AUTO_INCREMENT PRIMARY KEY"),
    };

    let id_type = match dialect {
        Dialect::MySql => "VARCHAR(26)".to_string(),
        _ => "TEXT".to_string(),
    };
    let id_clause = format!("{id_q} {id_type} NOT NULL UNIQUE");

    let mut defs = vec![pkid_clause, id_clause];
    defs.extend(columns.iter().map(|c| column_clause(dialect, c)));

    format!("CREATE TABLE {table_q} ({})", defs.join(", "))
}

pub fn drop_table(dialect: Dialect, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", dialect.quote_ident(table))
}

pub fn add_column(dialect: Dialect, table: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        dialect.quote_ident(table),
        column_clause(dialect, column)
    )
}

pub fn drop_column(dialect: Dialect, table: &str, column_name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        dialect.quote_ident(table),
        dialect.quote_ident(column_name)
    )
}

pub fn rename_column(dialect: Dialect, table: &str, old_name: &str, new_name: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        dialect.quote_ident(table),
        dialect.quote_ident(old_name),
        dialect.quote_ident(new_name)
    )
}

/// Statements to change an existing column's type/nullability. SQLite has no
/// native `ALTER COLUMN`; modify on SQLite is instead handled by the
/// table-rebuild path in `schema_manager::rebuild` and never reaches here.
pub fn modify_column(dialect: Dialect, table: &str, column: &Column) -> Vec<String> {
    let table_q = dialect.quote_ident(table);
    let col_q = dialect.quote_ident(&column.name);
    match dialect {
        Dialect::Postgres => {
            let native = dialect.native_type(column.r#type);
            let mut stmts = vec![format!(
                "ALTER TABLE {table_q} ALTER COLUMN {col_q} TYPE {native} USING {col_q}::{native}"
            )];
            stmts.push(if column.nullable {
                format!("ALTER TABLE {table_q} ALTER COLUMN {col_q} DROP NOT NULL")
            } else {
                format!("ALTER TABLE {table_q} ALTER COLUMN {col_q} SET NOT NULL")
            });
            stmts
        }
        Dialect::MySql => {
            vec![format!(
                "ALTER TABLE {table_q} MODIFY COLUMN {}",
                column_clause(dialect, column)
            )]
        }
        Dialect::Sqlite => unreachable!("sqlite modify is handled via table rebuild"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnType;

    fn col(name: &str, ty: ColumnType, nullable: bool) -> Column {
        Column {
            name: name.into(),
            r#type: ty,
            nullable,
            unique: false,
            default_value: None,
        }
    }

    #[test]
    fn create_table_injects_system_columns_sqlite() {
        let sql = create_table(
            Dialect::Sqlite,
            "products",
            &[col("title", ColumnType::String, false)],
        );
        assert!(sql.contains("\"pkid\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"id\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"title\" TEXT NOT NULL"));
    }

    #[test]
    fn create_table_postgres_uses_bigserial() {
        let sql = create_table(Dialect::Postgres, "products", &[]);
        assert!(sql.contains("\"pkid\" BIGSERIAL PRIMARY KEY"));
    }

    #[test]
    fn create_table_mysql_quotes_with_backticks() {
        let sql = create_table(Dialect::MySql, "products", &[]);
        assert!(sql.starts_with("CREATE TABLE `products`"));
        assert!(sql.contains("`pkid` BIGINT AUTO_INCREMENT PRIMARY KEY"));
    }

    #[test]
    fn rename_column_sql() {
        assert_eq!(
            rename_column(Dialect::Postgres, "products", "stock", "quantity"),
            "ALTER TABLE \"products\" RENAME COLUMN \"stock\" TO \"quantity\""
        );
    }
}
