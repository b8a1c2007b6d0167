use std::fmt;

/// The SQL flavor chosen once at process startup from a connection-string
/// prefix and fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split(':').next().unwrap_or("");
        match scheme {
            "postgres" | "postgresql" => Dialect::Postgres,
            "mysql" => Dialect::MySql,
            _ => Dialect::Sqlite,
        }
    }

    /// The character used to quote identifiers. MySQL's backtick is the one
    /// dialect that diverges from ANSI double-quotes.
    pub fn quote_char(&self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Wraps an identifier in its dialect's quote character, doubling any
    /// embedded quote. Strict name whitelisting upstream (`^[a-z][a-z0-9_]*$`)
    /// should make an embedded quote unreachable; this exists as defense in
    /// depth.
    pub fn quote_ident(&self, ident: &str) -> String {
        let q = self.quote_char();
        let escaped = ident.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    pub fn qualify(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote_ident(table), self.quote_ident(column))
    }

    /// Renders the Nth (1-indexed) bind placeholder for this dialect.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    pub fn supports_returning(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// The native column type a given API `ColumnType` maps to.
    pub fn native_type(&self, ty: crate::models::ColumnType) -> &'static str {
        use crate::models::ColumnType::*;
        match (self, ty) {
            (Dialect::Sqlite, String) => "TEXT",
            (Dialect::Sqlite, Integer) => "INTEGER",
            (Dialect::Sqlite, Boolean) => "INTEGER",
            (Dialect::Sqlite, Datetime) => "TEXT",
            (Dialect::Sqlite, Json) => "TEXT",
            (Dialect::Sqlite, Decimal) => "NUMERIC",

            (Dialect::Postgres, String) => "TEXT",
            (Dialect::Postgres, Integer) => "BIGINT",
            (Dialect::Postgres, Boolean) => "BOOLEAN",
            (Dialect::Postgres, Datetime) => "TIMESTAMP",
            (Dialect::Postgres, Json) => "JSON",
            (Dialect::Postgres, Decimal) => "NUMERIC(19,2)",

            (Dialect::MySql, String) => "TEXT",
            (Dialect::MySql, Integer) => "BIGINT",
            (Dialect::MySql, Boolean) => "BOOLEAN",
            (Dialect::MySql, Datetime) => "TIMESTAMP",
            (Dialect::MySql, Json) => "JSON",
            (Dialect::MySql, Decimal) => "DECIMAL(19,2)",
        }
    }

    /// Maps a dialect-native introspected type name back to the API's closed
    /// type set, for startup recovery.
    pub fn infer_type(&self, native: &str) -> Option<crate::models::ColumnType> {
        use crate::models::ColumnType::*;
        let upper = native.to_uppercase();
        let upper = upper.split('(').next().unwrap_or(&upper).trim();
        Some(match upper {
            "BIGINT" | "INTEGER" | "INT" | "INT8" | "INT4" => Integer,
            "TEXT" | "VARCHAR" | "CHAR" | "CHARACTER VARYING" | "CLOB" => String,
            "NUMERIC" | "DECIMAL" => Decimal,
            "BOOLEAN" | "BOOL" => Boolean,
            "TIMESTAMP" | "DATETIME" | "TIMESTAMPTZ" => Datetime,
            "JSON" | "JSONB" => Json,
            _ => return None,
        })
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::MySql => write!(f, "mysql"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dialect_from_url() {
        assert_eq!(Dialect::from_url("postgres://u:p@h/db"), Dialect::Postgres);
        assert_eq!(Dialect::from_url("postgresql://u:p@h/db"), Dialect::Postgres);
        assert_eq!(Dialect::from_url("mysql://u:p@h/db"), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:"), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("sqlite:///tmp/x.db"), Dialect::Sqlite);
    }

    #[test]
    fn quotes_identifiers_per_dialect() {
        assert_eq!(Dialect::Postgres.quote_ident("col"), "\"col\"");
        assert_eq!(Dialect::MySql.quote_ident("col"), "`col`");
        assert_eq!(Dialect::Sqlite.quote_ident("col"), "\"col\"");
    }

    #[test]
    fn doubles_embedded_quote_as_defense_in_depth() {
        assert_eq!(Dialect::Postgres.quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn placeholder_style_differs() {
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::MySql.placeholder(3), "?");
    }
}
