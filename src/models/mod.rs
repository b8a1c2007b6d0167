pub mod collection;
pub mod value;

pub use collection::{Collection, Column, ColumnType};
pub use value::{Record, RecordValue};

pub type JsonObject = serde_json::value::Map<String, serde_json::Value>;
pub type JsonValue = serde_json::Value;

/// Names reserved for built-in endpoints; a collection can never take one of
/// these as its name.
pub const RESERVED_NAMES: &[&str] = &["collections", "auth", "users", "apikeys", "doc", "health"];

/// Prefix reserved for internal bookkeeping tables (e.g. `moon_collections`).
pub const RESERVED_PREFIX: &str = "moon_";

/// System columns injected into every managed collection. Never mutable by
/// clients, never part of a create/update payload.
pub const SYSTEM_COLUMNS: &[&str] = &["pkid", "id"];

pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS.contains(&name)
}
