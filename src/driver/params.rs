use sqlx::any::AnyArguments;
use sqlx::Arguments;

/// A bindable query parameter. Every value this core ever sends to the
/// database passes through here rather than being formatted into SQL text
///.
#[derive(Debug, Clone)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

/// Builds an `AnyArguments` from a slice of `SqlParam`s, matching the
/// `args.add(value)` pattern used to assemble raw, dynamically-built queries
/// against `sqlx::Any` (grounded on the `RawQuery` builder this core's
/// driver abstraction generalizes from a single-dialect ORM into a
/// three-dialect one).
pub fn bind_args<'a>(params: &'a [SqlParam]) -> AnyArguments<'a> {
    let mut args = AnyArguments::default();
    for param in params {
        match param {
            SqlParam::Text(s) => {
                let _ = args.add(s.as_str());
            }
            SqlParam::Int(i) => {
                let _ = args.add(*i);
            }
            SqlParam::Bool(b) => {
                let _ = args.add(*b);
            }
            SqlParam::Null => {
                let _ = args.add(Option::<String>::None);
            }
        }
    }
    args
}
