pub mod context;
pub mod redactor;

pub(crate) use context::test_context;
