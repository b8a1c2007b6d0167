//! Record identifiers: 26-character Crockford base32 ULIDs, monotonic within
//! a process.
//!
//! Generation is delegated to the `ulid` crate's `Generator`, which already
//! guarantees monotonic ordering: within the same
//! millisecond the random portion is incremented rather than redrawn, so two
//! IDs minted back-to-back in one process are always orderable. `Generator`
//! itself is `!Sync`; the single shared counter it holds is wrapped in a
//! `Mutex` here so every request-handling task can mint through the same
//! instance without racing the clock.

use std::str::FromStr;
use std::sync::Mutex;

use ulid::{Generator, Ulid};

pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    /// Mints the next ULID for this process. Monotonicity only degrades if
    /// the random tail of a millisecond is exhausted (2^80 values), which is
    /// treated as practically unreachable and falls back to a fresh ULID
    /// rather than panicking.
    pub fn generate(&self) -> String {
        let mut guard = self.inner.lock().expect("ulid generator mutex poisoned");
        let id = guard.generate().unwrap_or_else(|_| Ulid::new());
        id.to_string()
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates and canonicalizes a client-supplied ULID: case-insensitive on
/// input, uppercase on output.
pub fn canonicalize(raw: &str) -> Option<String> {
    if raw.len() != 26 {
        return None;
    }
    Ulid::from_str(&raw.to_uppercase())
        .ok()
        .map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_26_char_uppercase_ids() {
        let gen = UlidGenerator::new();
        let id = gen.generate();
        assert_eq!(id.len(), 26);
        assert_eq!(id, id.to_uppercase());
    }

    #[test]
    fn is_monotonic_within_process() {
        let gen = UlidGenerator::new();
        let mut prev = gen.generate();
        for _ in 0..1000 {
            let next = gen.generate();
            assert!(next > prev, "{next} should sort after {prev}");
            prev = next;
        }
    }

    #[test]
    fn canonicalizes_lowercase_input() {
        let gen = UlidGenerator::new();
        let id = gen.generate();
        let lower = id.to_lowercase();
        assert_eq!(canonicalize(&lower).as_deref(), Some(id.as_str()));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(canonicalize("not-a-ulid"), None);
        assert_eq!(canonicalize(""), None);
    }
}
