use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// An interned string, comparable in O(1).
///
/// Tag keys are looked up constantly on the hot consume path
/// (`get_tags_in_range(..., key)`), so they're interned into a process-wide
/// registry once and compared by index afterward, rather than by string
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol(u32);

struct Interner {
    by_name: HashMap<Box<str>, u32>,
    by_id: Vec<Box<str>>,
}

impl Interner {
    fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_id: Vec::new(),
        }
    }
}

fn registry() -> &'static RwLock<Interner> {
    static REGISTRY: OnceLock<RwLock<Interner>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Interner::new()))
}

impl Symbol {
    /// Interns `name`, returning the same `Symbol` for equal strings on
    /// every call (process-wide).
    #[must_use]
    pub fn intern(name: &str) -> Self {
        let reg = registry();
        if let Some(&id) = reg.read().unwrap().by_name.get(name) {
            return Self(id);
        }

        let mut reg = reg.write().unwrap();
        // Re-check: another thread may have interned `name` while we waited
        // for the write lock.
        if let Some(&id) = reg.by_name.get(name) {
            return Self(id);
        }
        let id = reg.by_id.len() as u32;
        let boxed: Box<str> = name.into();
        reg.by_name.insert(boxed.clone(), id);
        reg.by_id.push(boxed);
        Self(id)
    }

    /// Returns the interned string this symbol names.
    #[must_use]
    pub fn as_str(&self) -> String {
        registry().read().unwrap().by_id[self.0 as usize].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_intern_to_equal_symbols() {
        let a = Symbol::intern("burst");
        let b = Symbol::intern("burst");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_intern_to_distinct_symbols() {
        let a = Symbol::intern("burst_start_distinct_test");
        let b = Symbol::intern("burst_end_distinct_test");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_as_str() {
        let s = Symbol::intern("round_trip_marker");
        assert_eq!(s.as_str(), "round_trip_marker");
    }
}
