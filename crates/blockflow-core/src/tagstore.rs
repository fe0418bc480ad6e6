use crate::symbol::Symbol;
use crate::tag::Tag;

struct Entry {
    tag: Tag,
    seq: u64,
}

/// The ordered, indexable collection of tags attached to one output buffer.
///
/// Entries are kept sorted by `(offset, insertion order)` so that
/// [`TagStore::tags_in_range`] can binary-search the lower bound instead of
/// scanning from the front. Appends land near the back in the common case
/// (offsets only ever grow with `nitems_written`), so insertion is
/// effectively O(1) amortized even though it's implemented as a sorted
/// insert.
pub struct TagStore {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl TagStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Appends a tag. Callers (the `Block`/`WorkIo` layer) are responsible
    /// for enforcing the `offset ≥ nitems_written` contract before calling
    /// this — the store itself only maintains ordering.
    pub fn append(&mut self, tag: Tag) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let offset = tag.offset();
        let pos = self
            .entries
            .partition_point(|e| e.tag.offset() < offset);
        self.entries.insert(pos, Entry { tag, seq });
    }

    /// Returns all tags with `start ≤ offset < end`, in offset order, with
    /// ties broken by insertion order. `key`, if given, filters to tags
    /// whose key matches.
    #[must_use]
    pub fn tags_in_range(&self, start: u64, end: u64, key: Option<Symbol>) -> Vec<Tag> {
        if start >= end {
            return Vec::new();
        }
        let lo = self.entries.partition_point(|e| e.tag.offset() < start);
        let mut out: Vec<&Entry> = self.entries[lo..]
            .iter()
            .take_while(|e| e.tag.offset() < end)
            .filter(|e| key.is_none_or_eq(e.tag.key()))
            .collect();
        out.sort_by_key(|e| (e.tag.offset(), e.seq));
        out.into_iter().map(|e| e.tag.clone()).collect()
    }

    /// Drops every tag with `offset < watermark`. Called by the scheduler
    /// once every consumer has advanced past `watermark`.
    pub fn garbage_collect(&mut self, watermark: u64) {
        self.entries.retain(|e| e.tag.offset() >= watermark);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new()
    }
}

trait OptionSymbolExt {
    fn is_none_or_eq(&self, other: Symbol) -> bool;
}

impl OptionSymbolExt for Option<Symbol> {
    fn is_none_or_eq(&self, other: Symbol) -> bool {
        match self {
            None => true,
            Some(s) => *s == other,
        }
    }
}
