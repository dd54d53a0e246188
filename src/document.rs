//! In-memory model of a parsed prefab: typed entries plus an id index.

use std::collections::HashMap;

use crate::error::ResolveError;
use crate::types::{EntryId, Reference, Value};

/// One `--- !u!<class> &<id>` block of a prefab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Top-level attribute mapping under the type tag.
    pub attributes: Value,
    /// Numeric Unity class from the `!u!` tag.
    pub class_id: String,
    /// Document-unique anchor.
    pub id: EntryId,
    /// One-based line of the block header.
    pub line: usize,
    /// Whether the header carried the `stripped` marker.
    pub stripped: bool,
    /// Semantic class such as `GameObject` or `Transform`.
    pub type_tag: String,
}

impl Entry {
    /// Look up a top-level attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        return self.attributes.get(key);
    }

    /// Text of a top-level scalar attribute.
    pub fn scalar_text(&self, key: &str) -> Option<&str> {
        return self.attribute(key).and_then(Value::as_scalar).map(|s| return s.as_text());
    }
}

/// Entries of one source, in source order, with O(1) lookup by id.
/// Read-only once built; ids are unique.
#[derive(Debug, Default)]
pub struct Document {
    /// Entries in the order they appeared.
    entries: Vec<Entry>,
    /// Position of each entry in `entries`, keyed by id.
    index: HashMap<EntryId, usize>,
}

impl Document {
    /// Build a document from entries, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::MalformedDocument` naming the second occurrence
    /// of a repeated id.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self, ResolveError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(ResolveError::MalformedDocument {
                    line: entry.line,
                    reason: format!("duplicate id &{}", entry.id),
                });
            }
        }
        return Ok(Self { entries, index });
    }

    /// All entries in source order.
    pub fn entries(&self) -> &[Entry] {
        return &self.entries;
    }

    /// Entries with the given type tag, in source order.
    pub fn of_type<'a>(&'a self, type_tag: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        return self.entries().iter().filter(move |e| return e.type_tag == type_tag);
    }

    /// Find an entry by id.
    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        let position = *self.index.get(id)?;
        return self.entries.get(position);
    }

    /// Follow a reference to its entry.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::DanglingReference` when the target id is not in
    /// this document, including references into other assets.
    pub fn dereference(&self, reference: &Reference) -> Result<&Entry, ResolveError> {
        let dangling = || {
            return ResolveError::DanglingReference {
                id: reference.target.clone(),
            };
        };
        if !reference.is_local() {
            return Err(dangling());
        }
        return self.get(&reference.target).ok_or_else(dangling);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }
}
