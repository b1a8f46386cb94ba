use indexmap::IndexSet;

/// Insertion-ordered dedup table mapping an exact settings string to a
/// stable integer index. Registration is idempotent: the same string
/// always yields the same index and never grows the table twice.
///
/// One table is single-owned per export call; assigned indices depend on
/// first-seen order, so sharing a table across exports would make the
/// output nondeterministic.
#[derive(Debug, Clone, Default)]
pub struct DedupTable {
    entries: IndexSet<String>,
    reserved_zero: bool,
}

impl DedupTable {
    /// Table whose indices start at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with index 0 reserved as the empty "no entry" slot; real
    /// registrations start at 1.
    pub fn with_reserved_zero() -> Self {
        Self {
            entries: IndexSet::new(),
            reserved_zero: true,
        }
    }

    /// Index for `value`, inserting it on first sight.
    pub fn register(&mut self, value: &str) -> usize {
        let idx = match self.entries.get_index_of(value) {
            Some(idx) => idx,
            None => self.entries.insert_full(value.to_string()).0,
        };
        idx + usize::from(self.reserved_zero)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        if self.reserved_zero {
            if index == 0 {
                return Some("");
            }
            self.entries.get_index(index - 1).map(String::as_str)
        } else {
            self.entries.get_index(index).map(String::as_str)
        }
    }

    /// Table length including the reserved slot, if any.
    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(self.reserved_zero)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into the serialized table, reserved slot first.
    pub fn into_entries(self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        if self.reserved_zero {
            out.push(String::new());
        }
        out.extend(self.entries);
        out
    }
}
