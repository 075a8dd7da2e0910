use crate::{Entry, Result};

/// An ordered collection of [Entry] values.
///
/// Insertion order is on-disk order. The only mutation is
/// [add_or_replace](Archive::add_or_replace), which keeps names unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<Entry>,
}

impl Archive {
    pub fn new() -> Archive {
        Archive::default()
    }

    /// Replace the entry called `name` in place, or append a new one.
    ///
    /// Names are compared byte for byte. Repeating a call with the same name
    /// and payload leaves the archive unchanged.
    pub fn add_or_replace<N: Into<String>, P: Into<Vec<u8>>>(
        &mut self,
        name: N,
        payload: P,
    ) -> Result<()> {
        let entry = Entry::regular_file(name, payload)?;

        match self.entries.iter_mut().find(|e| e.name() == entry.name()) {
            Some(existing) => {
                tracing::trace!(name = entry.name(), "replacing entry");
                *existing = entry;
            }
            None => {
                tracing::trace!(name = entry.name(), "appending entry");
                self.entries.push(entry);
            }
        }

        Ok(())
    }

    /// Entries parsed from bytes are appended in on-disk order, as they are.
    pub(crate) fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    #[inline(always)]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Archive {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
