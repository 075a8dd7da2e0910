use crate::{Error, Result};

/// What an [Entry] holds. The format only knows regular files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryKind {
    #[default]
    RegularFile,
}

/// A named byte blob inside an [Archive](crate::Archive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    payload: Vec<u8>,
}

impl Entry {
    /// Create a regular file entry.
    ///
    /// The name ends up NUL-terminated on disk, so it must be non-empty and
    /// must not contain a NUL byte itself.
    pub fn regular_file<N: Into<String>, P: Into<Vec<u8>>>(name: N, payload: P) -> Result<Entry> {
        let name = name.into();
        validate_name(&name)?;

        Ok(Entry {
            name,
            kind: EntryKind::RegularFile,
            payload: payload.into(),
        })
    }

    /// For names the parser has already checked.
    pub(crate) fn from_parts(name: String, payload: Vec<u8>) -> Entry {
        Entry {
            name,
            kind: EntryKind::RegularFile,
            payload,
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.as_bytes().contains(&0) {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(Error::InvalidName {
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_file() {
        let entry = Entry::regular_file("a.txt", b"xyz".to_vec()).unwrap();
        assert_eq!(entry.name(), "a.txt");
        assert_eq!(entry.kind(), EntryKind::RegularFile);
        assert_eq!(entry.payload(), b"xyz");
        assert_eq!(entry.len(), 3);
    }

    #[test]
    fn empty_payload_is_fine() {
        let entry = Entry::regular_file("bb", Vec::new()).unwrap();
        assert!(entry.is_empty());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(matches!(
            Entry::regular_file("", b"x".to_vec()),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            Entry::regular_file("a\0b", b"x".to_vec()),
            Err(Error::InvalidName { .. })
        ));
    }
}
