//! Loading and saving archives on disk.

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use memmap2::MmapOptions;
use tempfile::NamedTempFile;

use crate::{read_archive, write_archive, Archive, Result};

/// Memory-map the file at `path` and parse it as an archive.
///
/// The returned archive owns its data; the mapping is gone once this returns.
pub fn load_archive<P: AsRef<Path>>(path: P) -> Result<Archive> {
    let file = File::open(path.as_ref())?;
    let len = file.metadata()?.len();

    // Zero-length mappings are rejected on some platforms.
    if len == 0 {
        return Ok(read_archive(&[])?);
    }

    let mmap = unsafe { MmapOptions::new().map(&file)? };

    tracing::debug!(path = %path.as_ref().display(), bytes = len, "mapped archive");

    Ok(read_archive(&mmap)?)
}

/// Serialize `archive` and write it to `path`, replacing any existing file.
///
/// The bytes go to a temporary file next to `path` which is renamed over it
/// once complete. On failure the previous file, if any, is left untouched and
/// the temporary file is removed.
pub fn save_archive<P: AsRef<Path>>(archive: &Archive, path: P) -> Result<u64> {
    let path = path.as_ref();
    let mut cursor = Cursor::new(Vec::new());
    let len = write_archive(archive, &mut cursor)?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(cursor.get_ref())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    tracing::debug!(path = %path.display(), bytes = len, "saved archive");

    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, FormatError};

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.ar");

        let mut archive = Archive::new();
        archive.add_or_replace("a.txt", b"xyz".to_vec()).unwrap();
        archive.add_or_replace("bb", Vec::new()).unwrap();

        assert_eq!(save_archive(&archive, &path).unwrap(), 80);
        assert_eq!(load_archive(&path).unwrap(), archive);
    }

    #[test]
    fn save_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.ar");
        std::fs::write(&path, b"stale bytes").unwrap();

        let mut archive = Archive::new();
        archive.add_or_replace("a.txt", b"xyz".to_vec()).unwrap();
        save_archive(&archive, &path).unwrap();

        assert_eq!(load_archive(&path).unwrap(), archive);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["assets.ar"]);
    }

    #[test]
    fn failed_save_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by the finished file.
        let path = dir.path().join("assets.ar");
        std::fs::create_dir(&path).unwrap();

        let mut archive = Archive::new();
        archive.add_or_replace("a.txt", b"xyz".to_vec()).unwrap();

        assert!(matches!(save_archive(&archive, &path), Err(Error::Io(_))));
        assert!(path.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn empty_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ar");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            load_archive(&path),
            Err(Error::Format(FormatError::Truncated { offset: 0, .. }))
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_archive(dir.path().join("nope.ar")),
            Err(Error::Io(_))
        ));
    }
}
