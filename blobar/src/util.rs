use std::path::{Component, Path, PathBuf};

use blobar_format::Archive;

use crate::error::{Error, Result};

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    use humansize::{FormatSize, BINARY};
    bytes.format_size(BINARY)
}

/// The entry name for a file on disk: its file name.
pub fn entry_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidFileName {
            path: path.to_path_buf(),
        })
}

/// Read each file and add it to `archive`, replacing same-named entries.
pub fn add_files(archive: &mut Archive, files: &[PathBuf], quiet: bool) -> Result<()> {
    for path in files {
        let name = entry_name(path)?;
        let data = std::fs::read(path).map_err(|source| Error::ReadFile {
            path: path.clone(),
            source,
        })?;
        let size = data.len() as u64;

        let replaced = archive.get(&name).is_some();
        archive
            .add_or_replace(name.as_str(), data)
            .map_err(|source| Error::AddEntry {
                name: name.clone(),
                source,
            })?;

        tracing::debug!(%name, size, replaced, "added file");
        if !quiet {
            let verb = if replaced { "replaced" } else { "added" };
            println!("{:>9}  {:>10}  {}", verb, format_size(size), name);
        }
    }

    Ok(())
}

/// Where entry `name` goes under `dir`, or `None` if it would escape it.
pub fn output_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if safe {
        Some(dir.join(relative))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_come_from_file_name() {
        assert_eq!(entry_name(Path::new("a/b/c.dds")).unwrap(), "c.dds");
        assert_eq!(entry_name(Path::new("c.dds")).unwrap(), "c.dds");
        assert!(entry_name(Path::new("/")).is_err());
    }

    #[test]
    fn output_paths_stay_inside() {
        let dir = Path::new("out");
        assert_eq!(output_path(dir, "a.txt"), Some(PathBuf::from("out/a.txt")));
        assert_eq!(
            output_path(dir, "sub/a.txt"),
            Some(PathBuf::from("out/sub/a.txt"))
        );
        assert_eq!(output_path(dir, "../a.txt"), None);
        assert_eq!(output_path(dir, "/etc/passwd"), None);
    }

    #[test]
    fn add_files_replaces_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("one");
        let second_dir = tmp.path().join("two");
        std::fs::create_dir(&first).unwrap();
        std::fs::create_dir(&second_dir).unwrap();

        let a = first.join("a.bin");
        let b = first.join("b.bin");
        let a2 = second_dir.join("a.bin");
        std::fs::write(&a, b"old").unwrap();
        std::fs::write(&b, b"b").unwrap();
        std::fs::write(&a2, b"new").unwrap();

        let mut archive = Archive::new();
        add_files(&mut archive, &[a, b, a2], true).unwrap();

        let names: Vec<_> = archive.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["a.bin", "b.bin"]);
        assert_eq!(archive.get("a.bin").unwrap().payload(), b"new");
    }
}
