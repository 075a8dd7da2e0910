use std::path::PathBuf;

use blobar_format::{load_archive, Entry};

use crate::cli::ExtractArgs;
use crate::error::{Error, Result};
use crate::util::{format_size, output_path};

pub fn run(args: ExtractArgs) -> Result<()> {
    let archive = load_archive(&args.archive).map_err(|source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    })?;

    let selected: Vec<&Entry> = if args.names.is_empty() {
        archive.iter().collect()
    } else {
        args.names
            .iter()
            .map(|name| {
                archive
                    .get(name)
                    .ok_or_else(|| Error::EntryNotFound { name: name.clone() })
            })
            .collect::<Result<_>>()?
    };

    let dir = args.output.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir).map_err(|source| Error::CreateDirectory {
        path: dir.clone(),
        source,
    })?;

    let mut total = 0u64;
    for entry in selected.iter() {
        let path = output_path(&dir, entry.name()).ok_or_else(|| Error::UnsafeEntryName {
            name: entry.name().to_string(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&path, entry.payload()).map_err(|source| Error::WriteFile {
            path: path.clone(),
            source,
        })?;

        total += entry.len() as u64;
        tracing::debug!(name = entry.name(), path = %path.display(), "extracted entry");

        if !args.quiet {
            println!("{:>10}  {}", format_size(entry.len() as u64), path.display());
        }
    }

    if !args.quiet {
        println!(
            "\nExtracted {} {} ({})",
            selected.len(),
            if selected.len() == 1 { "entry" } else { "entries" },
            format_size(total)
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CreateArgs;

    #[test]
    fn create_then_extract() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("lightmap.bin");
        std::fs::write(&input, b"\x01\x02\x03").unwrap();
        let archive = tmp.path().join("assets.ar");

        crate::commands::create(CreateArgs {
            archive: archive.clone(),
            force: false,
            quiet: true,
            files: vec![input],
        })
        .unwrap();

        let out = tmp.path().join("out");
        run(ExtractArgs {
            archive: archive.clone(),
            output: Some(out.clone()),
            quiet: true,
            names: vec![],
        })
        .unwrap();
        assert_eq!(std::fs::read(out.join("lightmap.bin")).unwrap(), b"\x01\x02\x03");

        let missing = run(ExtractArgs {
            archive,
            output: Some(out),
            quiet: true,
            names: vec!["nope".into()],
        });
        assert!(matches!(missing, Err(Error::EntryNotFound { .. })));
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("a.bin");
        std::fs::write(&input, b"a").unwrap();
        let archive = tmp.path().join("assets.ar");
        std::fs::write(&archive, b"").unwrap();

        let result = crate::commands::create(CreateArgs {
            archive,
            force: false,
            quiet: true,
            files: vec![input],
        });
        assert!(matches!(result, Err(Error::ArchiveExists { .. })));
    }
}
