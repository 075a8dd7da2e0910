use blobar_format::{save_archive, Archive};

use crate::cli::CreateArgs;
use crate::error::{Error, Result};
use crate::util::{add_files, format_size};

pub fn run(args: CreateArgs) -> Result<()> {
    if args.files.is_empty() {
        return Err(Error::NoFilesSpecified);
    }

    if args.archive.exists() && !args.force {
        return Err(Error::ArchiveExists { path: args.archive });
    }

    let mut archive = Archive::new();
    add_files(&mut archive, &args.files, args.quiet)?;

    let written = save_archive(&archive, &args.archive).map_err(|source| Error::SaveArchive {
        path: args.archive.clone(),
        source,
    })?;

    tracing::info!(path = %args.archive.display(), entries = archive.len(), bytes = written, "created archive");

    if !args.quiet {
        println!(
            "\nCreated {} with {} {} ({})",
            args.archive.display(),
            archive.len(),
            if archive.len() == 1 { "entry" } else { "entries" },
            format_size(written)
        );
    }

    Ok(())
}
