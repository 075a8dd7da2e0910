use blobar_format::{load_archive, save_archive};

use crate::cli::AddArgs;
use crate::error::{Error, Result};
use crate::util::{add_files, format_size};

pub fn run(args: AddArgs) -> Result<()> {
    if args.files.is_empty() {
        return Err(Error::NoFilesSpecified);
    }

    let mut archive = load_archive(&args.archive).map_err(|source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    })?;
    let before = archive.len();

    add_files(&mut archive, &args.files, args.quiet)?;

    let written = save_archive(&archive, &args.archive).map_err(|source| Error::SaveArchive {
        path: args.archive.clone(),
        source,
    })?;

    tracing::info!(
        path = %args.archive.display(),
        added = archive.len() - before,
        bytes = written,
        "updated archive"
    );

    if !args.quiet {
        println!(
            "\nUpdated {} ({} entries, {})",
            args.archive.display(),
            archive.len(),
            format_size(written)
        );
    }

    Ok(())
}
