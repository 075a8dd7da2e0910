use std::io::Cursor;

use blobar_format::{load_archive, write_packed_file_info, PackedFileInfo};

use crate::cli::PfiArgs;
use crate::error::{Error, Result};
use crate::util::format_size;

pub fn run(args: PfiArgs) -> Result<()> {
    let archive = load_archive(&args.archive).map_err(|source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    })?;

    let to_error = |source: blobar_format::Error| Error::PackedFileInfo {
        path: args.output.clone(),
        source,
    };

    let info = PackedFileInfo::from_archive(&archive).map_err(to_error)?;
    let mut cursor = Cursor::new(Vec::new());
    let header = write_packed_file_info(&info, &mut cursor).map_err(to_error)?;

    std::fs::write(&args.output, cursor.get_ref()).map_err(|source| Error::WriteFile {
        path: args.output.clone(),
        source,
    })?;

    tracing::info!(
        path = %args.output.display(),
        entries = info.entries.len(),
        fixups = header.fixup_count,
        "wrote packed file info"
    );

    println!(
        "Wrote {} ({} entries, {} fixups, {})",
        args.output.display(),
        info.entries.len(),
        header.fixup_count,
        format_size(header.block_size as u64)
    );

    Ok(())
}
