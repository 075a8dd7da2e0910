use blobar_format::parse::parse_container_header;
use blobar_format::read_archive;

use crate::cli::InfoArgs;
use crate::error::{Error, Result};
use crate::util::format_size;

pub fn run(args: InfoArgs) -> Result<()> {
    let open_error = |source: blobar_format::Error| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    };

    let data = std::fs::read(&args.archive).map_err(|source| Error::ReadFile {
        path: args.archive.clone(),
        source,
    })?;

    let (header, _) = parse_container_header(&data).map_err(|e| open_error(e.into()))?;
    let archive = read_archive(&data).map_err(|e| open_error(e.into()))?;

    let payload_bytes: u64 = archive.iter().map(|entry| entry.len() as u64).sum();
    let largest = archive.iter().max_by_key(|entry| entry.len());

    println!("Archive:          {}", args.archive.display());
    println!("Header size:      {} bytes", header.header_size);
    println!("Descriptor size:  {} bytes", header.descriptor_size);
    println!("Alignment:        {} bytes", header.alignment);
    println!();
    println!("Entries:          {}", archive.len());
    println!("Payload size:     {}", format_size(payload_bytes));
    println!("Archive size:     {}", format_size(data.len() as u64));
    if let Some(entry) = largest {
        println!(
            "Largest entry:    {} ({})",
            entry.name(),
            format_size(entry.len() as u64)
        );
    }

    Ok(())
}
