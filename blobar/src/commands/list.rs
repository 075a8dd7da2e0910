use blobar_format::read_entry_positions;
use serde::Serialize;

use crate::cli::ListArgs;
use crate::error::{Error, Result};
use crate::util::format_size;

#[derive(Debug, Serialize)]
struct JsonEntry<'a> {
    name: &'a str,
    size: usize,
    offset: usize,
}

pub fn run(args: ListArgs) -> Result<()> {
    let data = std::fs::read(&args.archive).map_err(|source| Error::ReadFile {
        path: args.archive.clone(),
        source,
    })?;

    let entries = read_entry_positions(&data).map_err(|e| Error::OpenArchive {
        path: args.archive.clone(),
        source: e.into(),
    })?;

    if args.json {
        let json_entries: Vec<_> = entries
            .iter()
            .map(|entry| JsonEntry {
                name: &entry.name,
                size: entry.data_size,
                offset: entry.data_start,
            })
            .collect();
        let json = serde_json::to_string_pretty(&json_entries)
            .map_err(|source| Error::Json { source })?;
        println!("{}", json);
        return Ok(());
    }

    println!("{:>10}  {:>10}  Name", "Offset", "Size");
    println!("{:->10}  {:->10}  {:-<24}", "", "", "");

    let mut total = 0u64;
    for entry in entries.iter() {
        total += entry.data_size as u64;
        println!(
            "{:>#10x}  {:>10}  {}",
            entry.data_start,
            format_size(entry.data_size as u64),
            entry.name
        );
    }

    println!("{:->10}  {:->10}  {:-<24}", "", "", "");
    println!(
        "{:>10}  {:>10}  {} {}",
        "",
        format_size(total),
        entries.len(),
        if entries.len() == 1 { "entry" } else { "entries" }
    );

    Ok(())
}
