//! Packed file info: where each entry's payload sits inside a serialized
//! archive, written as a relocatable block so a loader can map it directly.
//!
//! Payload layout (offsets are relocatable `u64` fields):
//!
//! ```text
//! root     { count: u32, reserved: u32, entries: offset }
//! entries  offset * count
//! entry    { name: offset, data_position: u32, data_size: u32 } * count
//! names    NUL-terminated strings
//! ```

use std::io::{Seek, Write};

use crate::reloc::{BlockWriter, PayloadWriter, Relocatable, RelocatableBlock, RelocatableHeader};
use crate::{layout, Archive, FormatError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFileEntry {
    pub name: String,
    /// Position of the first payload byte inside the archive.
    pub data_position: u32,
    pub data_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedFileInfo {
    pub entries: Vec<PackedFileEntry>,
}

const ROOT_SIZE: u64 = 16;
const ENTRY_SIZE: u64 = 16;

impl PackedFileInfo {
    /// Describe `archive` as [write_archive](crate::write_archive) lays it out
    /// at the start of a file.
    pub fn from_archive(archive: &Archive) -> Result<PackedFileInfo> {
        let plan = layout::plan(archive)?;

        let entries = archive
            .iter()
            .zip(plan.iter())
            .map(|(entry, layout)| PackedFileEntry {
                name: entry.name().to_string(),
                // plan() has checked the archive fits in 32 bits.
                data_position: layout.data_start as u32,
                data_size: layout.descriptor.data_size,
            })
            .collect();

        Ok(PackedFileInfo { entries })
    }

    pub fn get(&self, name: &str) -> Option<&PackedFileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Read packed file info back out of a parsed block.
    pub fn from_block(block: &RelocatableBlock<'_>) -> std::result::Result<Self, FormatError> {
        let root = block.root();
        let count = block.read_u32(root)?;

        let table = match block.read_offset(root + 8)? {
            Some(table) => table,
            None if count == 0 => return Ok(PackedFileInfo::default()),
            None => {
                return Err(FormatError::OffsetOutOfBounds {
                    what: crate::Structure::Payload,
                    offset: block.header().payload_offset as usize + root as usize + 8,
                    value: 0,
                })
            }
        };

        // The offset table has to fit in the payload before anything is
        // allocated for it.
        let table_len = count as u64 * 8;
        let payload_size = block.header().payload_size as u64;
        if table.saturating_add(table_len) > payload_size {
            return Err(FormatError::Truncated {
                what: crate::Structure::Payload,
                offset: block.header().payload_offset as usize + table as usize,
                needed: table_len as usize,
                available: payload_size.saturating_sub(table) as usize,
            });
        }

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as u64 {
            let field = table + i * 8;
            let entry = block.read_offset(field)?.ok_or(FormatError::OffsetOutOfBounds {
                what: crate::Structure::Payload,
                offset: block.header().payload_offset as usize + field as usize,
                value: 0,
            })?;

            let name = match block.read_offset(entry)? {
                Some(name) => block.read_c_str(name)?.to_string(),
                None => String::new(),
            };

            entries.push(PackedFileEntry {
                name,
                data_position: block.read_u32(entry + 8)?,
                data_size: block.read_u32(entry + 12)?,
            });
        }

        Ok(PackedFileInfo { entries })
    }

    /// Parse a block and read the packed file info from it.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, FormatError> {
        PackedFileInfo::from_block(&RelocatableBlock::parse(data)?)
    }
}

impl Relocatable for PackedFileInfo {
    fn write_relocatable<W: Write + Seek>(
        &self,
        out: &mut PayloadWriter<'_, W>,
    ) -> std::io::Result<()> {
        let count = u32::try_from(self.entries.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many entries")
        })?;

        out.write_u32(count)?;
        out.write_u32(0)?;
        if self.entries.is_empty() {
            return out.write_null_offset();
        }
        out.write_offset(ROOT_SIZE)?;

        // Entry records follow the table directly, so their positions are known.
        let records = ROOT_SIZE + 8 * self.entries.len() as u64;
        for i in 0..self.entries.len() as u64 {
            out.write_offset(records + i * ENTRY_SIZE)?;
        }

        let mut names = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter() {
            names.push(out.reserve_offset()?);
            out.write_u32(entry.data_position)?;
            out.write_u32(entry.data_size)?;
        }

        for (entry, slot) in self.entries.iter().zip(names) {
            out.fill_offset(slot)?;
            out.write_c_str(&entry.name)?;
        }

        out.pad(4)
    }
}

/// Write `pfi` as a complete relocatable block at the current sink position.
pub fn write_packed_file_info<W: Write + Seek>(
    pfi: &PackedFileInfo,
    sink: &mut W,
) -> Result<RelocatableHeader> {
    let mut block = BlockWriter::start_write(sink)?;
    let fixups = block.write(pfi, sink)?;
    block.finish_write(0, RelocatableHeader::SIZE as u32, 0, &fixups, sink, "")
}
