//! Sans-IO parsing of archive buffers.
//!
//! Callers hand over the whole buffer, already corrected for any
//! platform-specific fixups. Parsers take the absolute offset to start at and
//! return `(value, bytes_consumed)`, so every error can name the offending
//! byte offset.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Structure;
use crate::header::{ContainerHeader, EntryDescriptor};
use crate::{Archive, Entry, FormatError, Result};

pub type ParseResult<T> = std::result::Result<(T, usize), FormatError>;

/// Read a little-endian u32 at `offset`, which the caller has bounds-checked.
#[inline]
pub(crate) fn u32_at(data: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&data[offset..offset + 4])
}

#[inline]
pub(crate) fn u64_at(data: &[u8], offset: usize) -> u64 {
    LittleEndian::read_u64(&data[offset..offset + 8])
}

fn ensure(
    data: &[u8],
    what: Structure,
    offset: usize,
    needed: usize,
) -> std::result::Result<(), FormatError> {
    let available = data.len().saturating_sub(offset);
    if available < needed {
        return Err(FormatError::Truncated {
            what,
            offset,
            needed,
            available,
        });
    }
    Ok(())
}

/// Parse the container header at offset 0.
///
/// The consumed byte count is the header's own `header_size`, which is where
/// the first descriptor starts.
pub fn parse_container_header(data: &[u8]) -> ParseResult<ContainerHeader> {
    ensure(data, Structure::ContainerHeader, 0, ContainerHeader::SIZE)?;

    let header = ContainerHeader {
        reserved: u32_at(data, 0x0),
        header_size: u32_at(data, 0x4),
        descriptor_size: u32_at(data, 0x8),
        alignment: u32_at(data, 0xC),
    };

    let header_size = header.header_size as usize;
    if header_size < ContainerHeader::SIZE || header_size > data.len() {
        return Err(FormatError::InvalidHeaderSize {
            offset: 0x4,
            header_size: header.header_size,
        });
    }

    if (header.descriptor_size as usize) < EntryDescriptor::SIZE {
        return Err(FormatError::InvalidDescriptorSize {
            offset: 0x8,
            descriptor_size: header.descriptor_size,
        });
    }

    Ok((header, header_size))
}

/// Parse the descriptor at `offset`.
pub fn parse_descriptor(data: &[u8], offset: usize) -> ParseResult<EntryDescriptor> {
    ensure(data, Structure::EntryDescriptor, offset, EntryDescriptor::SIZE)?;

    let descriptor = EntryDescriptor {
        total_size: u32_at(data, offset),
        data_size: u32_at(data, offset + 0x4),
        data_offset: u32_at(data, offset + 0x8),
        reserved1: u32_at(data, offset + 0xC),
        reserved2: u32_at(data, offset + 0x10),
    };

    Ok((descriptor, EntryDescriptor::SIZE))
}

/// Where one entry sits in the buffer it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPosition {
    pub name: String,
    /// Offset of the entry's descriptor.
    pub start: usize,
    /// Offset of the first payload byte.
    pub data_start: usize,
    pub data_size: usize,
}

/// Parse one entry whose descriptor starts at `offset`.
///
/// `descriptor_size` comes from the container header; the name follows the
/// descriptor directly. Consumes `total_size` bytes.
pub fn parse_entry(data: &[u8], offset: usize, descriptor_size: usize) -> ParseResult<Entry> {
    let ((name, payload), consumed) = parse_raw_entry(data, offset, descriptor_size)?;
    Ok((Entry::from_parts(name.to_string(), payload.to_vec()), consumed))
}

/// Validate one entry and borrow its name and payload from `data`.
fn parse_raw_entry(
    data: &[u8],
    offset: usize,
    descriptor_size: usize,
) -> ParseResult<(&str, &[u8])> {
    ensure(data, Structure::EntryDescriptor, offset, descriptor_size)?;
    let (descriptor, _) = parse_descriptor(data, offset)?;

    let total_size = descriptor.total_size as usize;
    let minimum = descriptor_size + 1;
    if total_size < minimum {
        return Err(FormatError::EntryTooSmall {
            offset,
            total_size: descriptor.total_size,
            minimum,
        });
    }

    let end = offset + total_size;
    if end > data.len() {
        return Err(FormatError::EntryOutOfBounds {
            offset,
            end,
            len: data.len(),
        });
    }

    let name_offset = offset + descriptor_size;
    let name_len = data[name_offset..end]
        .iter()
        .position(|b| *b == 0)
        .ok_or(FormatError::UnterminatedName {
            offset: name_offset,
        })?;

    if name_len == 0 {
        return Err(FormatError::EmptyName {
            offset: name_offset,
        });
    }

    let name_end = descriptor_size + name_len + 1;
    if (descriptor.data_offset as usize) < name_end {
        return Err(FormatError::DataOverlapsName {
            offset,
            data_offset: descriptor.data_offset,
        });
    }

    if descriptor.data_offset as u64 + descriptor.data_size as u64 > descriptor.total_size as u64 {
        return Err(FormatError::DataOutOfBounds {
            offset,
            data_offset: descriptor.data_offset,
            data_size: descriptor.data_size,
            total_size: descriptor.total_size,
        });
    }

    let name = std::str::from_utf8(&data[name_offset..name_offset + name_len]).map_err(|_| {
        FormatError::InvalidNameEncoding {
            offset: name_offset,
        }
    })?;

    let data_start = offset + descriptor.data_offset as usize;
    let payload = &data[data_start..data_start + descriptor.data_size as usize];

    tracing::debug!(
        start = format_args!("{:#x}", offset),
        data = format_args!("{:#x}", data_start),
        end = format_args!("{:#x}", end),
        bytes = total_size,
        name,
        "deserialized Entry"
    );

    Ok(((name, payload), total_size))
}

/// Parse a complete archive buffer.
///
/// There is no entry count: entries run until the end of the buffer.
pub fn read_archive(data: &[u8]) -> std::result::Result<Archive, FormatError> {
    let mut archive = Archive::new();
    read_archive_into(&mut archive, data)?;
    Ok(archive)
}

/// Parse `data` and append its entries to `archive`, in on-disk order.
///
/// `archive` is left untouched if parsing fails.
pub fn read_archive_into(
    archive: &mut Archive,
    data: &[u8],
) -> std::result::Result<(), FormatError> {
    let (header, mut pos) = parse_container_header(data)?;
    let descriptor_size = header.descriptor_size as usize;

    let mut entries = Vec::new();
    while pos < data.len() {
        let (entry, consumed) = parse_entry(data, pos, descriptor_size)?;
        entries.push(entry);
        pos += consumed;
    }

    tracing::debug!(
        bytes = data.len(),
        count = entries.len(),
        alignment = header.alignment,
        "deserialized Archive"
    );

    for entry in entries {
        archive.push(entry);
    }

    Ok(())
}

/// Validate a complete archive buffer and report where each entry sits.
///
/// Positions are offsets into `data`, so they honour whatever header and
/// descriptor sizes the buffer declares.
pub fn read_entry_positions(
    data: &[u8],
) -> std::result::Result<Vec<EntryPosition>, FormatError> {
    let (header, mut pos) = parse_container_header(data)?;
    let descriptor_size = header.descriptor_size as usize;

    let mut out = Vec::new();
    while pos < data.len() {
        let ((name, payload), consumed) = parse_raw_entry(data, pos, descriptor_size)?;
        let (descriptor, _) = parse_descriptor(data, pos)?;
        out.push(EntryPosition {
            name: name.to_string(),
            start: pos,
            data_start: pos + descriptor.data_offset as usize,
            data_size: payload.len(),
        });
        pos += consumed;
    }

    Ok(out)
}

/// Read `reader` to its end and parse the result.
pub fn read_archive_from<R: Read>(mut reader: R) -> Result<Archive> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(read_archive(&buf)?)
}
