use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::header::{ContainerHeader, EntryDescriptor};
use crate::{layout, Archive, Result};

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
}

impl Serialize for ContainerHeader {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.reserved)?;
        writer.write_u32::<LittleEndian>(self.header_size)?;
        writer.write_u32::<LittleEndian>(self.descriptor_size)?;
        writer.write_u32::<LittleEndian>(self.alignment)
    }
}

impl Serialize for EntryDescriptor {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.total_size)?;
        writer.write_u32::<LittleEndian>(self.data_size)?;
        writer.write_u32::<LittleEndian>(self.data_offset)?;
        writer.write_u32::<LittleEndian>(self.reserved1)?;
        writer.write_u32::<LittleEndian>(self.reserved2)
    }
}

/// Write `len` zero bytes.
pub(crate) fn write_zeros<W: Write>(writer: &mut W, len: u64) -> std::io::Result<()> {
    std::io::copy(&mut std::io::Read::take(std::io::repeat(0), len), writer)?;
    Ok(())
}

/// Write a string followed by a NUL terminator.
pub(crate) fn write_c_str<W: Write>(writer: &mut W, value: &str) -> std::io::Result<()> {
    writer.write_all(value.as_bytes())?;
    writer.write_u8(0)
}

/// Serialize `archive` into `sink` and return the number of bytes written.
///
/// The container header goes at the current sink position. Each payload is
/// padded to a multiple of [ALIGNMENT](crate::header::ALIGNMENT) in absolute
/// sink position; descriptor offsets are relative to their own descriptor. On
/// success the writer leaves the sink positioned at the start of the
/// just-written region, so the buffer can be read back as a finished unit
/// without another seek.
///
/// Nothing is written if an entry is too large for the format. A sink error
/// part way through leaves partial bytes behind that must be discarded.
pub fn write_archive<W: Write + Seek>(archive: &Archive, sink: &mut W) -> Result<u64> {
    let base = sink.stream_position()?;
    let plan = layout::plan_at(archive, base)?;

    ContainerHeader::default().write(sink)?;

    for (entry, layout) in archive.iter().zip(plan.iter()) {
        layout.descriptor.write(sink)?;
        write_c_str(sink, entry.name())?;
        write_zeros(sink, layout.padding(entry.name().len()))?;
        sink.write_all(entry.payload())?;

        tracing::debug!(
            start = format_args!("{:#x}", layout.start),
            data = format_args!("{:#x}", layout.data_start),
            end = format_args!("{:#x}", layout.end()),
            name = entry.name(),
            "serialized entry"
        );
    }

    let end = sink.stream_position()?;
    sink.seek(SeekFrom::Start(base))?;

    tracing::debug!(
        start = format_args!("{:#x}", base),
        end = format_args!("{:#x}", end),
        bytes = end - base,
        entries = archive.len(),
        "serialized Archive"
    );

    Ok(end - base)
}
