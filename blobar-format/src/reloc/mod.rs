//! Relocatable blocks: a header, a payload holding offset fields, and a table
//! listing where those fields are.
//!
//! A loader reads the whole block in one go and converts the offsets into
//! absolute addresses with [resolve_in_place], rather than deserializing field
//! by field. Writing follows a strict three-phase protocol on [BlockWriter]:
//!
//! 1. [BlockWriter::start_write] reserves a zeroed header.
//! 2. [BlockWriter::write] serializes a [Relocatable] payload and returns the
//!    [FixupTable] collected on the way.
//! 3. [BlockWriter::finish_write] appends the table, patches the header and
//!    consumes the writer.
//!
//! Block layout, all little-endian:
//!
//! ```text
//! RelocatableHeader (32 bytes)
//! payload
//! zero padding to 4
//! fixup table: u32 * fixup_count, offsets from the block start
//! extra string, NUL-terminated (optional)
//! ```
//!
//! Offset fields are `u64`s holding a position relative to the payload start.

use std::collections::BTreeMap;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::ser::Serialize;

mod reader;
mod writer;

pub use reader::{resolve_in_place, RelocatableBlock};
pub use writer::{BlockWriter, OffsetSlot, PayloadWriter};

/// Width of an offset field inside a payload.
pub const OFFSET_SIZE: usize = 8;

/// Alignment of the fixup table and of the block end.
pub const TABLE_ALIGNMENT: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelocatableHeader {
    /// Bytes from the block start to the end of the trailer.
    pub block_size: u32,
    pub flags: u32,
    /// Where the payload starts, relative to the block start.
    pub payload_offset: u32,
    pub payload_size: u32,
    pub fixup_table_offset: u32,
    pub fixup_count: u32,
    /// The root object's position inside the payload.
    pub root_offset: u32,
    /// Position of the extra string, or 0 if there is none.
    pub extra_offset: u32,
}

impl RelocatableHeader {
    pub const SIZE: usize = 32;

    /// The payload range, relative to the block start.
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        let start = self.payload_offset as usize;
        start..start + self.payload_size as usize
    }
}

impl Serialize for RelocatableHeader {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.block_size)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.payload_offset)?;
        writer.write_u32::<LittleEndian>(self.payload_size)?;
        writer.write_u32::<LittleEndian>(self.fixup_table_offset)?;
        writer.write_u32::<LittleEndian>(self.fixup_count)?;
        writer.write_u32::<LittleEndian>(self.root_offset)?;
        writer.write_u32::<LittleEndian>(self.extra_offset)
    }
}

/// Sink positions of every offset field written for one block.
///
/// Fields written through a [PayloadWriter] also carry the payload-relative
/// value they hold, so the block can be checked before it is finalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixupTable {
    positions: Vec<u64>,
    targets: BTreeMap<u64, u64>,
}

impl FixupTable {
    pub fn new() -> FixupTable {
        FixupTable::default()
    }

    /// Record a field whose value is not tracked.
    #[inline(always)]
    pub fn push(&mut self, position: u64) {
        self.positions.push(position);
    }

    /// Record a field at `position` holding `target`.
    pub(crate) fn record(&mut self, position: u64, target: u64) {
        self.positions.push(position);
        self.targets.insert(position, target);
    }

    /// Update the value held by an already recorded field.
    pub(crate) fn retarget(&mut self, position: u64, target: u64) {
        self.targets.insert(position, target);
    }

    /// Value held by the field at `position`, if it is tracked.
    pub fn target(&self, position: u64) -> Option<u64> {
        self.targets.get(&position).copied()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.positions.iter().copied()
    }

    /// Positions in ascending order, the way they are written to disk.
    pub(crate) fn sorted(&self) -> Vec<u64> {
        let mut positions = self.positions.clone();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// A payload that can be written into a relocatable block.
///
/// Implementations write their fields through the [PayloadWriter], using its
/// offset methods for every field a loader has to relocate.
pub trait Relocatable {
    fn write_relocatable<W: std::io::Write + std::io::Seek>(
        &self,
        out: &mut PayloadWriter<'_, W>,
    ) -> std::io::Result<()>;
}
