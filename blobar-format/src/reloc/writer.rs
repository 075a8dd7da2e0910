use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::{FixupTable, Relocatable, RelocatableHeader, OFFSET_SIZE, TABLE_ALIGNMENT};
use crate::error::to_u32;
use crate::layout::align_up;
use crate::ser::{write_c_str, write_zeros, Serialize};
use crate::{Error, Result};

/// A reserved offset field, to be filled in once its target is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSlot(u64);

impl OffsetSlot {
    /// Sink position of the field.
    pub fn position(&self) -> u64 {
        self.0
    }
}

/// Writes payload fields and records where the offset fields go.
///
/// Positions handed to and returned from this writer are relative to the
/// payload start.
#[derive(Debug)]
pub struct PayloadWriter<'a, W> {
    sink: &'a mut W,
    base: u64,
    fixups: FixupTable,
}

impl<'a, W: Write + Seek> PayloadWriter<'a, W> {
    fn new(sink: &'a mut W, base: u64) -> PayloadWriter<'a, W> {
        PayloadWriter {
            sink,
            base,
            fixups: FixupTable::new(),
        }
    }

    /// Current position relative to the payload start.
    pub fn position(&mut self) -> std::io::Result<u64> {
        Ok(self.sink.stream_position()? - self.base)
    }

    pub fn write_u8(&mut self, value: u8) -> std::io::Result<()> {
        self.sink.write_u8(value)
    }

    pub fn write_u32(&mut self, value: u32) -> std::io::Result<()> {
        self.sink.write_u32::<LittleEndian>(value)
    }

    pub fn write_u64(&mut self, value: u64) -> std::io::Result<()> {
        self.sink.write_u64::<LittleEndian>(value)
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> std::io::Result<()> {
        self.sink.write_all(value)
    }

    /// Write `value` followed by a NUL terminator.
    pub fn write_c_str(&mut self, value: &str) -> std::io::Result<()> {
        write_c_str(&mut *self.sink, value)
    }

    /// Zero-pad up to the next multiple of `alignment` from the payload start.
    pub fn pad(&mut self, alignment: u64) -> std::io::Result<()> {
        let pos = self.position()?;
        write_zeros(&mut *self.sink, align_up(pos, alignment) - pos)
    }

    /// Write an offset field pointing at `target` and record its fixup.
    pub fn write_offset(&mut self, target: u64) -> std::io::Result<()> {
        let pos = self.sink.stream_position()?;
        self.fixups.record(pos, target);
        self.write_u64(target)
    }

    /// Write a null offset field. Null fields get no fixup.
    pub fn write_null_offset(&mut self) -> std::io::Result<()> {
        self.write_u64(0)
    }

    /// Write a placeholder offset field and record its fixup.
    pub fn reserve_offset(&mut self) -> std::io::Result<OffsetSlot> {
        let pos = self.sink.stream_position()?;
        self.fixups.record(pos, 0);
        self.write_u64(0)?;
        Ok(OffsetSlot(pos))
    }

    /// Point `slot` at the current position.
    pub fn fill_offset(&mut self, slot: OffsetSlot) -> std::io::Result<()> {
        let target = self.position()?;
        self.patch_offset(slot, target)
    }

    /// Point `slot` at `target`, leaving the cursor where it was.
    pub fn patch_offset(&mut self, slot: OffsetSlot, target: u64) -> std::io::Result<()> {
        let cur = self.sink.stream_position()?;
        self.sink.seek(SeekFrom::Start(slot.0))?;
        self.write_u64(target)?;
        self.sink.seek(SeekFrom::Start(cur))?;
        self.fixups.retarget(slot.0, target);
        Ok(())
    }

    fn into_fixups(self) -> FixupTable {
        self.fixups
    }
}

/// One relocatable block being written.
///
/// Created by [start_write](BlockWriter::start_write) and consumed by
/// [finish_write](BlockWriter::finish_write), so nothing can touch the block
/// after it is finalized.
#[derive(Debug)]
pub struct BlockWriter {
    start: u64,
    header_size: u32,
    payload_end: Option<u64>,
}

impl BlockWriter {
    /// Reserve a zero-filled header at the current sink position.
    pub fn start_write<W: Write + Seek>(sink: &mut W) -> Result<BlockWriter> {
        let start = sink.stream_position()?;
        write_zeros(sink, RelocatableHeader::SIZE as u64)?;

        tracing::debug!(start = format_args!("{:#x}", start), "started relocatable block");

        Ok(BlockWriter {
            start,
            header_size: RelocatableHeader::SIZE as u32,
            payload_end: None,
        })
    }

    /// Size of the reserved header region.
    #[inline(always)]
    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    /// Sink position of the payload start.
    #[inline(always)]
    pub fn payload_start(&self) -> u64 {
        self.start + self.header_size as u64
    }

    /// Serialize `payload` right after the header and return its fixups.
    ///
    /// Leaves the sink just past the payload.
    pub fn write<W: Write + Seek, T: Relocatable + ?Sized>(
        &mut self,
        payload: &T,
        sink: &mut W,
    ) -> Result<FixupTable> {
        let base = self.payload_start();
        sink.seek(SeekFrom::Start(base))?;

        let mut out = PayloadWriter::new(sink, base);
        payload.write_relocatable(&mut out)?;
        let fixups = out.into_fixups();

        let end = sink.stream_position()?;
        self.payload_end = Some(end);

        tracing::debug!(
            start = format_args!("{:#x}", base),
            end = format_args!("{:#x}", end),
            bytes = end - base,
            fixups = fixups.len(),
            "serialized relocatable payload"
        );

        Ok(fixups)
    }

    /// Append the fixup table and `extra`, then patch the header.
    ///
    /// `root_offset` is the root object's position inside the payload and
    /// `header_size` must be the size reserved by
    /// [start_write](BlockWriter::start_write). Every fixup must sit inside the
    /// payload and, where its value is known, point inside it too. Leaves the
    /// sink at the end of the block and returns the final header.
    pub fn finish_write<W: Write + Seek>(
        self,
        root_offset: u64,
        header_size: u32,
        flags: u32,
        fixups: &FixupTable,
        sink: &mut W,
        extra: &str,
    ) -> Result<RelocatableHeader> {
        if header_size != self.header_size {
            return Err(Error::HeaderSizeMismatch {
                given: header_size,
                reserved: self.header_size,
            });
        }

        let payload_start = self.payload_start();
        let payload_end = self.payload_end.unwrap_or(payload_start);
        let payload_size = payload_end - payload_start;

        if root_offset != 0 && root_offset >= payload_size {
            return Err(Error::RootOutOfRange {
                root_offset,
                payload_size,
            });
        }

        let positions = fixups.sorted();
        for &position in positions.iter() {
            if position < payload_start || position + OFFSET_SIZE as u64 > payload_end {
                return Err(Error::FixupOutOfRange {
                    position,
                    start: payload_start,
                    end: payload_end,
                });
            }

            match fixups.target(position) {
                Some(target) if target >= payload_size => {
                    return Err(Error::TargetOutOfRange {
                        position,
                        target,
                        payload_size,
                    })
                }
                _ => {}
            }
        }

        sink.seek(SeekFrom::Start(payload_end))?;
        let table_start = align_up(payload_end - self.start, TABLE_ALIGNMENT);
        write_zeros(sink, table_start - (payload_end - self.start))?;

        for &position in positions.iter() {
            sink.write_u32::<LittleEndian>(to_u32("fixup position", position - self.start)?)?;
        }

        let extra_offset = if extra.is_empty() {
            0
        } else {
            let pos = sink.stream_position()? - self.start;
            write_c_str(sink, extra)?;
            pos
        };

        let unpadded = sink.stream_position()? - self.start;
        let block_size = align_up(unpadded, TABLE_ALIGNMENT);
        write_zeros(sink, block_size - unpadded)?;

        let header = RelocatableHeader {
            block_size: to_u32("block size", block_size)?,
            flags,
            payload_offset: self.header_size,
            payload_size: to_u32("payload size", payload_size)?,
            fixup_table_offset: to_u32("fixup table offset", table_start)?,
            fixup_count: to_u32("fixup count", positions.len() as u64)?,
            root_offset: to_u32("root offset", root_offset)?,
            extra_offset: to_u32("extra offset", extra_offset)?,
        };

        sink.seek(SeekFrom::Start(self.start))?;
        header.write(sink)?;
        sink.seek(SeekFrom::Start(self.start + block_size))?;

        tracing::debug!(
            start = format_args!("{:#x}", self.start),
            end = format_args!("{:#x}", self.start + block_size),
            bytes = block_size,
            fixups = header.fixup_count,
            "finished relocatable block"
        );

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Two strings linked from a root pair of offsets, the second written
    /// after its slot.
    struct Pair(&'static str, &'static str);

    impl Relocatable for Pair {
        fn write_relocatable<W: Write + Seek>(
            &self,
            out: &mut PayloadWriter<'_, W>,
        ) -> std::io::Result<()> {
            out.write_offset(16)?;
            let second = out.reserve_offset()?;
            out.write_c_str(self.0)?;
            out.fill_offset(second)?;
            out.write_c_str(self.1)
        }
    }

    #[test]
    fn three_phases() {
        let mut cursor = Cursor::new(Vec::new());
        let mut block = BlockWriter::start_write(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 32);

        let fixups = block.write(&Pair("ab", "c"), &mut cursor).unwrap();
        assert_eq!(fixups.iter().collect::<Vec<_>>(), [32, 40]);
        // 16 bytes of offsets, "ab\0", "c\0"
        assert_eq!(cursor.position(), 32 + 21);

        let header = block
            .finish_write(0, 32, 7, &fixups, &mut cursor, "")
            .unwrap();

        assert_eq!(header.payload_offset, 32);
        assert_eq!(header.payload_size, 21);
        assert_eq!(header.fixup_table_offset, 56);
        assert_eq!(header.fixup_count, 2);
        assert_eq!(header.block_size, 64);
        assert_eq!(header.flags, 7);
        assert_eq!(header.extra_offset, 0);
        assert_eq!(cursor.position(), 64);

        let buf = cursor.into_inner();
        assert_eq!(buf.len(), 64);
        assert_eq!(&buf[0..4], &64u32.to_le_bytes());
        assert_eq!(&buf[32..40], &16u64.to_le_bytes());
        assert_eq!(&buf[40..48], &19u64.to_le_bytes());
        assert_eq!(&buf[56..60], &32u32.to_le_bytes());
        assert_eq!(&buf[60..64], &40u32.to_le_bytes());
    }

    #[test]
    fn extra_string_follows_table() {
        let mut cursor = Cursor::new(Vec::new());
        let mut block = BlockWriter::start_write(&mut cursor).unwrap();
        let fixups = block.write(&Pair("ab", "c"), &mut cursor).unwrap();
        let header = block
            .finish_write(0, 32, 0, &fixups, &mut cursor, "name")
            .unwrap();

        assert_eq!(header.extra_offset, 64);
        assert_eq!(header.block_size, 72);

        let buf = cursor.into_inner();
        assert_eq!(&buf[64..69], b"name\0");
    }

    #[test]
    fn header_size_mismatch() {
        let mut cursor = Cursor::new(Vec::new());
        let mut block = BlockWriter::start_write(&mut cursor).unwrap();
        let fixups = block.write(&Pair("a", "b"), &mut cursor).unwrap();

        let err = block
            .finish_write(0, 24, 0, &fixups, &mut cursor, "")
            .unwrap_err();
        assert!(matches!(err, Error::HeaderSizeMismatch { given: 24, reserved: 32 }));
    }

    #[test]
    fn foreign_fixup_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        let mut block = BlockWriter::start_write(&mut cursor).unwrap();
        let mut fixups = block.write(&Pair("a", "b"), &mut cursor).unwrap();
        fixups.push(4);

        let err = block
            .finish_write(0, 32, 0, &fixups, &mut cursor, "")
            .unwrap_err();
        assert!(matches!(err, Error::FixupOutOfRange { position: 4, .. }));
    }

    /// Offset fields pointing past the end of an 8-byte payload.
    struct Dangling {
        patched: bool,
    }

    impl Relocatable for Dangling {
        fn write_relocatable<W: Write + Seek>(
            &self,
            out: &mut PayloadWriter<'_, W>,
        ) -> std::io::Result<()> {
            if self.patched {
                let slot = out.reserve_offset()?;
                out.patch_offset(slot, 0x1000)
            } else {
                out.write_offset(0x1000)
            }
        }
    }

    #[test]
    fn dangling_target_rejected() {
        for patched in [false, true] {
            let mut cursor = Cursor::new(Vec::new());
            let mut block = BlockWriter::start_write(&mut cursor).unwrap();
            let fixups = block.write(&Dangling { patched }, &mut cursor).unwrap();
            assert_eq!(fixups.target(32), Some(0x1000));

            let err = block
                .finish_write(0, 32, 0, &fixups, &mut cursor, "")
                .unwrap_err();
            assert!(matches!(
                err,
                Error::TargetOutOfRange {
                    position: 32,
                    target: 0x1000,
                    payload_size: 8,
                }
            ));
        }
    }

    #[test]
    fn block_after_other_data() {
        let mut cursor = Cursor::new(vec![0xEE; 8]);
        cursor.seek(SeekFrom::End(0)).unwrap();

        let mut block = BlockWriter::start_write(&mut cursor).unwrap();
        let fixups = block.write(&Pair("ab", "c"), &mut cursor).unwrap();
        let header = block
            .finish_write(0, 32, 0, &fixups, &mut cursor, "")
            .unwrap();

        let buf = cursor.into_inner();
        assert_eq!(&buf[..8], &[0xEE; 8]);
        assert_eq!(buf.len(), 8 + header.block_size as usize);
        // Table entries are relative to the block, not the sink.
        assert_eq!(&buf[8 + 56..8 + 60], &32u32.to_le_bytes());
    }
}
