use byteorder::{ByteOrder, LittleEndian};

use super::{RelocatableHeader, OFFSET_SIZE};
use crate::error::Structure;
use crate::parse::{u32_at, u64_at};
use crate::FormatError;

/// A finished relocatable block, validated and ready to be walked.
///
/// Every fixup is known to point at an offset field inside the payload, and
/// every such field is known to point back into the payload.
#[derive(Debug, Clone)]
pub struct RelocatableBlock<'a> {
    header: RelocatableHeader,
    data: &'a [u8],
    fixups: Vec<u32>,
    extra: Option<&'a str>,
}

fn parse_header(data: &[u8]) -> Result<RelocatableHeader, FormatError> {
    if data.len() < RelocatableHeader::SIZE {
        return Err(FormatError::Truncated {
            what: Structure::RelocatableHeader,
            offset: 0,
            needed: RelocatableHeader::SIZE,
            available: data.len(),
        });
    }

    Ok(RelocatableHeader {
        block_size: u32_at(data, 0x00),
        flags: u32_at(data, 0x04),
        payload_offset: u32_at(data, 0x08),
        payload_size: u32_at(data, 0x0C),
        fixup_table_offset: u32_at(data, 0x10),
        fixup_count: u32_at(data, 0x14),
        root_offset: u32_at(data, 0x18),
        extra_offset: u32_at(data, 0x1C),
    })
}

fn parse_c_str(data: &[u8], what: Structure, offset: usize) -> Result<&str, FormatError> {
    let len = data
        .get(offset..)
        .and_then(|rest| rest.iter().position(|b| *b == 0))
        .ok_or(FormatError::UnterminatedString { what, offset })?;

    std::str::from_utf8(&data[offset..offset + len])
        .map_err(|_| FormatError::InvalidStringEncoding { what, offset })
}

impl<'a> RelocatableBlock<'a> {
    /// Validate the block at the start of `data`.
    ///
    /// Bytes past `block_size` are ignored.
    pub fn parse(data: &'a [u8]) -> Result<RelocatableBlock<'a>, FormatError> {
        let header = parse_header(data)?;

        let block_size = header.block_size as usize;
        if block_size < RelocatableHeader::SIZE || block_size > data.len() {
            return Err(FormatError::Truncated {
                what: Structure::RelocatableHeader,
                offset: 0,
                needed: block_size.max(RelocatableHeader::SIZE),
                available: data.len(),
            });
        }
        let data = &data[..block_size];

        let payload = header.payload_range();
        if payload.start < RelocatableHeader::SIZE || payload.end > block_size {
            return Err(FormatError::OffsetOutOfBounds {
                what: Structure::Payload,
                offset: 0x08,
                value: header.payload_offset as u64,
            });
        }

        let table_start = header.fixup_table_offset as usize;
        let table_end = table_start as u64 + header.fixup_count as u64 * 4;
        if table_start < payload.end || table_end > block_size as u64 {
            return Err(FormatError::OffsetOutOfBounds {
                what: Structure::FixupTable,
                offset: 0x10,
                value: header.fixup_table_offset as u64,
            });
        }

        let mut fixups = Vec::with_capacity(header.fixup_count as usize);
        for i in 0..header.fixup_count as usize {
            let entry = table_start + i * 4;
            let position = u32_at(data, entry);
            let field = position as usize;

            if field < payload.start || field + OFFSET_SIZE > payload.end {
                return Err(FormatError::OffsetOutOfBounds {
                    what: Structure::Fixup,
                    offset: entry,
                    value: position as u64,
                });
            }

            let value = u64_at(data, field);
            if value >= header.payload_size as u64 {
                return Err(FormatError::OffsetOutOfBounds {
                    what: Structure::Payload,
                    offset: field,
                    value,
                });
            }

            fixups.push(position);
        }
        fixups.sort_unstable();

        if header.root_offset != 0 && header.root_offset >= header.payload_size {
            return Err(FormatError::OffsetOutOfBounds {
                what: Structure::Payload,
                offset: 0x18,
                value: header.root_offset as u64,
            });
        }

        let extra = match header.extra_offset as usize {
            0 => None,
            offset if offset < table_end as usize => {
                return Err(FormatError::OffsetOutOfBounds {
                    what: Structure::Extra,
                    offset: 0x1C,
                    value: offset as u64,
                })
            }
            offset => Some(parse_c_str(data, Structure::Extra, offset)?),
        };

        tracing::debug!(
            end = format_args!("{:#x}", block_size),
            payload = format_args!("{:#x}", payload.start),
            bytes = block_size,
            fixups = fixups.len(),
            "deserialized RelocatableBlock"
        );

        Ok(RelocatableBlock {
            header,
            data,
            fixups,
            extra,
        })
    }

    #[inline(always)]
    pub fn header(&self) -> &RelocatableHeader {
        &self.header
    }

    #[inline(always)]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.header.payload_range()]
    }

    /// The root object's position inside the payload.
    #[inline(always)]
    pub fn root(&self) -> u64 {
        self.header.root_offset as u64
    }

    /// Block positions of the offset fields, ascending.
    pub fn fixups(&self) -> impl Iterator<Item = u32> + '_ {
        self.fixups.iter().copied()
    }

    pub fn extra(&self) -> Option<&'a str> {
        self.extra
    }

    fn payload_slice(&self, pos: u64, len: usize) -> Result<&'a [u8], FormatError> {
        let payload = self.payload();
        let start = pos as usize;
        match payload.get(start..start.saturating_add(len)) {
            Some(bytes) => Ok(bytes),
            None => Err(FormatError::Truncated {
                what: Structure::Payload,
                offset: (self.header.payload_offset as usize).saturating_add(start),
                needed: len,
                available: payload.len().saturating_sub(start),
            }),
        }
    }

    /// Read a u32 at payload position `pos`.
    pub fn read_u32(&self, pos: u64) -> Result<u32, FormatError> {
        Ok(LittleEndian::read_u32(self.payload_slice(pos, 4)?))
    }

    /// Read the offset field at payload position `pos`.
    ///
    /// Returns `None` for a null field. A non-zero field without a fixup is
    /// not an offset a loader would relocate, so it is an error.
    pub fn read_offset(&self, pos: u64) -> Result<Option<u64>, FormatError> {
        let value = LittleEndian::read_u64(self.payload_slice(pos, OFFSET_SIZE)?);
        let field = self.header.payload_offset as u64 + pos;

        let has_fixup = u32::try_from(field)
            .map(|f| self.fixups.binary_search(&f).is_ok())
            .unwrap_or(false);

        match (has_fixup, value) {
            (true, value) => Ok(Some(value)),
            (false, 0) => Ok(None),
            (false, _) => Err(FormatError::MissingFixup {
                offset: field as usize,
            }),
        }
    }

    /// Read a NUL-terminated string at payload position `pos`.
    pub fn read_c_str(&self, pos: u64) -> Result<&'a str, FormatError> {
        let payload_end = self.header.payload_range().end;
        let offset = (self.header.payload_offset as usize).saturating_add(pos as usize);
        if offset >= payload_end {
            return Err(FormatError::Truncated {
                what: Structure::Payload,
                offset,
                needed: 1,
                available: 0,
            });
        }

        parse_c_str(&self.data[..payload_end], Structure::Payload, offset)
    }
}

/// Rewrite every offset field of the block at the start of `data` into an
/// absolute address, assuming the block is loaded at `base_address`.
///
/// A field holding `v` becomes `base_address + payload_offset + v`. The block
/// is validated first; nothing is modified if it is malformed.
pub fn resolve_in_place(
    data: &mut [u8],
    base_address: u64,
) -> Result<RelocatableHeader, FormatError> {
    let (header, fixups) = {
        let block = RelocatableBlock::parse(data)?;
        (*block.header(), block.fixups().collect::<Vec<_>>())
    };

    let payload_base = base_address + header.payload_offset as u64;
    for position in fixups {
        let field = &mut data[position as usize..position as usize + OFFSET_SIZE];
        let value = LittleEndian::read_u64(field);
        LittleEndian::write_u64(field, payload_base + value);
    }

    tracing::debug!(
        base = format_args!("{:#x}", base_address),
        fixups = header.fixup_count,
        "resolved relocatable block"
    );

    Ok(header)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek, Write};

    use super::*;
    use crate::reloc::{BlockWriter, PayloadWriter, Relocatable};

    struct Chain;

    impl Relocatable for Chain {
        fn write_relocatable<W: Write + Seek>(
            &self,
            out: &mut PayloadWriter<'_, W>,
        ) -> std::io::Result<()> {
            let next = out.reserve_offset()?;
            out.write_null_offset()?;
            out.write_u32(0xDEAD_BEEF)?;
            out.pad(8)?;
            out.fill_offset(next)?;
            out.write_c_str("tail")
        }
    }

    fn chain_block(extra: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut block = BlockWriter::start_write(&mut cursor).unwrap();
        let fixups = block.write(&Chain, &mut cursor).unwrap();
        block
            .finish_write(0, 32, 0, &fixups, &mut cursor, extra)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn walk() {
        let buf = chain_block("chain");
        let block = RelocatableBlock::parse(&buf).unwrap();

        assert_eq!(block.fixups().collect::<Vec<_>>(), [32]);
        assert_eq!(block.read_offset(0).unwrap(), Some(24));
        assert_eq!(block.read_offset(8).unwrap(), None);
        assert_eq!(block.read_u32(16).unwrap(), 0xDEAD_BEEF);
        assert_eq!(block.read_c_str(24).unwrap(), "tail");
        assert_eq!(block.extra(), Some("chain"));
    }

    #[test]
    fn positions_past_payload() {
        let buf = chain_block("");
        let block = RelocatableBlock::parse(&buf).unwrap();
        let size = block.header().payload_size as u64;

        for pos in [size, u64::MAX] {
            assert!(matches!(
                block.read_c_str(pos),
                Err(FormatError::Truncated {
                    what: Structure::Payload,
                    ..
                })
            ));
            assert!(matches!(
                block.read_u32(pos),
                Err(FormatError::Truncated { .. })
            ));
            assert!(matches!(
                block.read_offset(pos),
                Err(FormatError::Truncated { .. })
            ));
        }
    }

    #[test]
    fn fields_without_fixups_are_not_offsets() {
        let buf = chain_block("");
        let block = RelocatableBlock::parse(&buf).unwrap();

        assert!(matches!(
            block.read_offset(16),
            Err(FormatError::MissingFixup { offset: 48 })
        ));
    }

    #[test]
    fn resolve() {
        let mut buf = chain_block("");
        let header = resolve_in_place(&mut buf, 0x1000_0000).unwrap();

        let address = LittleEndian::read_u64(&buf[32..40]);
        assert_eq!(address, 0x1000_0000 + 32 + 24);

        let start = 0x1000_0000 + header.payload_offset as u64;
        assert!(address >= start && address < start + header.payload_size as u64);

        // Null fields stay null.
        assert_eq!(LittleEndian::read_u64(&buf[40..48]), 0);
    }

    #[test]
    fn truncated_block() {
        let buf = chain_block("");
        let err = RelocatableBlock::parse(&buf[..buf.len() - 4]).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Truncated {
                what: Structure::RelocatableHeader,
                ..
            }
        ));
    }

    #[test]
    fn fixup_pointing_outside_payload() {
        let mut buf = chain_block("");
        let table = u32_at(&buf, 0x10) as usize;
        buf[table..table + 4].copy_from_slice(&4u32.to_le_bytes());

        let err = RelocatableBlock::parse(&buf).unwrap_err();
        assert!(matches!(
            err,
            FormatError::OffsetOutOfBounds {
                what: Structure::Fixup,
                ..
            }
        ));
        assert_eq!(err.offset(), table);
    }

    #[test]
    fn offset_value_outside_payload() {
        let mut buf = chain_block("");
        buf[32..40].copy_from_slice(&0xFFFFu64.to_le_bytes());

        let before = buf.clone();
        let err = resolve_in_place(&mut buf, 0).unwrap_err();
        assert_eq!(err.offset(), 32);
        assert_eq!(buf, before);
    }
}
