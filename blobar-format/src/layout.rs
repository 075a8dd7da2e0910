//! Offset arithmetic shared by the archive writer and the packed file info
//! builder. Positions are absolute sink positions, so payload alignment holds
//! wherever the archive is written.

use crate::error::to_u32;
use crate::header::{ContainerHeader, EntryDescriptor, ALIGNMENT};
use crate::{Archive, Entry, Result};

/// Round `offset` up to the next multiple of `alignment`.
///
/// An alignment of 0 leaves the offset alone.
#[inline]
pub fn align_up(offset: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return offset;
    }

    match offset % alignment {
        0 => offset,
        diff => offset + (alignment - diff),
    }
}

/// Where one entry lands in the serialized archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLayout {
    /// Position of the entry's descriptor.
    pub start: u64,
    /// Position of the first payload byte, always a multiple of [ALIGNMENT].
    pub data_start: u64,
    pub descriptor: EntryDescriptor,
}

impl EntryLayout {
    /// Position just past the payload, where the next descriptor goes.
    #[inline(always)]
    pub fn end(&self) -> u64 {
        self.start + self.descriptor.total_size as u64
    }

    /// Zero bytes between the name terminator and the payload.
    pub fn padding(&self, name_len: usize) -> u64 {
        self.data_start - (self.start + EntryDescriptor::SIZE as u64 + name_len as u64 + 1)
    }
}

/// Lay out a single entry whose descriptor begins at `start`.
pub fn entry_layout(start: u64, entry: &Entry) -> Result<EntryLayout> {
    let name_bytes = entry.name().len() as u64 + 1;
    let data_start = align_up(
        start + EntryDescriptor::SIZE as u64 + name_bytes,
        ALIGNMENT as u64,
    );
    let data_len = entry.len() as u64;

    let descriptor = EntryDescriptor {
        total_size: to_u32("entry total size", data_start + data_len - start)?,
        data_size: to_u32("entry data size", data_len)?,
        data_offset: to_u32("entry data offset", data_start - start)?,
        reserved1: 0,
        reserved2: 0,
    };

    Ok(EntryLayout {
        start,
        data_start,
        descriptor,
    })
}

/// Lay out every entry of `archive`, in order, for an archive starting at
/// position 0.
pub fn plan(archive: &Archive) -> Result<Vec<EntryLayout>> {
    plan_at(archive, 0)
}

/// Lay out every entry of `archive` for a container header written at `base`.
pub fn plan_at(archive: &Archive, base: u64) -> Result<Vec<EntryLayout>> {
    let mut pos = base + ContainerHeader::SIZE as u64;
    let mut out = Vec::with_capacity(archive.len());

    for entry in archive.iter() {
        let layout = entry_layout(pos, entry)?;
        pos = layout.end();
        out.push(layout);
    }

    // Entry positions are u32 too, so the whole buffer must stay addressable.
    to_u32("archive size", pos - base)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
        assert_eq!(align_up(13, 4), 16);
        assert_eq!(align_up(13, 0), 13);
    }

    #[test]
    fn plan_small_archive() {
        let mut archive = Archive::new();
        archive.add_or_replace("a.txt", b"xyz".to_vec()).unwrap();
        archive.add_or_replace("bb", Vec::new()).unwrap();

        let layout = plan(&archive).unwrap();

        // 16 + 20 + "a.txt\0" = 42, aligned to 48.
        assert_eq!(layout[0].start, 16);
        assert_eq!(layout[0].data_start, 48);
        assert_eq!(layout[0].descriptor.data_offset, 32);
        assert_eq!(layout[0].descriptor.data_size, 3);
        assert_eq!(layout[0].descriptor.total_size, 35);
        assert_eq!(layout[0].padding(5), 6);

        // 51 + 20 + "bb\0" = 74, aligned to 80.
        assert_eq!(layout[1].start, 51);
        assert_eq!(layout[1].data_start, 80);
        assert_eq!(layout[1].descriptor.data_offset, 29);
        assert_eq!(layout[1].descriptor.data_size, 0);
        assert_eq!(layout[1].descriptor.total_size, 29);
        assert_eq!(layout[1].end(), 80);
    }

    #[test]
    fn unaligned_base() {
        let mut archive = Archive::new();
        archive.add_or_replace("a.txt", b"xyz".to_vec()).unwrap();

        let layout = plan_at(&archive, 8).unwrap();

        // 8 + 16 + 20 + "a.txt\0" = 50, aligned to 64.
        assert_eq!(layout[0].start, 24);
        assert_eq!(layout[0].data_start, 64);
        assert_eq!(layout[0].descriptor.data_offset, 40);
        assert_eq!(layout[0].descriptor.total_size, 43);
        assert_eq!(layout[0].padding(5), 14);
    }

    #[test]
    fn every_payload_is_aligned() {
        let mut archive = Archive::new();
        for i in 0..40 {
            archive
                .add_or_replace("n".repeat(i + 1), vec![0xAB; i * 7])
                .unwrap();
        }

        for layout in plan(&archive).unwrap() {
            assert_eq!(layout.data_start % ALIGNMENT as u64, 0);
        }
    }
}
