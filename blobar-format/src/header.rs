//! Fixed-size on-disk records of the archive container.

/// Every payload starts at a multiple of this many bytes from the archive start.
pub const ALIGNMENT: u32 = 16;

/// The header at offset 0 of every archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub reserved: u32,
    pub header_size: u32,
    pub descriptor_size: u32,
    pub alignment: u32,
}

impl ContainerHeader {
    pub const SIZE: usize = 16;
}

impl Default for ContainerHeader {
    fn default() -> Self {
        ContainerHeader {
            reserved: 0,
            header_size: ContainerHeader::SIZE as u32,
            descriptor_size: EntryDescriptor::SIZE as u32,
            alignment: ALIGNMENT,
        }
    }
}

/// Precedes each entry's name and payload.
///
/// `total_size` covers descriptor, name, padding and payload, so a reader can
/// skip to the next descriptor without looking at anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryDescriptor {
    pub total_size: u32,
    pub data_size: u32,
    /// Distance from the start of this descriptor to the first payload byte.
    pub data_offset: u32,
    pub reserved1: u32,
    pub reserved2: u32,
}

impl EntryDescriptor {
    pub const SIZE: usize = 20;
}
