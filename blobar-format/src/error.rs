use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Bytes that violate the archive or relocatable block layout.
///
/// Every variant carries the byte offset at which the problem was found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("truncated {what} at {offset:#x}: need {needed} bytes, {available} available")]
    Truncated {
        what: Structure,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid header size {header_size} at {offset:#x}")]
    InvalidHeaderSize { offset: usize, header_size: u32 },

    #[error("invalid descriptor size {descriptor_size} at {offset:#x}")]
    InvalidDescriptorSize { offset: usize, descriptor_size: u32 },

    #[error("entry at {offset:#x} has total size {total_size}, minimum is {minimum}")]
    EntryTooSmall {
        offset: usize,
        total_size: u32,
        minimum: usize,
    },

    #[error("entry at {offset:#x} ends at {end:#x}, past the end of the buffer ({len:#x})")]
    EntryOutOfBounds { offset: usize, end: usize, len: usize },

    #[error("entry name at {offset:#x} is not terminated")]
    UnterminatedName { offset: usize },

    #[error("entry name at {offset:#x} is empty")]
    EmptyName { offset: usize },

    #[error("entry name at {offset:#x} is not valid UTF-8")]
    InvalidNameEncoding { offset: usize },

    #[error("entry data at {offset:#x} overlaps its descriptor or name (data offset {data_offset})")]
    DataOverlapsName { offset: usize, data_offset: u32 },

    #[error("entry data at {offset:#x} exceeds the entry: data offset {data_offset} + size {data_size} > total size {total_size}")]
    DataOutOfBounds {
        offset: usize,
        data_offset: u32,
        data_size: u32,
        total_size: u32,
    },

    #[error("{what} at {offset:#x} is not terminated")]
    UnterminatedString { what: Structure, offset: usize },

    #[error("{what} at {offset:#x} is not valid UTF-8")]
    InvalidStringEncoding { what: Structure, offset: usize },

    #[error("non-null offset field at {offset:#x} has no fixup")]
    MissingFixup { offset: usize },

    #[error("{what} at {offset:#x} points outside the block ({value:#x})")]
    OffsetOutOfBounds {
        what: Structure,
        offset: usize,
        value: u64,
    },
}

impl FormatError {
    /// Byte offset in the input buffer where the problem was detected.
    pub fn offset(&self) -> usize {
        match *self {
            FormatError::Truncated { offset, .. }
            | FormatError::InvalidHeaderSize { offset, .. }
            | FormatError::InvalidDescriptorSize { offset, .. }
            | FormatError::EntryTooSmall { offset, .. }
            | FormatError::EntryOutOfBounds { offset, .. }
            | FormatError::UnterminatedName { offset }
            | FormatError::EmptyName { offset }
            | FormatError::InvalidNameEncoding { offset }
            | FormatError::DataOverlapsName { offset, .. }
            | FormatError::DataOutOfBounds { offset, .. }
            | FormatError::UnterminatedString { offset, .. }
            | FormatError::InvalidStringEncoding { offset, .. }
            | FormatError::MissingFixup { offset }
            | FormatError::OffsetOutOfBounds { offset, .. } => offset,
        }
    }
}

/// The on-disk structure a [FormatError] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    ContainerHeader,
    EntryDescriptor,
    RelocatableHeader,
    Payload,
    FixupTable,
    Fixup,
    Extra,
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Structure::ContainerHeader => "container header",
            Structure::EntryDescriptor => "entry descriptor",
            Structure::RelocatableHeader => "relocatable header",
            Structure::Payload => "payload",
            Structure::FixupTable => "fixup table",
            Structure::Fixup => "fixup",
            Structure::Extra => "extra string",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{field} of {value} does not fit in 32 bits")]
    TooLarge { field: &'static str, value: u64 },

    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("header size {given} does not match the reserved header size {reserved}")]
    HeaderSizeMismatch { given: u32, reserved: u32 },

    #[error("fixup at {position:#x} lies outside the payload [{start:#x}, {end:#x})")]
    FixupOutOfRange { position: u64, start: u64, end: u64 },

    #[error("root offset {root_offset:#x} lies outside the payload of {payload_size} bytes")]
    RootOutOfRange { root_offset: u64, payload_size: u64 },

    #[error("offset field at {position:#x} points at {target:#x}, outside the payload of {payload_size} bytes")]
    TargetOutOfRange {
        position: u64,
        target: u64,
        payload_size: u64,
    },
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        use std::io::ErrorKind;

        match e {
            Error::Io(e) => e,
            Error::Format(_) => std::io::Error::new(ErrorKind::InvalidData, e),
            Error::TooLarge { .. }
            | Error::InvalidName { .. }
            | Error::HeaderSizeMismatch { .. }
            | Error::FixupOutOfRange { .. }
            | Error::RootOutOfRange { .. }
            | Error::TargetOutOfRange { .. } => std::io::Error::new(ErrorKind::InvalidInput, e),
        }
    }
}

pub(crate) fn to_u32(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::TooLarge { field, value })
}
