//! Herein lies the brains of the `blobar` asset archive format.
//!
//! An [Archive] is an ordered list of named byte blobs. Use [write_archive] to
//! serialize one and [read_archive] to get it back. Metadata that carries
//! internal offsets goes through the relocatable block protocol in [reloc],
//! the [PackedFileInfo] table being the record this crate emits that way.

mod archive;
mod entry;
mod error;
pub mod file;
pub mod header;
pub mod layout;
pub mod parse;
pub mod pfi;
pub mod reloc;
mod ser;

pub use archive::Archive;
pub use entry::{Entry, EntryKind};
pub use error::{Error, FormatError, Result, Structure};
pub use file::{load_archive, save_archive};
pub use parse::{
    read_archive, read_archive_from, read_archive_into, read_entry_positions, EntryPosition,
};
pub use pfi::{write_packed_file_info, PackedFileEntry, PackedFileInfo};
pub use reloc::{BlockWriter, FixupTable, PayloadWriter, Relocatable, RelocatableBlock};
pub use ser::write_archive;
