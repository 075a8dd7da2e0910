use std::path::PathBuf;

use miette::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Cannot open archive `{}`", .path.display())]
    #[diagnostic(help("Is this a valid archive?"))]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: blobar_format::Error,
    },

    #[error("Cannot save archive `{}`", .path.display())]
    SaveArchive {
        path: PathBuf,
        #[source]
        source: blobar_format::Error,
    },

    #[error("Cannot read file `{}`", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write file `{}`", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot derive an entry name from `{}`", .path.display())]
    #[diagnostic(help("Entry names are taken from the file name and must be valid UTF-8"))]
    InvalidFileName { path: PathBuf },

    #[error("Cannot add entry `{name}`")]
    AddEntry {
        name: String,
        #[source]
        source: blobar_format::Error,
    },

    #[error("Refusing to extract entry `{name}` outside the output directory")]
    UnsafeEntryName { name: String },

    #[error("Entry not found: `{name}`")]
    EntryNotFound { name: String },

    #[error("Cannot write packed file info for `{}`", .path.display())]
    PackedFileInfo {
        path: PathBuf,
        #[source]
        source: blobar_format::Error,
    },

    #[error("Cannot serialize listing")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("Archive already exists: `{}`", .path.display())]
    #[diagnostic(help("Use -f/--force to overwrite"))]
    ArchiveExists { path: PathBuf },

    #[error("No files specified to add to archive")]
    #[diagnostic(help("Specify one or more files to archive"))]
    NoFilesSpecified,
}
