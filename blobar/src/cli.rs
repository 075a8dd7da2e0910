use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "blobar",
    about = "Create, modify and extract blobar asset archives.",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(visible_alias = "c", about = "Create a new archive")]
    Create(CreateArgs),

    #[command(visible_alias = "a", about = "Add or replace files in an existing archive")]
    Add(AddArgs),

    #[command(visible_aliases = ["l", "ls"], about = "List entries in an archive")]
    List(ListArgs),

    #[command(visible_alias = "x", about = "Extract entries from an archive")]
    Extract(ExtractArgs),

    #[command(about = "Show archive header fields and totals")]
    Info(InfoArgs),

    #[command(about = "Write the packed file info block for an archive")]
    Pfi(PfiArgs),
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
Each file becomes one entry named after its file name. When two files share a
name, the later one replaces the earlier one in place.

\x1b[1m\x1b[4mExamples:\x1b[0m
  blobar create assets.ar textures/a.dds textures/b.dds
  blobar create -f assets.ar lightmap.png")]
pub struct CreateArgs {
    /// Output archive path
    pub archive: PathBuf,

    /// Overwrite existing archive
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Files to archive
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct AddArgs {
    /// Path to an existing archive
    pub archive: PathBuf,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Files to add; entries with the same name are replaced in place
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Path to the archive
    pub archive: PathBuf,

    /// Output in JSON format
    #[arg(short = 'j', long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive to extract
    pub archive: PathBuf,

    /// Output directory (defaults to current directory)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Specific entries to extract (extracts all if none specified)
    pub names: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct InfoArgs {
    /// Path to the archive
    pub archive: PathBuf,
}

#[derive(Debug, clap::Args)]
pub struct PfiArgs {
    /// Path to the archive to describe
    pub archive: PathBuf,

    /// Output path for the packed file info block
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn create_aliases() {
        let cli = Cli::parse_from(["blobar", "c", "-f", "out.ar", "a.bin", "b.bin"]);
        match cli.command {
            Commands::Create(args) => {
                assert!(args.force);
                assert_eq!(args.archive, PathBuf::from("out.ar"));
                assert_eq!(args.files.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
