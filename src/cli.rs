use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "fitsutils")]
#[command(about = "Utilities for FITS headers, SCAMP catalogs and head files", long_about = None)]
pub struct Cli {
    /// Raise the debug level to at least 3
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a FITS header to stdout or to a file
    PrintHeader {
        /// Print header to given file
        #[arg(short, long)]
        outfile: Option<PathBuf>,

        /// Extension number or name
        #[arg(short = 'x', long, default_value = "0")]
        extension: String,

        fitsfile: PathBuf,
    },

    /// Combine SCAMP catalogs (3 HDUs each) into a single file
    CombineCats {
        /// Output combined catalog
        #[arg(long)]
        outcat: PathBuf,

        /// Comma separated list of input catalogs
        #[arg(long, required_unless_present = "list", conflicts_with = "list")]
        incats: Option<String>,

        /// File listing input catalogs, one per line
        #[arg(long)]
        list: Option<PathBuf>,
    },

    /// Split a SCAMP .head file into one file per exposure
    SplitScampHead {
        /// Combined SCAMP head file
        #[arg(long = "in")]
        input: PathBuf,

        /// Comma separated list of output head files
        #[arg(long, required_unless_present = "list", conflicts_with = "list")]
        out: Option<String>,

        /// File listing output head files, one per line
        #[arg(long)]
        list: Option<PathBuf>,
    },

    /// Build a multi-extension FITS file from single image files
    MakeMef {
        /// Output MEF file
        #[arg(long)]
        outname: PathBuf,

        /// Comma separated list of input files
        #[arg(long, required_unless_present = "list", conflicts_with = "list")]
        filenames: Option<String>,

        /// File listing input files, one per line
        #[arg(long)]
        list: Option<PathBuf>,

        /// Overwrite an existing output
        #[arg(long)]
        clobber: bool,

        /// Comma separated EXTNAME per input
        #[arg(long)]
        extnames: Option<String>,
    },

    /// Print metadata derived from header keywords
    Metadata {
        fitsfile: PathBuf,

        /// Extension number or name
        #[arg(short = 'x', long)]
        extension: Option<String>,

        /// Comma separated derived fields (default: all)
        #[arg(long)]
        fields: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
