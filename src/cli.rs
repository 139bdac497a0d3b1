use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::LATTICE_VERSION;

#[derive(Parser, Debug)]
#[clap(version = LATTICE_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that a topology document deserializes cleanly
    Validate {
        /// Path to a topology document
        #[clap(index = 1)]
        document: PathBuf,
    },

    /// Build the entity graph described by a topology document
    Build {
        /// Path to a topology document
        #[clap(index = 1)]
        document: PathBuf,

        /// Path to the reference-data catalog to resolve against
        #[clap(short, long)]
        catalog: PathBuf,

        /// Tenant that will own the cluster
        #[clap(short, long)]
        tenant: String,

        /// Provider the cluster is hosted on
        #[clap(short, long, default_value = lattice_api::constants::DEFAULT_PROVIDER_NAME)]
        provider: String,
    },

    /// Build a document's graph, then regenerate a document from it
    Roundtrip {
        /// Path to a topology document
        #[clap(index = 1)]
        document: PathBuf,

        /// Path to the reference-data catalog to resolve against
        #[clap(short, long)]
        catalog: PathBuf,

        /// Tenant that will own the cluster
        #[clap(short, long)]
        tenant: String,

        /// Provider the cluster is hosted on
        #[clap(short, long, default_value = lattice_api::constants::DEFAULT_PROVIDER_NAME)]
        provider: String,

        /// Path to save the regenerated document, defaults to stdout
        #[clap(short, long)]
        outfile: Option<PathBuf>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Build { .. } => "build",
            Commands::Roundtrip { .. } => "roundtrip",
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}
