pub mod catalog;
pub mod cli;
mod engine;
pub mod store;

pub use engine::{build_cluster_from_document, load_document, render_document};

/// Lattice version as provided by environment variables at build time
pub const LATTICE_VERSION: &str = match option_env!("LATTICE_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
