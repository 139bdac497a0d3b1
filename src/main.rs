use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context, Error};
use clap::Parser;
use log::{error, info};

use lattice::{
    catalog::Catalog,
    cli::{Cli, Commands},
    store::{EntityStore, MemoryStore},
};

fn main() -> ExitCode {
    let args = Cli::parse();

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(args.verbosity)
        .init();

    let command = args.command.name();
    if let Err(e) = run(args) {
        error!("Command '{command}' failed:\n{e:?}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: Cli) -> Result<(), Error> {
    match args.command {
        Commands::Validate { document } => {
            let doc = load(&document)?;
            info!(
                "Document '{}' is well-formed: cluster '{}' with {} instance(s)",
                document.display(),
                doc.cluster_name,
                doc.instances.len()
            );
        }

        Commands::Build {
            document,
            catalog,
            tenant,
            provider,
        } => {
            let doc = load(&document)?;
            let mut store = seeded_store(&catalog)?;
            let tenant_id = resolve_tenant(&store, &tenant)?;
            let cluster = lattice::build_cluster_from_document(
                &mut store, tenant_id, &provider, &doc,
            )
            .context("Failed to build entity graph")?;
            info!(
                "Built cluster '{}' with {} role link(s)",
                cluster.name,
                store.role_link_count()
            );
        }

        Commands::Roundtrip {
            document,
            catalog,
            tenant,
            provider,
            outfile,
        } => {
            let doc = load(&document)?;
            let mut store = seeded_store(&catalog)?;
            let tenant_id = resolve_tenant(&store, &tenant)?;
            let cluster = lattice::build_cluster_from_document(
                &mut store, tenant_id, &provider, &doc,
            )
            .context("Failed to build entity graph")?;
            let rendered = lattice::render_document(&store, &cluster)
                .context("Failed to regenerate document")?;
            match outfile {
                Some(path) => fs::write(&path, rendered).context(format!(
                    "Failed to write regenerated document to '{}'",
                    path.display()
                ))?,
                None => print!("{rendered}"),
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<lattice_api::document::ClusterDocument, Error> {
    let contents = fs::read_to_string(path)
        .context(format!("Failed to read document '{}'", path.display()))?;
    lattice::load_document(&contents)
        .context(format!("Failed to parse document '{}'", path.display()))
}

fn seeded_store(catalog: &PathBuf) -> Result<MemoryStore, Error> {
    let contents = fs::read_to_string(catalog)
        .context(format!("Failed to read catalog '{}'", catalog.display()))?;
    let catalog = Catalog::from_yaml(&contents).context("Failed to parse catalog")?;
    let mut store = MemoryStore::default();
    catalog.seed(&mut store);
    Ok(store)
}

fn resolve_tenant(store: &MemoryStore, name: &str) -> Result<uuid::Uuid, Error> {
    match store.tenant_by_name(name) {
        Some(tenant) => Ok(tenant.id),
        None => bail!("Tenant '{name}' is not present in the catalog"),
    }
}
