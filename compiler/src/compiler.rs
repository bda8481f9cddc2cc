use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::{
    error::CloudgenError,
    formatter::Formatters,
    kv::KvGenerator,
    merge::merge,
    output::{write_artifacts, Artifact, OutputLayout},
    rpc::RpcGenerator,
    tdf::TdfGenerator,
    traits::Generator,
    types::Family,
};

/// Everything a generation run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Directory holding the base `tdf.json`, `kv_store.json` and `rpc.json`.
    pub definitions: PathBuf,
    /// Optional directory holding extension documents of the same names.
    pub extensions:  Option<PathBuf>,
    pub layout:      OutputLayout,
    /// Families to generate. Always processed in TDF, KV, RPC order.
    pub families:    Vec<Family>,
    /// Render only, without touching the file system.
    pub dry_run:     bool,
}

/// Read and parse one JSON definition document.
pub fn load_document<D: DeserializeOwned>(path: &Path) -> Result<D, CloudgenError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| CloudgenError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the base document of a family plus its extension, if one exists.
///
/// A missing base document is an error, a missing extension document only
/// means the family has no extension.
pub fn load_family<G: Generator>(
    definitions: &Path,
    extensions:  Option<&Path>,
) -> Result<(G::Document, Option<G::Document>), CloudgenError> {
    let descriptor = G::DESCRIPTOR;
    let base_path = definitions.join(descriptor.schema_file);
    if !base_path.is_file() {
        return Err(CloudgenError::MissingInput {
            family: descriptor.family,
            path:   base_path,
        });
    }
    let base = load_document(&base_path)?;

    let extension = match extensions.map(|dir| dir.join(descriptor.schema_file)) {
        Some(path) if path.is_file() => {
            debug!("{}: loading extension {}", descriptor.family, path.display());
            Some(load_document(&path)?)
        }
        Some(path) => {
            debug!("{}: no extension document at {}", descriptor.family, path.display());
            None
        }
        None => None,
    };
    Ok((base, extension))
}

/// Merge, compile and render one family entirely in memory.
pub fn generate<G: Generator>(
    base:      G::Document,
    extension: Option<G::Document>,
) -> Result<Vec<Artifact>, CloudgenError> {
    let descriptor = G::DESCRIPTOR;
    let extended = extension.is_some();
    let merged = merge(descriptor.family, base, extension, descriptor.id_threshold)?;
    let model = G::compile(&merged)?;
    Ok(G::render(&model, extended))
}

fn run_family<G: Generator>(
    config:     &GeneratorConfig,
    formatters: &Formatters,
) -> Result<Vec<PathBuf>, CloudgenError> {
    let (base, extension) = load_family::<G>(&config.definitions, config.extensions.as_deref())?;
    let artifacts = generate::<G>(base, extension)?;

    if config.dry_run {
        let paths: Vec<PathBuf> = artifacts.iter().map(|a| config.layout.resolve(a)).collect();
        for path in &paths {
            info!("would write {}", path.display());
        }
        return Ok(paths);
    }
    write_artifacts(&artifacts, &config.layout, formatters)
}

/// Generate every selected family, returning the paths written (or, for a
/// dry run, the paths that would have been written).
///
/// The first failing family stops the run. Families already written stay.
pub fn run(
    config:     &GeneratorConfig,
    formatters: &Formatters,
) -> Result<Vec<PathBuf>, CloudgenError> {
    let mut written = Vec::new();
    for family in [Family::Tdf, Family::Kv, Family::Rpc] {
        if !config.families.contains(&family) {
            continue;
        }
        info!("generating {} definitions", family);
        let paths = match family {
            Family::Tdf => run_family::<TdfGenerator>(config, formatters)?,
            Family::Kv  => run_family::<KvGenerator>(config, formatters)?,
            Family::Rpc => run_family::<RpcGenerator>(config, formatters)?,
        };
        written.extend(paths);
    }
    Ok(written)
}
