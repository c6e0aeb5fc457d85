//! Reads the small workspace manifest this demo binary uses in place of
//! real package-manager/lockfile discovery (explicitly out of scope for
//! the core, spec §1) so the wiring below has something concrete to build
//! a [`WorkspaceGraph`] and [`TurboJsonLoader`] from.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::Deserialize;
use taskgraph_pipeline::FsTurboJsonLoader;
use taskgraph_task_id::PackageName;
use taskgraph_workspace::{Package, WorkspaceError, WorkspaceGraph};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{path}`: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to parse manifest `{path}`: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestPackage {
    name: String,
    #[serde(default = "default_dir")]
    dir: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    content_hash: String,
    #[serde(default)]
    external_dependency_fingerprint: String,
}

fn default_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    single_package: bool,
    packages: Vec<ManifestPackage>,
}

/// The outcome of loading a manifest: the workspace graph, plus a
/// filesystem-backed [`FsTurboJsonLoader`] pointed at each package's
/// directory for the Pipeline Resolver to read `turbo.json` from.
pub struct LoadedWorkspace {
    pub graph: WorkspaceGraph,
    pub loader: FsTurboJsonLoader,
}

pub fn load(path: &camino::Utf8Path) -> Result<LoadedWorkspace, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_string(),
        source,
    })?;
    let manifest: Manifest = serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
        path: path.to_string(),
        source,
    })?;

    let mut builder = WorkspaceGraph::builder().single_package(manifest.single_package);
    let mut package_dirs = HashMap::new();
    for p in &manifest.packages {
        let name = PackageName::from(p.name.as_str());
        package_dirs.insert(name.clone(), p.dir.clone());
        builder = builder.add_package(Package {
            name,
            dir: Utf8PathBuf::from(&p.dir),
            scripts: HashMap::new(),
            internal_dependencies: p.dependencies.iter().map(|d| PackageName::from(d.as_str())).collect(),
            external_dependency_fingerprint: p.external_dependency_fingerprint.clone(),
            content_hash: p.content_hash.clone(),
        })?;
    }
    if !package_dirs.contains_key(&PackageName::Root) {
        package_dirs.insert(PackageName::Root, ".".to_string());
    }

    Ok(LoadedWorkspace {
        graph: builder.build()?,
        loader: FsTurboJsonLoader::new(package_dirs),
    })
}
