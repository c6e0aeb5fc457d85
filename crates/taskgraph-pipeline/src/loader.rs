use std::{cell::RefCell, collections::HashMap, sync::Arc};

use taskgraph_task_id::PackageName;

use crate::{error::PipelineError, raw::RawTurboJson};

/// Loads and memoises the parsed config for a given package (C7). The
/// resolver treats the filesystem lookup as opaque; this is the seam an
/// embedder swaps to avoid touching disk at all.
pub trait TurboJsonLoader {
    fn load(&self, package: &PackageName) -> Result<Option<Arc<RawTurboJson>>, PipelineError>;
}

/// An in-memory loader backed by a fixed map, used in tests and by
/// embedders that already hold parsed config.
#[derive(Default)]
pub struct MemoryTurboJsonLoader {
    configs: HashMap<PackageName, Arc<RawTurboJson>>,
}

impl MemoryTurboJsonLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, package: PackageName, config: RawTurboJson) -> Self {
        self.configs.insert(package, Arc::new(config));
        self
    }
}

impl TurboJsonLoader for MemoryTurboJsonLoader {
    fn load(&self, package: &PackageName) -> Result<Option<Arc<RawTurboJson>>, PipelineError> {
        Ok(self.configs.get(package).cloned())
    }
}

/// A loader backed by `turbo.json` files on disk, memoising each package's
/// parse result for the lifetime of one engine build (spec §4.7).
pub struct FsTurboJsonLoader {
    package_dirs: HashMap<PackageName, String>,
    cache: RefCell<HashMap<PackageName, Option<Arc<RawTurboJson>>>>,
}

impl FsTurboJsonLoader {
    pub fn new(package_dirs: HashMap<PackageName, String>) -> Self {
        Self {
            package_dirs,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn config_path(&self, package: &PackageName) -> Option<String> {
        self.package_dirs.get(package).map(|dir| {
            if dir.is_empty() || dir == "." {
                "turbo.json".to_owned()
            } else {
                format!("{dir}/turbo.json")
            }
        })
    }
}

impl TurboJsonLoader for FsTurboJsonLoader {
    fn load(&self, package: &PackageName) -> Result<Option<Arc<RawTurboJson>>, PipelineError> {
        if let Some(cached) = self.cache.borrow().get(package) {
            return Ok(cached.clone());
        }
        let Some(path) = self.config_path(package) else {
            self.cache.borrow_mut().insert(package.clone(), None);
            return Ok(None);
        };
        let parsed = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let raw = RawTurboJson::parse(&text)
                    .map_err(|source| crate::error::json_error(source, &path, &text))?;
                Some(Arc::new(raw))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(PipelineError::Io { path, source: err }),
        };
        self.cache
            .borrow_mut()
            .insert(package.clone(), parsed.clone());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawTaskDefinition;

    #[test]
    fn memory_loader_returns_inserted_config() {
        let loader = MemoryTurboJsonLoader::new().with_config(
            PackageName::Root,
            RawTurboJson {
                pipeline: HashMap::from([("build".to_string(), RawTaskDefinition::default())]),
                ..Default::default()
            },
        );
        let loaded = loader.load(&PackageName::Root).unwrap().unwrap();
        assert!(loaded.pipeline.contains_key("build"));
    }

    #[test]
    fn memory_loader_returns_none_for_unregistered_package() {
        let loader = MemoryTurboJsonLoader::new();
        assert!(loader.load(&PackageName::from("libA")).unwrap().is_none());
    }
}
