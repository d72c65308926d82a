use std::path::{Path, PathBuf};

use distmerge_merge::AnnotationScheme;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Knobs of a merge run, loadable from TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Scheme name (`CPW`, `NMF`, `API`) or a game version. `None` writes no markers.
    pub annotation: Option<String>,
    /// Add the marker type class definitions to the output.
    pub inject: bool,
    /// Copy the client's non-class entries.
    pub keep_data: bool,
    /// Copy `META-INF` entries too.
    pub keep_meta: bool,
    /// The server input is a bundler container.
    pub bundled: bool,
    pub whitelist: Vec<String>,
    pub whitelist_packages: Vec<String>,
    pub whitelist_maps: Vec<PathBuf>,
    pub blacklist: Vec<String>,
    pub blacklist_packages: Vec<String>,
    pub blacklist_maps: Vec<PathBuf>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            annotation: None,
            inject: true,
            keep_data: false,
            keep_meta: false,
            bundled: false,
            whitelist: Vec::new(),
            whitelist_packages: Vec::new(),
            whitelist_maps: Vec::new(),
            blacklist: Vec::new(),
            blacklist_packages: Vec::new(),
            blacklist_maps: Vec::new(),
        }
    }
}

impl MergeConfig {
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        toml::from_str(&text).map_err(|source| EngineError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the configured annotation to a scheme.
    pub fn scheme(&self) -> EngineResult<Option<AnnotationScheme>> {
        Ok(self
            .annotation
            .as_deref()
            .map(str::parse::<AnnotationScheme>)
            .transpose()?)
    }
}
