use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Options for building a resolver.
///
/// Deserializes from camelCase JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Suffixes tried, in order, after the bare path.
    pub extensions: Vec<String>,

    /// Description file fields naming a package's entry point.
    pub main_fields: Vec<String>,

    /// File names tried inside a directory.
    pub main_files: Vec<String>,

    /// Conditions honoured by exports and imports fields.
    pub condition_names: Vec<String>,

    pub exports_fields: Vec<String>,

    pub imports_fields: Vec<String>,

    /// Module directories. Names are looked up in every ancestor;
    /// absolute paths are searched as-is.
    pub modules: Vec<String>,

    pub description_files: Vec<String>,

    /// Request rewrites. Values are a path, a list of paths or `false`.
    pub alias: Map<String, Value>,

    /// Resolve symlinks to their real paths.
    pub symlinks: bool,

    /// Disallow extension and directory probing for top-level requests.
    pub fully_specified: bool,

    /// Never try the path without an extension appended.
    pub enforce_extension: bool,

    /// Lifetime of cached filesystem results. Zero only coalesces.
    pub cache_duration_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            extensions: strings(&[".js", ".json", ".node"]),
            main_fields: strings(&["main"]),
            main_files: strings(&["index"]),
            condition_names: Vec::new(),
            exports_fields: strings(&["exports"]),
            imports_fields: strings(&["imports"]),
            modules: strings(&["node_modules"]),
            description_files: strings(&["package.json"]),
            alias: Map::new(),
            symlinks: true,
            fully_specified: false,
            enforce_extension: false,
            cache_duration_ms: 4000,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl ResolverConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration_ms)
    }

    #[must_use]
    pub fn with_extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_condition_names<S: Into<String>>(
        mut self,
        conditions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.condition_names = conditions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_modules<S: Into<String>>(mut self, modules: impl IntoIterator<Item = S>) -> Self {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_main_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.main_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add one alias entry.
    #[must_use]
    pub fn with_alias(mut self, name: impl Into<String>, target: Value) -> Self {
        self.alias.insert(name.into(), target);
        self
    }

    #[must_use]
    pub fn with_symlinks(mut self, symlinks: bool) -> Self {
        self.symlinks = symlinks;
        self
    }

    #[must_use]
    pub fn with_fully_specified(mut self, fully_specified: bool) -> Self {
        self.fully_specified = fully_specified;
        self
    }

    #[must_use]
    pub fn with_enforce_extension(mut self, enforce: bool) -> Self {
        self.enforce_extension = enforce;
        self
    }

    #[must_use]
    pub fn with_cache_duration_ms(mut self, ms: u64) -> Self {
        self.cache_duration_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.extensions, vec![".js", ".json", ".node"]);
        assert_eq!(config.main_files, vec!["index"]);
        assert!(config.symlinks);
        assert_eq!(config.cache_duration(), Duration::from_secs(4));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ResolverConfig = serde_json::from_value(json!({
            "conditionNames": ["import", "node"],
            "alias": { "react$": "preact/compat" },
            "cacheDurationMs": 0
        }))
        .unwrap();
        assert_eq!(config.condition_names, vec!["import", "node"]);
        assert_eq!(config.alias.len(), 1);
        assert_eq!(config.cache_duration_ms, 0);
        assert_eq!(config.modules, vec!["node_modules"]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ResolverConfig::load(&missing),
            Err(Error::ConfigRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        let mut file = std::fs::File::create(&bad).unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            ResolverConfig::load(&bad),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_builders() {
        let config = ResolverConfig::new()
            .with_extensions([".ts"])
            .with_condition_names(["import"])
            .with_alias("fs", json!(false))
            .with_symlinks(false)
            .with_cache_duration_ms(250);
        assert_eq!(config.extensions, vec![".ts"]);
        assert_eq!(config.alias.get("fs"), Some(&json!(false)));
        assert!(!config.symlinks);
        assert_eq!(config.cache_duration_ms, 250);
    }
}
