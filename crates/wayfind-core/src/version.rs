use std::fmt;

use serde::Serialize;

use crate::config::ResolverConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a build of wayfind resolves with out of the box.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<&'static str>,
    pub default_extensions: Vec<String>,
    pub default_description_files: Vec<String>,
}

impl BuildInfo {
    #[must_use]
    pub fn current() -> Self {
        let defaults = ResolverConfig::default();
        Self {
            version: VERSION,
            git_hash: option_env!("WAYFIND_BUILD_GIT_HASH"),
            default_extensions: defaults.extensions,
            default_description_files: defaults.description_files,
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wayfind {}", self.version)?;
        if let Some(hash) = self.git_hash {
            write!(f, " ({hash})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_tool() {
        let info = BuildInfo::current();
        let line = info.to_string();
        assert!(line.starts_with("wayfind "));
        assert!(line.contains(VERSION));
    }

    #[test]
    fn test_build_info_reports_defaults() {
        let json = serde_json::to_value(BuildInfo::current()).unwrap();
        assert_eq!(json["version"], VERSION);
        assert_eq!(json["defaultExtensions"][0], ".js");
        assert_eq!(json["defaultDescriptionFiles"][0], "package.json");
    }
}
