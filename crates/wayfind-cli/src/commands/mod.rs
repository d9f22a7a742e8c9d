pub mod explain;
pub mod resolve;
pub mod version;

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::Value;
use wayfind_core::{Error, Resolution, ResolveContext, Resolver, ResolverConfig};

use crate::ResolveArgs;

/// Resolver config from `--config` plus per-flag overrides. A relative
/// config path is taken from `cwd`.
pub fn load_config(cwd: &Path, options: &ResolveArgs) -> Result<ResolverConfig> {
    let mut config = match &options.config {
        Some(path) => ResolverConfig::load(&cwd.join(path)).into_diagnostic()?,
        None => ResolverConfig::default(),
    };
    if !options.conditions.is_empty() {
        config = config.with_condition_names(options.conditions.iter().cloned());
    }
    if !options.extensions.is_empty() {
        config = config.with_extensions(options.extensions.iter().cloned());
    }
    if let Some(ms) = options.cache_ms {
        config = config.with_cache_duration_ms(ms);
    }
    Ok(config)
}

/// The directory requests are resolved from.
pub fn base_dir(cwd: &Path, options: &ResolveArgs) -> Result<PathBuf> {
    let dir = match &options.from {
        Some(from) if from.is_absolute() => from.clone(),
        Some(from) => cwd.join(from),
        None => cwd.to_path_buf(),
    };
    dunce::canonicalize(&dir).into_diagnostic()
}

/// Run one resolution, blocking or on a current-thread runtime.
pub fn resolve_once(
    resolver: &Resolver,
    dir: &str,
    request: &str,
    ctx: &ResolveContext<'_>,
    sync: bool,
) -> Result<std::result::Result<Resolution, Error>> {
    if sync {
        return Ok(resolver.resolve_sync_with(Value::Null, dir, request, ctx));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    Ok(runtime.block_on(resolver.resolve(Value::Null, dir, request, ctx)))
}

/// Machine-readable outcome of a resolution.
#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    pub request: String,
    pub from: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolveOutput {
    pub fn new(request: &str, from: &str, outcome: &std::result::Result<Resolution, Error>) -> Self {
        let (status, path, error) = match outcome {
            Ok(Resolution::Found { path, .. }) => ("found", Some(display_path(path)), None),
            Ok(Resolution::Ignored) => ("ignored", None, None),
            Ok(Resolution::Yielded) => ("yielded", None, None),
            Err(err) => ("error", None, Some(err.to_string())),
        };
        Self {
            request: request.to_string(),
            from: from.to_string(),
            status,
            path,
            error,
        }
    }
}

/// Drop the `\0` escapes the resolver puts in front of a literal `#`.
#[must_use]
pub fn display_path(path: &str) -> String {
    path.replace("\0#", "#")
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_unescapes_hash() {
        assert_eq!(display_path("/a/b\0#c.js?x#y"), "/a/b#c.js?x#y");
    }

    #[test]
    fn test_output_for_error() {
        let outcome = Err(Error::NotSync);
        let output = ResolveOutput::new("./x", "/app", &outcome);
        assert_eq!(output.status, "error");
        assert!(output.path.is_none());
        assert!(output.error.unwrap().contains("synchronously"));
    }
}
