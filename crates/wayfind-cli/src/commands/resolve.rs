use std::path::Path;

use miette::{miette, IntoDiagnostic, Result};
use tracing::debug;
use wayfind_core::{Resolution, ResolveContext, Resolver};

use super::{base_dir, display_path, load_config, print_json, resolve_once, ResolveOutput};
use crate::ResolveArgs;

/// Resolve `request` and print the resulting path.
///
/// An ignored request prints nothing. A failure is reported as an error
/// (in JSON mode, as an `"error"` status) and exits non-zero.
pub fn run(cwd: &Path, request: &str, options: &ResolveArgs, json: bool) -> Result<()> {
    let config = load_config(cwd, options)?;
    let resolver = Resolver::new(config).into_diagnostic()?;
    let dir = base_dir(cwd, options)?;
    let from = dir.to_string_lossy().into_owned();
    debug!(request, from = %from, sync = options.sync, "resolving");

    let outcome = resolve_once(&resolver, &from, request, &ResolveContext::new(), options.sync)?;

    if json {
        let failed = outcome.is_err();
        print_json(&ResolveOutput::new(request, &from, &outcome))?;
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    match outcome {
        Ok(Resolution::Found { path, .. }) => {
            println!("{}", display_path(&path));
            Ok(())
        }
        Ok(Resolution::Ignored | Resolution::Yielded) => Ok(()),
        Err(err) => Err(miette!("{err}")),
    }
}
