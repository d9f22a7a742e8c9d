use std::cell::RefCell;
use std::path::Path;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use wayfind_core::{Resolution, ResolveContext, Resolver};

use super::{base_dir, display_path, load_config, print_json, resolve_once, ResolveOutput};
use crate::ResolveArgs;

#[derive(Debug, Serialize)]
struct ExplainOutput {
    #[serde(flatten)]
    result: ResolveOutput,
    steps: Vec<String>,
}

/// Resolve `request` with a step log attached and print the log
/// followed by the outcome. Failures are part of the explanation, so
/// this always exits successfully once resolution ran.
pub fn run(cwd: &Path, request: &str, options: &ResolveArgs, json: bool) -> Result<()> {
    let config = load_config(cwd, options)?;
    let resolver = Resolver::new(config).into_diagnostic()?;
    let dir = base_dir(cwd, options)?;
    let from = dir.to_string_lossy().into_owned();

    let steps = RefCell::new(Vec::new());
    let log = |line: &str| steps.borrow_mut().push(line.to_string());
    let ctx = ResolveContext::new().with_log(&log);
    let outcome = resolve_once(&resolver, &from, request, &ctx, options.sync)?;
    let steps = steps.borrow().clone();

    if json {
        return print_json(&ExplainOutput {
            result: ResolveOutput::new(request, &from, &outcome),
            steps,
        });
    }

    for step in &steps {
        println!("{}", step.replace('\0', ""));
    }
    println!();
    match outcome {
        Ok(Resolution::Found { path, .. }) => println!("resolved: {}", display_path(&path)),
        Ok(Resolution::Ignored) => println!("ignored"),
        Ok(Resolution::Yielded) => println!("yielded"),
        Err(err) => println!("failed: {err}"),
    }
    Ok(())
}
