use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wayfind_util::get_paths;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Looks for the module in every `directories` entry of `path` and each
/// of its ancestors, nearest first.
pub struct ModulesInHierarchicalDirectoriesPlugin {
    directories: Vec<String>,
    target: HookName,
}

impl ModulesInHierarchicalDirectoriesPlugin {
    #[must_use]
    pub fn new(directories: Vec<String>, target: HookName) -> Self {
        Self {
            directories,
            target,
        }
    }
}

impl Plugin for ModulesInHierarchicalDirectoriesPlugin {
    fn name(&self) -> &'static str {
        "ModulesInHierarchicalDirectoriesPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(path) = request.path.as_deref() else {
                return Ok(Outcome::Continue);
            };
            let req = request.request.as_deref().unwrap_or("");
            let addresses: Vec<String> = get_paths(path)
                .paths
                .iter()
                .flat_map(|dir| self.directories.iter().map(|m| resolver.join(dir, m)))
                .collect();

            for address in addresses {
                let is_dir = ctx
                    .fs()
                    .stat(&address)
                    .await
                    .is_ok_and(|stat| stat.is_dir());
                if !is_dir {
                    ctx.log(|| format!("{address} doesn't exist or is not a directory"));
                    ctx.add_missing_dependency(&address);
                    continue;
                }

                let message = format!("looking for modules in {address}");
                let mut obj = request.clone();
                obj.path = Some(address);
                obj.request = Some(format!("./{req}"));
                obj.module = false;
                if let Some(found) = resolver
                    .do_resolve(&self.target, obj, Some(message), ctx)
                    .await?
                {
                    return Ok(Outcome::Resolved(found));
                }
            }
            Ok(Outcome::Continue)
        }
        .boxed_local()
    }
}

/// Looks for the module in one absolute directory.
pub struct ModulesInRootPlugin {
    root: String,
    target: HookName,
}

impl ModulesInRootPlugin {
    #[must_use]
    pub fn new(root: impl Into<String>, target: HookName) -> Self {
        Self {
            root: root.into(),
            target,
        }
    }
}

impl Plugin for ModulesInRootPlugin {
    fn name(&self) -> &'static str {
        "ModulesInRootPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let mut obj = request.clone();
            obj.path = Some(self.root.clone());
            obj.request = Some(format!("./{}", request.request.as_deref().unwrap_or("")));
            obj.module = false;

            let message = format!("looking for modules in {}", self.root);
            let result = resolver
                .do_resolve(&self.target, obj, Some(message), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}
