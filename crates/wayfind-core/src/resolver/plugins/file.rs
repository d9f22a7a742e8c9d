use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Joins a fixed file name (such as `index`) onto `path`.
pub struct UseFilePlugin {
    filename: String,
    target: HookName,
}

impl UseFilePlugin {
    #[must_use]
    pub fn new(filename: impl Into<String>, target: HookName) -> Self {
        Self {
            filename: filename.into(),
            target,
        }
    }
}

impl Plugin for UseFilePlugin {
    fn name(&self) -> &'static str {
        "UseFilePlugin"
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
            let file_path = resolver.join(path, &self.filename);
            let message = format!("using path: {file_path}");

            let mut obj = request.clone();
            obj.relative_path = request
                .relative_path
                .as_deref()
                .map(|rel| resolver.join(rel, &self.filename));
            obj.path = Some(file_path);

            let result = resolver
                .do_resolve(&self.target, obj, Some(message), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}

/// Appends a suffix (an extension) to `path`.
pub struct AppendPlugin {
    suffix: String,
    target: HookName,
}

impl AppendPlugin {
    #[must_use]
    pub fn new(suffix: impl Into<String>, target: HookName) -> Self {
        Self {
            suffix: suffix.into(),
            target,
        }
    }
}

impl Plugin for AppendPlugin {
    fn name(&self) -> &'static str {
        "AppendPlugin"
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
            let mut obj = request.clone();
            obj.path = Some(format!("{path}{}", self.suffix));
            obj.relative_path = request
                .relative_path
                .as_deref()
                .map(|rel| format!("{rel}{}", self.suffix));

            let result = resolver
                .do_resolve(&self.target, obj, Some(self.suffix.clone()), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}

/// Forwards only when `path` is an existing directory.
pub struct DirectoryExistsPlugin {
    target: HookName,
}

impl DirectoryExistsPlugin {
    #[must_use]
    pub fn new(target: HookName) -> Self {
        Self { target }
    }
}

impl Plugin for DirectoryExistsPlugin {
    fn name(&self) -> &'static str {
        "DirectoryExistsPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(directory) = request.path.clone() else {
                return Ok(Outcome::Continue);
            };
            match ctx.fs().stat(&directory).await {
                Err(_) => {
                    ctx.add_missing_dependency(&directory);
                    ctx.log(|| format!("{directory} doesn't exist"));
                    Ok(Outcome::Continue)
                }
                Ok(stat) if !stat.is_dir() => {
                    ctx.add_missing_dependency(&directory);
                    ctx.log(|| format!("{directory} is not a directory"));
                    Ok(Outcome::Continue)
                }
                Ok(_) => {
                    ctx.add_file_dependency(&directory);
                    let message = format!("existing directory {directory}");
                    let result = resolver
                        .do_resolve(&self.target, request, Some(message), ctx)
                        .await?;
                    Ok(Outcome::forward(result))
                }
            }
        }
        .boxed_local()
    }
}

/// Forwards only when `path` is an existing file.
pub struct FileExistsPlugin {
    target: HookName,
}

impl FileExistsPlugin {
    #[must_use]
    pub fn new(target: HookName) -> Self {
        Self { target }
    }
}

impl Plugin for FileExistsPlugin {
    fn name(&self) -> &'static str {
        "FileExistsPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(file) = request.path.clone() else {
                return Ok(Outcome::Continue);
            };
            match ctx.fs().stat(&file).await {
                Err(_) => {
                    ctx.add_missing_dependency(&file);
                    ctx.log(|| format!("{file} doesn't exist"));
                    Ok(Outcome::Continue)
                }
                Ok(stat) if !stat.is_file() => {
                    ctx.add_missing_dependency(&file);
                    ctx.log(|| format!("{file} is not a file"));
                    Ok(Outcome::Continue)
                }
                Ok(_) => {
                    ctx.add_file_dependency(&file);
                    let message = format!("existing file: {file}");
                    let result = resolver
                        .do_resolve(&self.target, request, Some(message), ctx)
                        .await?;
                    Ok(Outcome::forward(result))
                }
            }
        }
        .boxed_local()
    }
}
