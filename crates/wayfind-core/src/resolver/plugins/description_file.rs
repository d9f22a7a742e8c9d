use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wayfind_util::cd_up;

use crate::description::DescriptionFile;
use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Find the nearest description file at or above `directory`.
///
/// `current` is reused without touching the filesystem when it already
/// belongs to the directory being searched. A manifest that exists but
/// cannot be parsed is an error; a missing one moves the search upward.
pub async fn load_description_file(
    resolver: &Pipeline,
    directory: &str,
    filenames: &[String],
    current: Option<&DescriptionFile>,
    ctx: &StepContext<'_>,
) -> Result<Option<DescriptionFile>, Error> {
    let mut dir = directory.to_string();
    loop {
        if let Some(current) = current {
            if current.root == dir {
                return Ok(Some(current.clone()));
            }
        }

        for filename in filenames {
            let file_path = resolver.join(&dir, filename);
            match ctx.fs().read_json(&file_path).await {
                Ok(data) => {
                    ctx.add_file_dependency(&file_path);
                    let manifest = resolver.manifests().intern(&file_path, data);
                    return Ok(Some(DescriptionFile {
                        path: file_path,
                        root: dir,
                        manifest,
                    }));
                }
                Err(source) if source.is_parse_error() => {
                    return Err(Error::DescriptionFile {
                        path: file_path,
                        source,
                    });
                }
                Err(_) => ctx.add_missing_dependency(&file_path),
            }
        }

        let Some(parent) = cd_up(&dir).map(str::to_string) else {
            return Ok(None);
        };
        dir = parent;
    }
}

/// Attaches the nearest description file and the request's path relative
/// to it.
pub struct DescriptionFilePlugin {
    filenames: Vec<String>,
    path_is_file: bool,
    target: HookName,
}

impl DescriptionFilePlugin {
    /// With `path_is_file`, the search starts at the parent of `path`.
    #[must_use]
    pub fn new(filenames: Vec<String>, path_is_file: bool, target: HookName) -> Self {
        Self {
            filenames,
            path_is_file,
            target,
        }
    }
}

impl Plugin for DescriptionFilePlugin {
    fn name(&self) -> &'static str {
        "DescriptionFilePlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(path) = request.path.clone() else {
                return Ok(Outcome::Continue);
            };
            let directory = if self.path_is_file {
                cd_up(&path)
            } else {
                Some(path.as_str())
            };
            let Some(directory) = directory else {
                return Ok(Outcome::Continue);
            };

            let current = request.description_file();
            let found =
                load_description_file(resolver, directory, &self.filenames, current.as_ref(), ctx)
                    .await?;
            let Some(file) = found else {
                ctx.log(|| format!("No description file found in {directory} or above"));
                return Ok(Outcome::Continue);
            };

            let relative_path = format!(
                ".{}",
                path.get(file.root.len()..).unwrap_or("").replace('\\', "/")
            );
            let message = format!(
                "using description file: {} (relative path: {relative_path})",
                file.path
            );
            let mut obj = request.with_description_file(&file);
            obj.relative_path = Some(relative_path);

            let result = resolver.do_resolve(&self.target, obj, Some(message), ctx).await?;
            Ok(Outcome::settle(result))
        }
        .boxed_local()
    }
}
