use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wayfind_util::{get_paths, get_type, PathType};

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Replaces symlinked segments of `path` with their targets.
///
/// Segments are checked from the file upward; an absolute link target
/// ends the walk since nothing above it matters any more.
pub struct SymlinkPlugin {
    target: HookName,
}

impl SymlinkPlugin {
    #[must_use]
    pub fn new(target: HookName) -> Self {
        Self { target }
    }
}

impl Plugin for SymlinkPlugin {
    fn name(&self) -> &'static str {
        "SymlinkPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            if request.ignore_symlinks {
                return Ok(Outcome::Continue);
            }
            let Some(path) = request.path.as_deref() else {
                return Ok(Outcome::Continue);
            };

            let ancestors = get_paths(path);
            let mut segments = ancestors.segments;
            let mut contains_symlink = false;
            let mut stop_at = None;
            for (idx, ancestor) in ancestors.paths.iter().enumerate() {
                ctx.add_file_dependency(ancestor);
                let Ok(link) = ctx.fs().read_link(ancestor).await else {
                    continue;
                };
                contains_symlink = true;
                let absolute = matches!(
                    get_type(&link),
                    PathType::AbsolutePosix | PathType::AbsoluteWin
                );
                segments[idx] = link;
                if absolute {
                    stop_at = Some(idx);
                    break;
                }
            }
            if !contains_symlink {
                return Ok(Outcome::Continue);
            }

            let kept = stop_at.map_or(segments.len(), |idx| idx + 1);
            let Some(resolved) = segments[..kept]
                .iter()
                .rev()
                .fold(None, |acc: Option<String>, segment| {
                    Some(match acc {
                        Some(base) => resolver.join(&base, segment),
                        None => segment.clone(),
                    })
                })
            else {
                return Ok(Outcome::Continue);
            };

            let message = format!("resolved symlink to {resolved}");
            let mut obj = request.clone();
            obj.path = Some(resolved);
            let result = resolver
                .do_resolve(&self.target, obj, Some(message), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}
