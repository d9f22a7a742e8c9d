use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Splits `request` into path, query and fragment and classifies it.
///
/// A request with a fragment but no query is first tried with the
/// fragment as part of the path, since `#` is a legal file name character.
pub struct ParsePlugin {
    fully_specified: Option<bool>,
    target: HookName,
}

impl ParsePlugin {
    /// `fully_specified`, when set, overrides the flag on every parsed request.
    #[must_use]
    pub fn new(fully_specified: Option<bool>, target: HookName) -> Self {
        Self {
            fully_specified,
            target,
        }
    }
}

impl Plugin for ParsePlugin {
    fn name(&self) -> &'static str {
        "ParsePlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let parsed = resolver.parse(request.request.as_deref().unwrap_or(""));
            if parsed.module {
                ctx.log(|| "Parsed request is a module".to_string());
            }
            if parsed.directory {
                ctx.log(|| "Parsed request is a directory".to_string());
            }

            let mut obj = request.clone();
            obj.request = Some(parsed.request);
            obj.query = parsed.query;
            obj.fragment = parsed.fragment;
            obj.module = parsed.module;
            obj.directory = parsed.directory;
            obj.internal = parsed.internal;
            if let Some(fully_specified) = self.fully_specified {
                obj.fully_specified = fully_specified;
            }
            if obj.query.is_empty() && !request.query.is_empty() {
                obj.query = request.query;
            }
            if obj.fragment.is_empty() && !request.fragment.is_empty() {
                obj.fragment = request.fragment;
            }

            let has_request = obj.request.as_deref().is_some_and(|r| !r.is_empty());
            if has_request && obj.query.is_empty() && !obj.fragment.is_empty() {
                let fragment_is_directory = obj.fragment.ends_with('/');
                let fragment = if fragment_is_directory {
                    &obj.fragment[..obj.fragment.len() - 1]
                } else {
                    obj.fragment.as_str()
                };
                let mut alternative = obj.clone();
                alternative.request = Some(format!(
                    "{}{}{fragment}",
                    obj.request.as_deref().unwrap_or(""),
                    if obj.directory { "/" } else { "" },
                ));
                alternative.directory = fragment_is_directory;
                alternative.fragment = String::new();

                if let Some(found) = resolver
                    .do_resolve(&self.target, alternative, None, ctx)
                    .await?
                {
                    return Ok(Outcome::Resolved(found));
                }
            }

            let result = resolver.do_resolve(&self.target, obj, None, ctx).await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}
