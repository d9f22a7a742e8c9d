use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Joins the whole request onto `path`.
pub struct JoinRequestPlugin {
    target: HookName,
}

impl JoinRequestPlugin {
    #[must_use]
    pub fn new(target: HookName) -> Self {
        Self { target }
    }
}

impl Plugin for JoinRequestPlugin {
    fn name(&self) -> &'static str {
        "JoinRequestPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let (Some(path), Some(req)) = (request.path.as_deref(), request.request.as_deref())
            else {
                return Ok(Outcome::Continue);
            };
            let mut obj = request.clone();
            obj.path = Some(resolver.join(path, req));
            obj.relative_path = request
                .relative_path
                .as_deref()
                .map(|rel| resolver.join(rel, req));
            obj.request = None;

            let result = resolver.do_resolve(&self.target, obj, None, ctx).await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}

/// Joins the package name part of a `./name/rest` request onto `path`,
/// leaving `./rest` as the request.
pub struct JoinRequestPartPlugin {
    target: HookName,
}

impl JoinRequestPartPlugin {
    #[must_use]
    pub fn new(target: HookName) -> Self {
        Self { target }
    }
}

/// Split `./name/rest` or `./@scope/name/rest` into name and `.`-prefixed rest.
fn split_module_request(request: &str) -> (&str, String) {
    let find_from = |from: usize| {
        request
            .get(from..)
            .and_then(|s| s.find('/'))
            .map(|i| i + from)
    };
    let mut split = find_from(3);
    if request.as_bytes().get(2) == Some(&b'@') {
        split = split.and_then(|i| find_from(i + 1));
    }
    match split {
        Some(i) => (&request[..i], format!(".{}", &request[i..])),
        None => (request, ".".to_string()),
    }
}

impl Plugin for JoinRequestPartPlugin {
    fn name(&self) -> &'static str {
        "JoinRequestPartPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let (Some(path), Some(req)) = (request.path.as_deref(), request.request.as_deref())
            else {
                return Ok(Outcome::Continue);
            };
            let (module_name, remaining) = split_module_request(req);

            let mut obj = request.clone();
            obj.path = Some(resolver.join(path, module_name));
            obj.relative_path = request
                .relative_path
                .as_deref()
                .map(|rel| resolver.join(rel, module_name));
            obj.request = Some(remaining);

            let result = resolver.do_resolve(&self.target, obj, None, ctx).await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}
