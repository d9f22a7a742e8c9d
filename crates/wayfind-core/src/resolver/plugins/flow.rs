use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Forwards the request unchanged.
pub struct NextPlugin {
    target: HookName,
}

impl NextPlugin {
    #[must_use]
    pub fn new(target: HookName) -> Self {
        Self { target }
    }
}

impl Plugin for NextPlugin {
    fn name(&self) -> &'static str {
        "NextPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let result = resolver.do_resolve(&self.target, request, None, ctx).await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}

/// Forwards the request unchanged, with a log message.
pub struct TryNextPlugin {
    message: String,
    target: HookName,
}

impl TryNextPlugin {
    #[must_use]
    pub fn new(message: impl Into<String>, target: HookName) -> Self {
        Self {
            message: message.into(),
            target,
        }
    }
}

impl Plugin for TryNextPlugin {
    fn name(&self) -> &'static str {
        "TryNextPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let result = resolver
                .do_resolve(&self.target, request, Some(self.message.clone()), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}

/// A partial match on request flags. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTest {
    pub module: Option<bool>,
    pub directory: Option<bool>,
    pub internal: Option<bool>,
    pub fully_specified: Option<bool>,
    pub request: Option<String>,
}

impl RequestTest {
    #[must_use]
    pub fn matches(&self, request: &ResolveRequest) -> bool {
        let flag = |expected: Option<bool>, actual: bool| expected.map_or(true, |e| e == actual);
        flag(self.module, request.module)
            && flag(self.directory, request.directory)
            && flag(self.internal, request.internal)
            && flag(self.fully_specified, request.fully_specified)
            && self
                .request
                .as_deref()
                .map_or(true, |r| request.request.as_deref() == Some(r))
    }
}

/// Forwards requests matching a [`RequestTest`].
///
/// Without alternatives, a match that finds nothing stops the hook.
pub struct ConditionalPlugin {
    test: RequestTest,
    message: Option<String>,
    allow_alternatives: bool,
    target: HookName,
}

impl ConditionalPlugin {
    #[must_use]
    pub fn new(
        test: RequestTest,
        message: Option<&str>,
        allow_alternatives: bool,
        target: HookName,
    ) -> Self {
        Self {
            test,
            message: message.map(str::to_string),
            allow_alternatives,
            target,
        }
    }
}

impl Plugin for ConditionalPlugin {
    fn name(&self) -> &'static str {
        "ConditionalPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            if !self.test.matches(&request) {
                return Ok(Outcome::Continue);
            }
            let result = resolver
                .do_resolve(&self.target, request, self.message.clone(), ctx)
                .await?;
            Ok(if self.allow_alternatives {
                Outcome::forward(result)
            } else {
                Outcome::settle(result)
            })
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_test_matching() {
        let mut request = ResolveRequest::new("/a", ".");
        request.module = false;

        let single_file = RequestTest {
            directory: Some(false),
            request: Some(".".into()),
            ..RequestTest::default()
        };
        assert!(single_file.matches(&request));

        request.directory = true;
        assert!(!single_file.matches(&request));

        assert!(RequestTest::default().matches(&request));

        let module = RequestTest {
            module: Some(true),
            ..RequestTest::default()
        };
        assert!(!module.matches(&request));
    }
}
