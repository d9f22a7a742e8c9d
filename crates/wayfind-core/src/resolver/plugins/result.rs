use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Terminal step: reports the request as a result.
///
/// When the caller collects results, the request is handed over and the
/// hook stops so resolution keeps looking for more.
#[derive(Debug, Default)]
pub struct ResultPlugin;

impl ResultPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for ResultPlugin {
    fn name(&self) -> &'static str {
        "ResultPlugin"
    }

    fn apply<'a>(
        &'a self,
        _resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            ctx.log(|| {
                format!(
                    "reporting result {}",
                    request.path.as_deref().unwrap_or("false")
                )
            });
            if let Some(on_result) = ctx.on_result() {
                on_result(request);
                return Ok(Outcome::Stop);
            }
            Ok(Outcome::Resolved(request))
        }
        .boxed_local()
    }
}
