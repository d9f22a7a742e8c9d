use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Follows a string field of the package's own description file, such as
/// `main`, when resolving the package directory itself.
pub struct MainFieldPlugin {
    field: String,
    force_relative: bool,
    target: HookName,
}

impl MainFieldPlugin {
    /// With `force_relative`, a bare value like `lib/index.js` is read as
    /// `./lib/index.js`.
    #[must_use]
    pub fn new(field: impl Into<String>, force_relative: bool, target: HookName) -> Self {
        Self {
            field: field.into(),
            force_relative,
            target,
        }
    }
}

impl Plugin for MainFieldPlugin {
    fn name(&self) -> &'static str {
        "MainFieldPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(file) = request.description_file() else {
                return Ok(Outcome::Continue);
            };
            if request.path.as_deref() != Some(file.root.as_str())
                || request.already_tried_main_field.as_deref() == Some(file.path.as_str())
            {
                return Ok(Outcome::Continue);
            }

            let Some(main) = file.manifest.field(&self.field).and_then(Value::as_str) else {
                return Ok(Outcome::Continue);
            };
            if main == "." || main == "./" {
                return Ok(Outcome::Continue);
            }
            let main = if self.force_relative
                && !main.starts_with("./")
                && !main.starts_with("../")
            {
                format!("./{main}")
            } else {
                main.to_string()
            };

            let filename = file.path.rsplit(['/', '\\']).next().unwrap_or("");
            let message = format!("use {main} from {} in {filename}", self.field);
            let mut obj = request.clone();
            obj.request = Some(main);
            obj.already_tried_main_field = Some(file.path.clone());

            let result = resolver
                .do_resolve(&self.target, obj, Some(message), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}
