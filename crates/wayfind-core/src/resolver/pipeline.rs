use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, trace};
use wayfind_util::JoinCache;

use crate::description::ManifestArena;
use crate::error::Error;
use crate::fs::FsAccess;

use super::context::{ResolveContext, StepContext};
use super::hooks::{HookName, HookRef};
use super::plugins::{Outcome, Plugin};
use super::request::{self, ParsedIdentifier, ResolveRequest};
use super::trace::{stack_entry, StepLog};
use super::Resolution;

type StepObserver = Box<dyn Fn(&HookName, &ResolveRequest)>;
type NoResolveObserver = Box<dyn Fn(&ResolveRequest, &Error)>;

struct Tap {
    stage: i32,
    plugin: Box<dyn Plugin>,
}

/// Hooks, their taps, and the per-resolver memo tables.
///
/// Plugins receive the pipeline to continue resolution on another hook.
#[derive(Default)]
pub struct Pipeline {
    hooks: HashMap<HookName, Vec<Tap>>,
    join_cache: JoinCache,
    manifests: ManifestArena,
    step_observers: Vec<StepObserver>,
    no_resolve_observers: Vec<NoResolveObserver>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the hook if it does not exist yet.
    pub fn ensure_hook(&mut self, name: &str) -> HookRef {
        let hook = HookRef::parse(name);
        self.hooks.entry(hook.name.clone()).or_default();
        hook
    }

    /// Look up an existing hook.
    pub fn get_hook(&self, name: &str) -> Result<HookRef, Error> {
        let hook = HookRef::parse(name);
        if self.hooks.contains_key(&hook.name) {
            Ok(hook)
        } else {
            Err(Error::UnknownHook(name.to_string()))
        }
    }

    /// Register `plugin` on `hook`. Taps run by stage, then in
    /// registration order.
    pub fn tap(&mut self, hook: &HookRef, plugin: impl Plugin + 'static) {
        let taps = self.hooks.entry(hook.name.clone()).or_default();
        let at = taps.partition_point(|t| t.stage <= hook.stage);
        trace!(hook = %hook.name, stage = hook.stage, plugin = plugin.name(), "tap");
        taps.insert(
            at,
            Tap {
                stage: hook.stage,
                plugin: Box::new(plugin),
            },
        );
    }

    /// Names of the plugins on `hook`, in run order.
    #[must_use]
    pub fn taps(&self, hook: &HookName) -> Vec<&'static str> {
        self.hooks
            .get(hook)
            .map(|taps| taps.iter().map(|t| t.plugin.name()).collect())
            .unwrap_or_default()
    }

    pub fn on_resolve_step(&mut self, observer: impl Fn(&HookName, &ResolveRequest) + 'static) {
        self.step_observers.push(Box::new(observer));
    }

    pub fn on_no_resolve(&mut self, observer: impl Fn(&ResolveRequest, &Error) + 'static) {
        self.no_resolve_observers.push(Box::new(observer));
    }

    /// Memoized path join.
    pub fn join(&self, root: &str, request: &str) -> String {
        self.join_cache.join(root, request)
    }

    #[must_use]
    pub fn normalize(&self, path: &str) -> String {
        wayfind_util::normalize(path)
    }

    #[must_use]
    pub fn parse(&self, identifier: &str) -> ParsedIdentifier {
        request::parse(identifier)
    }

    #[must_use]
    pub fn manifests(&self) -> &ManifestArena {
        &self.manifests
    }

    /// Run the taps of `hook` on `request`.
    ///
    /// The first tap to produce a result or stop the hook wins. A hook
    /// with no taps yields no result. Entering a step whose fingerprint
    /// is already on the stack fails with [`Error::Recursion`].
    pub fn do_resolve<'a>(
        &'a self,
        hook: &'a HookName,
        request: ResolveRequest,
        message: Option<String>,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Option<ResolveRequest>, Error>> {
        async move {
            let entry = stack_entry(hook, &request);
            if ctx.stack().contains(&entry) {
                ctx.log(|| "abort resolving because of recursion".to_string());
                return Err(Error::Recursion {
                    stack: ctx.stack().entries(),
                });
            }

            for observer in &self.step_observers {
                observer(hook, &request);
            }

            let Some(taps) = self.hooks.get(hook) else {
                return Err(Error::UnknownHook(hook.to_string()));
            };
            if taps.is_empty() {
                return Ok(None);
            }

            if let Some(log) = ctx.log_sink() {
                log(&entry);
            }

            let stack = ctx.stack().push(entry);
            let reported = Cell::new(false);
            let parent = ctx.log_sink();
            let nested = |line: &str| {
                let Some(parent) = parent else {
                    return;
                };
                match message.as_deref() {
                    Some(message) => {
                        if !reported.replace(true) {
                            parent(message);
                        }
                        parent(&format!("  {line}"));
                    }
                    None => parent(line),
                }
            };
            let inner = ctx.nested(parent.map(|_| &nested as &dyn Fn(&str)), stack);

            for tap in taps {
                match tap.plugin.apply(self, request.clone(), &inner).await? {
                    Outcome::Continue => {}
                    Outcome::Stop => return Ok(None),
                    Outcome::Resolved(result) => return Ok(Some(result)),
                }
            }
            Ok(None)
        }
        .boxed_local()
    }

    /// Resolve `request` against `path`, starting at the `resolve` hook.
    ///
    /// When the caller attached no log sink and nothing was found, the
    /// resolution is repeated with a collecting sink so the error can
    /// carry the step log.
    pub(crate) async fn run(
        &self,
        fs: &dyn FsAccess,
        context: Rc<Value>,
        path: &str,
        request: &str,
        resolve_context: &ResolveContext<'_>,
    ) -> Result<Resolution, Error> {
        if path.is_empty() {
            return Err(Error::InvalidArgument("path must not be empty".to_string()));
        }

        let obj = ResolveRequest {
            context,
            path: Some(path.to_string()),
            request: Some(request.to_string()),
            ..ResolveRequest::default()
        };
        let message = format!("resolve '{request}' in '{path}'");
        let hook = HookName::Resolve;

        let yielded = Cell::new(false);
        let forward = |result: ResolveRequest| {
            yielded.set(true);
            if let Some(on_result) = resolve_context.on_result {
                on_result(result);
            }
        };
        let on_result = resolve_context
            .on_result
            .map(|_| &forward as &dyn Fn(ResolveRequest));

        let log = StepLog::new();
        if let Some(user_log) = resolve_context.log {
            let sink = |line: &str| {
                user_log(line);
                log.record(line);
            };
            let ctx = StepContext::new(
                fs,
                Some(&sink),
                on_result,
                resolve_context.dependencies,
                resolve_context.stack.clone(),
            );
            let result = self.do_resolve(&hook, obj.clone(), Some(message), &ctx).await?;
            if let Some(done) = settle(result, yielded.get(), resolve_context) {
                return Ok(done);
            }
        } else {
            let ctx = StepContext::new(
                fs,
                None,
                on_result,
                resolve_context.dependencies,
                resolve_context.stack.clone(),
            );
            let result = self
                .do_resolve(&hook, obj.clone(), Some(message.clone()), &ctx)
                .await?;
            if let Some(done) = settle(result, yielded.get(), resolve_context) {
                return Ok(done);
            }

            let sink = |line: &str| log.record(line);
            let ctx = StepContext::new(fs, Some(&sink), on_result, None, resolve_context.stack.clone());
            let result = self.do_resolve(&hook, obj.clone(), Some(message), &ctx).await?;
            if let Some(done) = settle(result, yielded.get(), resolve_context) {
                return Ok(done);
            }
        }

        let error = Error::NotResolved {
            request: request.to_string(),
            path: path.to_string(),
            details: log.into_details(),
        };
        debug!(request, path, "not resolved");
        for observer in &self.no_resolve_observers {
            observer(&obj, &error);
        }
        Err(error)
    }
}

/// Turn a pass's outcome into a final answer, if it produced one.
fn settle(
    result: Option<ResolveRequest>,
    yielded: bool,
    resolve_context: &ResolveContext<'_>,
) -> Option<Resolution> {
    if yielded || (result.is_some() && resolve_context.on_result.is_some()) {
        if let (Some(result), Some(on_result)) = (result, resolve_context.on_result) {
            on_result(result);
        }
        return Some(Resolution::Yielded);
    }
    let result = result?;
    let Some(path) = result.path.as_deref() else {
        trace!("resolved to ignored module");
        return Some(Resolution::Ignored);
    };
    let path = format!(
        "{}{}{}",
        path.replace('#', "\0#"),
        result.query.replace('#', "\0#"),
        result.fragment
    );
    trace!(path = %path, "resolved");
    Some(Resolution::Found {
        path,
        request: Box::new(result),
    })
}
