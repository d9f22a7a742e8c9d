//! The resolution pipeline.
//!
//! A [`Resolver`] owns a [`Pipeline`] of named hooks with plugins tapped
//! onto them, plus the caching filesystem the plugins read through.
//! Resolution enters at the `resolve` hook and ends when some chain of
//! plugins reaches the terminal `resolved` hook.

mod context;
mod factory;
mod hooks;
mod pipeline;
pub mod plugins;
mod request;
mod trace;

use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use serde_json::Value;

use crate::config::ResolverConfig;
use crate::error::Error;
use crate::fs::{AsyncAccess, CachedFileSystem, FileSystem, OsFileSystem, SyncAccess, SyncFileSystem};

pub use context::{Dependencies, ResolveContext, Stack, StepContext};
pub use factory::ResolverBuilder;
pub use hooks::{to_camel_case, HookName, HookRef, DEFAULT_STAGE, STAGE_OFFSET};
pub use pipeline::Pipeline;
pub use plugins::{Outcome, Plugin};
pub use request::{parse, ParsedIdentifier, ResolveRequest};
pub use trace::{stack_entry, StepLog};

/// The answer to a resolution.
#[derive(Debug)]
pub enum Resolution {
    /// A file was found. `path` includes query and fragment, with any `#`
    /// in path or query escaped as `\0#`.
    Found {
        path: String,
        request: Box<ResolveRequest>,
    },
    /// An alias mapped the request to nothing.
    Ignored,
    /// Results went to the caller's yield sink.
    Yielded,
}

impl Resolution {
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Found { path, .. } => Some(path),
            Self::Ignored | Self::Yielded => None,
        }
    }
}

/// A configured resolver over filesystem `F`.
pub struct Resolver<F: FileSystem = OsFileSystem> {
    pipeline: Pipeline,
    fs: CachedFileSystem<F>,
    config: ResolverConfig,
}

impl Resolver<OsFileSystem> {
    /// A resolver with the standard plugins over the real filesystem.
    pub fn new(config: ResolverConfig) -> Result<Self, Error> {
        ResolverBuilder::new(config).build()
    }
}

impl<F: FileSystem> Resolver<F> {
    pub(crate) fn from_parts(pipeline: Pipeline, fs: CachedFileSystem<F>, config: ResolverConfig) -> Self {
        Self {
            pipeline,
            fs,
            config,
        }
    }

    /// Resolve `request` relative to the directory `path`.
    pub async fn resolve(
        &self,
        context: Value,
        path: &str,
        request: &str,
        resolve_context: &ResolveContext<'_>,
    ) -> Result<Resolution, Error> {
        let access = AsyncAccess(&self.fs);
        self.pipeline
            .run(&access, Rc::new(context), path, request, resolve_context)
            .await
    }

    /// Run `hook` directly, as a plugin would.
    pub async fn do_resolve(
        &self,
        hook: &HookName,
        request: ResolveRequest,
        message: Option<String>,
        resolve_context: &ResolveContext<'_>,
    ) -> Result<Option<ResolveRequest>, Error> {
        let access = AsyncAccess(&self.fs);
        let ctx = StepContext::new(
            &access,
            resolve_context.log,
            resolve_context.on_result,
            resolve_context.dependencies,
            resolve_context.stack.clone(),
        );
        self.pipeline.do_resolve(hook, request, message, &ctx).await
    }

    pub fn ensure_hook(&mut self, name: &str) -> HookRef {
        self.pipeline.ensure_hook(name)
    }

    pub fn get_hook(&self, name: &str) -> Result<HookRef, Error> {
        self.pipeline.get_hook(name)
    }

    pub fn tap(&mut self, hook: &HookRef, plugin: impl Plugin + 'static) {
        self.pipeline.tap(hook, plugin);
    }

    pub fn on_resolve_step(&mut self, observer: impl Fn(&HookName, &ResolveRequest) + 'static) {
        self.pipeline.on_resolve_step(observer);
    }

    pub fn on_no_resolve(&mut self, observer: impl Fn(&ResolveRequest, &Error) + 'static) {
        self.pipeline.on_no_resolve(observer);
    }

    pub fn join(&self, root: &str, request: &str) -> String {
        self.pipeline.join(root, request)
    }

    #[must_use]
    pub fn normalize(&self, path: &str) -> String {
        self.pipeline.normalize(path)
    }

    #[must_use]
    pub fn parse(&self, identifier: &str) -> ParsedIdentifier {
        self.pipeline.parse(identifier)
    }

    #[must_use]
    pub fn file_system(&self) -> &CachedFileSystem<F> {
        &self.fs
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}

impl<F: SyncFileSystem> Resolver<F> {
    /// Resolve without waiting: every filesystem call is answered by the
    /// blocking primitives. `None` means the request is ignored.
    ///
    /// A plugin that waits on something asynchronous fails the call with
    /// [`Error::NotSync`].
    pub fn resolve_sync(&self, context: Value, path: &str, request: &str) -> Result<Option<String>, Error> {
        let resolution = self.resolve_sync_with(context, path, request, &ResolveContext::new())?;
        Ok(match resolution {
            Resolution::Found { path, .. } => Some(path),
            Resolution::Ignored | Resolution::Yielded => None,
        })
    }

    /// [`Resolver::resolve_sync`] with a caller-supplied context.
    pub fn resolve_sync_with(
        &self,
        context: Value,
        path: &str,
        request: &str,
        resolve_context: &ResolveContext<'_>,
    ) -> Result<Resolution, Error> {
        let access = SyncAccess(&self.fs);
        let mut pending = pin!(self
            .pipeline
            .run(&access, Rc::new(context), path, request, resolve_context));
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        match pending.as_mut().poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => Err(Error::NotSync),
        }
    }
}
