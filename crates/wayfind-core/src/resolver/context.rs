use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::fs::FsAccess;

use super::request::ResolveRequest;

/// Files and directories observed while resolving. Write-only for plugins.
#[derive(Debug, Default)]
pub struct Dependencies {
    pub files: RefCell<BTreeSet<String>>,
    pub contexts: RefCell<BTreeSet<String>>,
    pub missing: RefCell<BTreeSet<String>>,
}

impl Dependencies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

struct Frame {
    entry: String,
    parent: Option<Rc<Frame>>,
}

/// The chain of step fingerprints leading to the current step.
///
/// Pushing returns a new stack sharing the old one, so sibling branches
/// never see each other's entries.
#[derive(Clone, Default)]
pub struct Stack(Option<Rc<Frame>>);

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn push(&self, entry: String) -> Self {
        Self(Some(Rc::new(Frame {
            entry,
            parent: self.0.clone(),
        })))
    }

    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.frames().any(|f| f.entry == entry)
    }

    /// Entries from the outermost step to the innermost.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.frames().map(|f| f.entry.clone()).collect();
        entries.reverse();
        entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.0.as_deref(), |f| f.parent.as_deref())
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}

/// Per-call options supplied by the caller of a resolution.
#[derive(Clone, Default)]
pub struct ResolveContext<'a> {
    /// Receives step log lines.
    pub log: Option<&'a dyn Fn(&str)>,
    /// Receives every result instead of stopping at the first one.
    pub on_result: Option<&'a dyn Fn(ResolveRequest)>,
    pub dependencies: Option<&'a Dependencies>,
    pub stack: Stack,
}

impl<'a> ResolveContext<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_log(mut self, log: &'a dyn Fn(&str)) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn with_yield(mut self, on_result: &'a dyn Fn(ResolveRequest)) -> Self {
        self.on_result = Some(on_result);
        self
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: &'a Dependencies) -> Self {
        self.dependencies = Some(dependencies);
        self
    }
}

/// What a plugin sees of the current resolution.
pub struct StepContext<'a> {
    fs: &'a dyn FsAccess,
    log: Option<&'a dyn Fn(&str)>,
    on_result: Option<&'a dyn Fn(ResolveRequest)>,
    dependencies: Option<&'a Dependencies>,
    stack: Stack,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        fs: &'a dyn FsAccess,
        log: Option<&'a dyn Fn(&str)>,
        on_result: Option<&'a dyn Fn(ResolveRequest)>,
        dependencies: Option<&'a Dependencies>,
        stack: Stack,
    ) -> Self {
        Self {
            fs,
            log,
            on_result,
            dependencies,
            stack,
        }
    }

    /// A child context with its own log sink and stack.
    pub(crate) fn nested<'b>(&self, log: Option<&'b dyn Fn(&str)>, stack: Stack) -> StepContext<'b>
    where
        'a: 'b,
    {
        StepContext {
            fs: self.fs,
            log,
            on_result: self.on_result,
            dependencies: self.dependencies,
            stack,
        }
    }

    #[must_use]
    pub fn fs(&self) -> &'a dyn FsAccess {
        self.fs
    }

    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    #[must_use]
    pub fn is_logging(&self) -> bool {
        self.log.is_some()
    }

    /// Log a line; `message` is only built when a sink is attached.
    pub fn log(&self, message: impl FnOnce() -> String) {
        if let Some(log) = self.log {
            log(&message());
        }
    }

    pub(crate) fn log_sink(&self) -> Option<&'a dyn Fn(&str)> {
        self.log
    }

    #[must_use]
    pub fn on_result(&self) -> Option<&'a dyn Fn(ResolveRequest)> {
        self.on_result
    }

    pub fn add_file_dependency(&self, path: &str) {
        if let Some(deps) = self.dependencies {
            deps.files.borrow_mut().insert(path.to_string());
        }
    }

    pub fn add_context_dependency(&self, path: &str) {
        if let Some(deps) = self.dependencies {
            deps.contexts.borrow_mut().insert(path.to_string());
        }
    }

    pub fn add_missing_dependency(&self, path: &str) {
        if let Some(deps) = self.dependencies {
            deps.missing.borrow_mut().insert(path.to_string());
        }
    }
}
