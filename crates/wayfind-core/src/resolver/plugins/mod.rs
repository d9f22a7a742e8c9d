//! The standard plugins.
//!
//! Each plugin is tapped onto one hook and usually forwards a modified
//! request to a target hook through [`Pipeline::do_resolve`].

mod alias;
mod description_file;
mod file;
mod flow;
mod join;
mod main_field;
mod modules;
mod package;
mod parse;
mod result;
mod symlink;

use futures::future::LocalBoxFuture;

use crate::error::Error;

use super::context::StepContext;
use super::pipeline::Pipeline;
use super::request::ResolveRequest;

pub use alias::{AliasOption, AliasPlugin, AliasTarget};
pub use description_file::{load_description_file, DescriptionFilePlugin};
pub use file::{AppendPlugin, DirectoryExistsPlugin, FileExistsPlugin, UseFilePlugin};
pub use flow::{ConditionalPlugin, NextPlugin, RequestTest, TryNextPlugin};
pub use join::{JoinRequestPartPlugin, JoinRequestPlugin};
pub use main_field::MainFieldPlugin;
pub use modules::{ModulesInHierarchicalDirectoriesPlugin, ModulesInRootPlugin};
pub use package::{ExportsFieldPlugin, ImportsFieldPlugin, SelfReferencePlugin};
pub use parse::ParsePlugin;
pub use result::ResultPlugin;
pub use symlink::SymlinkPlugin;

/// What a tap decided.
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Outcome {
    /// Nothing here; let the next tap on the hook try.
    Continue,
    /// Nothing found, and no later tap on this hook may try either.
    Stop,
    Resolved(ResolveRequest),
}

impl Outcome {
    /// Continue when nothing was found.
    #[must_use]
    pub fn forward(result: Option<ResolveRequest>) -> Self {
        result.map_or(Self::Continue, Self::Resolved)
    }

    /// Stop the hook when nothing was found.
    #[must_use]
    pub fn settle(result: Option<ResolveRequest>) -> Self {
        result.map_or(Self::Stop, Self::Resolved)
    }
}

/// A unit of resolution behaviour tapped onto a hook.
pub trait Plugin {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>>;
}
