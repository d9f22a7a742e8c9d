#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Module path resolution with a pluggable hook pipeline.
//!
//! A [`Resolver`] turns a request string such as `lodash/fp`, `./util`
//! or `#internal` into an absolute file path, following package
//! description files (`exports`, `imports`, `main`), module directories,
//! aliases, extensions and symlinks. Filesystem reads go through a
//! [`CachedFileSystem`] that coalesces concurrent identical calls and
//! keeps results for a bounded time window.

pub mod config;
pub mod description;
pub mod error;
pub mod exports;
pub mod fs;
pub mod resolver;
pub mod version;

pub use config::ResolverConfig;
pub use description::{DescriptionFile, Manifest, ManifestArena, ManifestId};
pub use error::Error;
pub use exports::{FieldKind, FieldProcessor};
pub use fs::{CachedFileSystem, FileSystem, FsError, OsFileSystem, Stats, StorageMode, SyncFileSystem};
pub use resolver::{
    Dependencies, HookName, HookRef, Pipeline, Plugin, Resolution, ResolveContext, ResolveRequest,
    Resolver, ResolverBuilder,
};
pub use version::{BuildInfo, VERSION};
