#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for wayfind.
//!
//! This crate provides pure string helpers with no logging/tracing dependencies.
//! Nothing here touches the filesystem; paths are plain strings so that both
//! POSIX and Windows forms can be handled on any host.

pub mod identifier;
pub mod path;

pub use identifier::{parse_identifier, Identifier};
pub use path::{
    cd_up, dirname, escapes_package_root, get_paths, get_type, join, normalize, AncestorPaths,
    JoinCache, PathType,
};
