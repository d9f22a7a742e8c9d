use std::path::PathBuf;
use thiserror::Error;

use crate::fs::FsError;

/// Core error type for wayfind operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No plugin chain produced a result. `details` holds the step log.
    #[error("Can't resolve '{request}' in '{path}'")]
    NotResolved {
        request: String,
        path: String,
        details: String,
    },

    /// The same step fingerprint was entered twice on one chain.
    #[error("Recursion in resolving\nStack:\n  {}", stack.join("\n  "))]
    Recursion { stack: Vec<String> },

    #[error("Trying to access out of package scope. Requesting {target}")]
    OutOfPackageScope { target: String },

    #[error("Resolving to directories is not possible with the {field} field (request was {request}/)")]
    DirectoryRequest { field: String, request: String },

    #[error("Package path {request} is not exported from package {root} (see exports field in {description_file})")]
    NotExported {
        request: String,
        root: String,
        description_file: String,
    },

    #[error("Package import {request} is not imported from package {root} (see imports field in {description_file})")]
    NotImported {
        request: String,
        root: String,
        description_file: String,
    },

    /// A malformed exports/imports field or target.
    #[error("{message}")]
    InvalidField { message: String },

    #[error("{path} (directory description file): {source}")]
    DescriptionFile {
        path: String,
        #[source]
        source: FsError,
    },

    #[error("Hook {0} doesn't exist")]
    UnknownHook(String),

    #[error("Cannot resolve synchronously: a step waited on asynchronous work. Use 'resolve'!")]
    NotSync,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self::InvalidField {
            message: message.into(),
        }
    }

    /// The step log attached to a not-resolved error.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::NotResolved { details, .. } => Some(details),
            _ => None,
        }
    }
}
