use std::rc::Rc;

use serde_json::Value;
use wayfind_util::{get_type, parse_identifier, PathType};

use crate::description::{DescriptionFile, Manifest};

/// The state carried from stage to stage.
///
/// Plugins never mutate a request in place; they clone it, change fields
/// and pass the copy on.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Directory or file being resolved against. `None` means the request
    /// was deliberately ignored (an alias to `false`).
    pub path: Option<String>,
    /// What is left to resolve, `None` once fully joined onto `path`.
    pub request: Option<String>,
    pub query: String,
    pub fragment: String,
    /// Opaque caller data, passed through untouched.
    pub context: Rc<Value>,
    /// `path` relative to the description file root, `./`-prefixed.
    pub relative_path: Option<String>,
    pub description_file_path: Option<String>,
    pub description_file_root: Option<String>,
    pub description_file_data: Option<Manifest>,
    pub directory: bool,
    pub module: bool,
    pub internal: bool,
    pub fully_specified: bool,
    pub ignore_symlinks: bool,
    /// Path for which the main fields were already tried.
    pub already_tried_main_field: Option<String>,
}

impl ResolveRequest {
    #[must_use]
    pub fn new(path: impl Into<String>, request: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            request: Some(request.into()),
            ..Self::default()
        }
    }

    /// `path` followed by query and fragment.
    #[must_use]
    pub fn full_path(&self) -> Option<String> {
        self.path
            .as_ref()
            .map(|p| format!("{p}{}{}", self.query, self.fragment))
    }

    /// The description file attached by an earlier stage.
    #[must_use]
    pub fn description_file(&self) -> Option<DescriptionFile> {
        Some(DescriptionFile {
            path: self.description_file_path.clone()?,
            root: self.description_file_root.clone()?,
            manifest: self.description_file_data.clone()?,
        })
    }

    pub(crate) fn with_description_file(mut self, file: &DescriptionFile) -> Self {
        self.description_file_path = Some(file.path.clone());
        self.description_file_root = Some(file.root.clone());
        self.description_file_data = Some(file.manifest.clone());
        self
    }
}

/// A request string split into parts and classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIdentifier {
    pub request: String,
    pub query: String,
    pub fragment: String,
    /// A bare module name such as `lodash/fp`.
    pub module: bool,
    /// Ends with a separator, which is stripped from `request`.
    pub directory: bool,
    /// Starts with `#`.
    pub internal: bool,
}

/// Split and classify a request string.
#[must_use]
pub fn parse(identifier: &str) -> ParsedIdentifier {
    let mut part = ParsedIdentifier::default();
    let Some(id) = parse_identifier(identifier) else {
        return part;
    };
    part.request = id.request;
    part.query = id.query;
    part.fragment = id.fragment;

    if !part.request.is_empty() {
        part.internal = get_type(identifier) == PathType::Internal;
        part.module = get_type(&part.request) == PathType::Normal;
        part.directory = part.request.ends_with('/');
        if part.directory {
            part.request.pop();
        }
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_with_query() {
        let p = parse("lodash/fp?x#y");
        assert_eq!(p.request, "lodash/fp");
        assert_eq!(p.query, "?x");
        assert_eq!(p.fragment, "#y");
        assert!(p.module);
        assert!(!p.directory);
        assert!(!p.internal);
    }

    #[test]
    fn test_parse_relative_directory() {
        let p = parse("./lib/");
        assert_eq!(p.request, "./lib");
        assert!(p.directory);
        assert!(!p.module);
    }

    #[test]
    fn test_parse_internal() {
        let p = parse("#dep");
        assert!(p.internal);
        assert!(!p.module);
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert_eq!(parse(""), ParsedIdentifier::default());
        assert_eq!(parse("a\0"), ParsedIdentifier::default());
    }

    #[test]
    fn test_full_path() {
        let mut r = ResolveRequest::new("/a/b.js", "x");
        r.query = "?q".into();
        r.fragment = "#f".into();
        assert_eq!(r.full_path().as_deref(), Some("/a/b.js?q#f"));
        r.path = None;
        assert!(r.full_path().is_none());
    }
}
