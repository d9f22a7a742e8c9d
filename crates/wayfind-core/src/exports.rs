//! Package.json `exports` / `imports` field evaluation.
//!
//! A field is validated and normalized once into a [`FieldProcessor`],
//! which then maps request subpaths to candidate targets:
//! - Exact keys (`"./feature"`, `"#internal"`)
//! - Pattern keys with a single `*` wildcard, most specific wins
//! - Legacy folder keys ending in `/`
//! - Conditional objects, matched in declaration order (`default` always matches)
//! - Arrays of alternatives, all returned in order
//!
//! Candidates are returned unresolved; the caller tries them against the
//! filesystem in order.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::Error;

/// Which package field a processor was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Exports,
    Imports,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exports => write!(f, "exports"),
            Self::Imports => write!(f, "imports"),
        }
    }
}

/// A normalized `exports` or `imports` field.
#[derive(Debug, Clone)]
pub struct FieldProcessor {
    kind: FieldKind,
    field: Map<String, Value>,
}

/// The key a request matched, and what is left for substitution.
struct FieldMatch<'a> {
    target: &'a Value,
    /// `None` for exact keys.
    remaining: Option<String>,
    is_pattern: bool,
    is_subpath: bool,
}

impl FieldProcessor {
    /// Build from an `exports` field value.
    ///
    /// A string or array is shorthand for `{".": value}`; an object whose
    /// keys are conditions rather than subpaths is shorthand as well.
    pub fn exports(field: &Value) -> Result<Self, Error> {
        let field = match field {
            Value::String(_) | Value::Array(_) => root_only(field),
            Value::Object(obj) => {
                let keys: Vec<&String> = obj.keys().collect();
                let mut normalized = None;
                for (i, key) in keys.iter().enumerate() {
                    if !key.starts_with('.') {
                        if i == 0 {
                            if let Some(bad) =
                                keys.iter().find(|k| k.starts_with('.') || k.starts_with('/'))
                            {
                                return Err(Error::invalid_field(format!(
                                    "Exports field key should be relative path and start with \".\" (key: {})",
                                    quoted(bad)
                                )));
                            }
                            normalized = Some(root_only(field));
                            break;
                        }
                        return Err(Error::invalid_field(format!(
                            "Exports field key should be relative path and start with \".\" (key: {})",
                            quoted(key)
                        )));
                    }
                    if key.len() == 1 {
                        continue;
                    }
                    if !key[1..].starts_with('/') {
                        return Err(Error::invalid_field(format!(
                            "Exports field key should be relative path and start with \"./\" (key: {})",
                            quoted(key)
                        )));
                    }
                }
                normalized.unwrap_or_else(|| obj.clone())
            }
            other => {
                return Err(Error::invalid_field(format!(
                    "Exports field should be a string, array or object, got {other}"
                )))
            }
        };
        Ok(Self {
            kind: FieldKind::Exports,
            field,
        })
    }

    /// Build from an `imports` field value. Every key must start with `#`.
    pub fn imports(field: &Value) -> Result<Self, Error> {
        let Some(obj) = field.as_object() else {
            return Err(Error::invalid_field(format!(
                "Imports field should be an object, got {field}"
            )));
        };
        for key in obj.keys() {
            if !key.starts_with('#') {
                return Err(Error::invalid_field(format!(
                    "Imports field key should start with \"#\" (key: {})",
                    quoted(key)
                )));
            }
            if key.len() == 1 {
                return Err(Error::invalid_field(format!(
                    "Imports field key should have at least 2 characters (key: {})",
                    quoted(key)
                )));
            }
            if key[1..].starts_with('/') {
                return Err(Error::invalid_field(format!(
                    "Imports field key should not start with \"#/\" (key: {})",
                    quoted(key)
                )));
            }
        }
        Ok(Self {
            kind: FieldKind::Imports,
            field: obj.clone(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Map `request` to candidate targets under the active `conditions`.
    ///
    /// An empty list means the request is not exported (or imported).
    pub fn process(
        &self,
        request: &str,
        conditions: &HashSet<String>,
    ) -> Result<Vec<String>, Error> {
        let normalized = match self.kind {
            FieldKind::Exports => {
                let subpath = assert_exports_request(request)?;
                if subpath.is_empty() {
                    ".".to_string()
                } else {
                    format!("./{subpath}")
                }
            }
            FieldKind::Imports => format!("#{}", assert_imports_request(request)?),
        };

        let Some(found) = self.find_match(&normalized) else {
            return Ok(Vec::new());
        };

        let direct = if is_conditional(found.target) {
            match conditional_mapping(found.target, conditions) {
                Some(mapping) => mapping,
                None => return Ok(Vec::new()),
            }
        } else {
            found.target
        };

        let mut targets = Vec::new();
        self.direct_mapping(&found, direct, conditions, &mut targets)?;
        Ok(targets)
    }

    fn find_match<'a>(&'a self, request: &str) -> Option<FieldMatch<'a>> {
        if !request.contains('*') && !request.ends_with('/') {
            if let Some(target) = self.field.get(request) {
                return Some(FieldMatch {
                    target,
                    remaining: None,
                    is_pattern: false,
                    is_subpath: false,
                });
            }
        }

        let mut best_key = "";
        let mut best_remaining = None;
        for key in self.field.keys() {
            let star = key.find('*');
            if let Some(star) = star.filter(|&s| request.starts_with(&key[..s])) {
                let trailer = &key[star + 1..];
                if request.len() >= key.len()
                    && request.ends_with(trailer)
                    && pattern_key_compare(best_key, key) == Ordering::Greater
                    && key.rfind('*') == Some(star)
                {
                    best_key = key;
                    best_remaining = Some(request[star..request.len() - trailer.len()].to_string());
                }
            } else if key.ends_with('/')
                && request.starts_with(key.as_str())
                && pattern_key_compare(best_key, key) == Ordering::Greater
            {
                best_key = key;
                best_remaining = Some(request[key.len()..].to_string());
            }
        }

        let remaining = best_remaining?;
        let target = self.field.get(best_key)?;
        Some(FieldMatch {
            target,
            remaining: Some(remaining),
            is_pattern: best_key.contains('*'),
            is_subpath: best_key.ends_with('/'),
        })
    }

    fn direct_mapping(
        &self,
        found: &FieldMatch<'_>,
        mapping: &Value,
        conditions: &HashSet<String>,
        out: &mut Vec<String>,
    ) -> Result<(), Error> {
        match mapping {
            Value::String(target) => out.push(self.target_mapping(found, target)?),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(target) => out.push(self.target_mapping(found, target)?),
                        Value::Array(_) => self.direct_mapping(found, item, conditions, out)?,
                        _ => {
                            if let Some(inner) = conditional_mapping(item, conditions) {
                                self.direct_mapping(found, inner, conditions, out)?;
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn target_mapping(&self, found: &FieldMatch<'_>, target: &str) -> Result<String, Error> {
        let Some(remaining) = found.remaining.as_deref() else {
            self.assert_target(target, false)?;
            return Ok(target.to_string());
        };
        if found.is_subpath {
            self.assert_target(target, true)?;
            return Ok(format!("{target}{remaining}"));
        }
        self.assert_target(target, false)?;
        if found.is_pattern {
            Ok(target.replace('*', remaining))
        } else {
            Ok(target.to_string())
        }
    }

    fn assert_target(&self, target: &str, expect_folder: bool) -> Result<(), Error> {
        if self.kind == FieldKind::Exports
            && (target.starts_with('/')
                || (target.starts_with('.') && !target[1..].starts_with('/')))
        {
            return Err(Error::invalid_field(format!(
                "Export should be relative path and start with \"./\", got {}.",
                quoted(target)
            )));
        }
        let is_folder = target.ends_with('/');
        if is_folder != expect_folder {
            let what = match self.kind {
                FieldKind::Exports => "Export",
                FieldKind::Imports => "Import",
            };
            return Err(Error::invalid_field(if expect_folder {
                format!("Expecting folder to folder mapping. {} should end with \"/\"", quoted(target))
            } else {
                format!("{what} should not end with \"/\", got {}", quoted(target))
            }));
        }
        Ok(())
    }
}

fn root_only(field: &Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(".".to_string(), field.clone());
    map
}

fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Strip the leading `./` from an exports request.
fn assert_exports_request(request: &str) -> Result<&str, Error> {
    if !request.starts_with('.') {
        return Err(Error::invalid_field(
            "Request should be relative path and start with \".\"",
        ));
    }
    if request.len() == 1 {
        return Ok("");
    }
    if !request[1..].starts_with('/') {
        return Err(Error::invalid_field(
            "Request should be relative path and start with \"./\"",
        ));
    }
    if request.ends_with('/') {
        return Err(Error::invalid_field("Only requesting file allowed"));
    }
    Ok(&request[2..])
}

/// Strip the leading `#` from an imports request.
fn assert_imports_request(request: &str) -> Result<&str, Error> {
    if !request.starts_with('#') {
        return Err(Error::invalid_field("Request should start with \"#\""));
    }
    if request.len() == 1 {
        return Err(Error::invalid_field(
            "Request should have at least 2 characters",
        ));
    }
    if request[1..].starts_with('/') {
        return Err(Error::invalid_field("Request should not start with \"#/\""));
    }
    if request.ends_with('/') {
        return Err(Error::invalid_field("Only requesting file allowed"));
    }
    Ok(&request[1..])
}

/// Order two matching keys; `Greater` means `b` is the better match.
///
/// Longer prefix before the `*` wins, then keys with a `*` over folder
/// keys, then the longer key.
fn pattern_key_compare(a: &str, b: &str) -> Ordering {
    let a_star = a.find('*');
    let b_star = b.find('*');
    let base_a = a_star.map_or(a.len(), |i| i + 1);
    let base_b = b_star.map_or(b.len(), |i| i + 1);
    if base_a > base_b {
        return Ordering::Less;
    }
    if base_b > base_a {
        return Ordering::Greater;
    }
    if a_star.is_none() {
        return Ordering::Greater;
    }
    if b_star.is_none() {
        return Ordering::Less;
    }
    b.len().cmp(&a.len())
}

/// An object whose keys are conditions rather than subpaths.
fn is_conditional(mapping: &Value) -> bool {
    mapping
        .as_object()
        .is_some_and(|obj| obj.keys().next().is_some_and(|k| !k.starts_with('.')))
}

/// Pick the first condition (in declaration order) that is active.
///
/// Nested objects are searched recursively; a nested miss falls through
/// to the next condition.
fn conditional_mapping<'a>(mapping: &'a Value, conditions: &HashSet<String>) -> Option<&'a Value> {
    let obj = mapping.as_object()?;
    for (condition, inner) in obj {
        if condition != "default" && !conditions.contains(condition) {
            continue;
        }
        if inner.is_object() {
            if let Some(found) = conditional_mapping(inner, conditions) {
                return Some(found);
            }
            continue;
        }
        return Some(inner);
    }
    None
}
