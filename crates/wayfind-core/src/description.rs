//! Package description files and the per-manifest processor cache.
//!
//! Every manifest read during resolution is interned into a
//! [`ManifestArena`], which hands out a [`Manifest`] handle. Compiled
//! exports/imports processors are cached per handle, so a manifest that
//! is re-read with new content gets a new handle and fresh processors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::error::Error;
use crate::exports::{FieldKind, FieldProcessor};

/// Identity of one parsed manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifestId(u64);

/// A parsed manifest and its identity.
#[derive(Debug, Clone)]
pub struct Manifest {
    id: ManifestId,
    data: Arc<Value>,
}

impl Manifest {
    #[must_use]
    pub fn id(&self) -> ManifestId {
        self.id
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// A top-level field, treating `null` as absent.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// The manifest's `name`, when it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }
}

/// The nearest description file found for a directory.
#[derive(Debug, Clone)]
pub struct DescriptionFile {
    /// Full path of the manifest file.
    pub path: String,
    /// Directory containing the manifest.
    pub root: String,
    pub manifest: Manifest,
}

#[derive(Debug, Default)]
struct ArenaInner {
    next_id: u64,
    by_path: HashMap<String, Manifest>,
    processors: HashMap<(ManifestId, FieldKind, String), Rc<FieldProcessor>>,
}

/// Manifest handles and the field processors compiled from them.
#[derive(Debug, Default)]
pub struct ManifestArena {
    inner: RefCell<ArenaInner>,
}

impl ManifestArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `data` read from `path`.
    ///
    /// The same allocation read again keeps its handle; different content
    /// gets a new one and the old handle's processors are dropped.
    pub fn intern(&self, path: &str, data: Arc<Value>) -> Manifest {
        let mut inner = self.inner.borrow_mut();
        if let Some(existing) = inner.by_path.get(path) {
            if Arc::ptr_eq(&existing.data, &data) {
                return existing.clone();
            }
        }

        let id = ManifestId(inner.next_id);
        inner.next_id += 1;
        let manifest = Manifest { id, data };
        if let Some(old) = inner.by_path.insert(path.to_string(), manifest.clone()) {
            inner.processors.retain(|(owner, _, _), _| *owner != old.id);
            trace!(path, old = old.id.0, new = id.0, "manifest replaced");
        }
        manifest
    }

    /// The processor for `manifest`'s `field_name` field, compiled on first use.
    pub fn processor(
        &self,
        manifest: &Manifest,
        kind: FieldKind,
        field_name: &str,
        field: &Value,
    ) -> Result<Rc<FieldProcessor>, Error> {
        let key = (manifest.id, kind, field_name.to_string());
        if let Some(hit) = self.inner.borrow().processors.get(&key) {
            return Ok(Rc::clone(hit));
        }
        let processor = Rc::new(match kind {
            FieldKind::Exports => FieldProcessor::exports(field)?,
            FieldKind::Imports => FieldProcessor::imports(field)?,
        });
        self.inner
            .borrow_mut()
            .processors
            .insert(key, Rc::clone(&processor));
        Ok(processor)
    }

    /// Number of manifests currently interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().by_path.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of compiled processors currently cached.
    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.inner.borrow().processors.len()
    }
}
