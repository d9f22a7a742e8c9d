use std::collections::HashSet;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wayfind_util::{escapes_package_root, get_type, parse_identifier, PathType};

use crate::error::Error;
use crate::exports::FieldKind;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Resolves a package importing itself by its own `name`.
///
/// Only packages that declare an exports field can be self-referenced.
pub struct SelfReferencePlugin {
    exports_field: String,
    target: HookName,
}

impl SelfReferencePlugin {
    #[must_use]
    pub fn new(exports_field: impl Into<String>, target: HookName) -> Self {
        Self {
            exports_field: exports_field.into(),
            target,
        }
    }
}

impl Plugin for SelfReferencePlugin {
    fn name(&self) -> &'static str {
        "SelfReferencePlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(file) = request.description_file() else {
                return Ok(Outcome::Continue);
            };
            let Some(req) = request.request.as_deref() else {
                return Ok(Outcome::Continue);
            };
            if file.manifest.field(&self.exports_field).is_none() {
                return Ok(Outcome::Continue);
            }
            let Some(name) = file.manifest.name() else {
                return Ok(Outcome::Continue);
            };
            let Some(rest) = req.strip_prefix(name) else {
                return Ok(Outcome::Continue);
            };
            if !rest.is_empty() && !rest.starts_with('/') {
                return Ok(Outcome::Continue);
            }

            let mut obj = request.clone();
            obj.request = Some(format!(".{rest}"));
            obj.path = Some(file.root.clone());
            obj.relative_path = Some(".".to_string());

            let result = resolver
                .do_resolve(&self.target, obj, Some("self reference".to_string()), ctx)
                .await?;
            Ok(Outcome::forward(result))
        }
        .boxed_local()
    }
}

/// Maps a request into a package through its exports field.
///
/// Once a package has an exports field it is authoritative: a request
/// it does not export fails instead of falling back to plain files.
pub struct ExportsFieldPlugin {
    conditions: HashSet<String>,
    field_name: String,
    target: HookName,
}

impl ExportsFieldPlugin {
    #[must_use]
    pub fn new(conditions: HashSet<String>, field_name: impl Into<String>, target: HookName) -> Self {
        Self {
            conditions,
            field_name: field_name.into(),
            target,
        }
    }
}

impl Plugin for ExportsFieldPlugin {
    fn name(&self) -> &'static str {
        "ExportsFieldPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(file) = request.description_file() else {
                return Ok(Outcome::Continue);
            };
            if request.relative_path.as_deref() != Some(".") {
                return Ok(Outcome::Continue);
            }
            let Some(req) = request.request.as_deref() else {
                return Ok(Outcome::Continue);
            };
            let Some(field) = file.manifest.field(&self.field_name) else {
                return Ok(Outcome::Continue);
            };

            let remaining = if request.query.is_empty() && request.fragment.is_empty() {
                req.to_string()
            } else {
                let base = if req == "." { "./" } else { req };
                format!("{base}{}{}", request.query, request.fragment)
            };
            if request.directory {
                return Err(Error::DirectoryRequest {
                    field: self.field_name.clone(),
                    request: remaining,
                });
            }

            let targets = resolver
                .manifests()
                .processor(&file.manifest, FieldKind::Exports, &self.field_name, field)
                .and_then(|processor| processor.process(&remaining, &self.conditions))
                .map_err(|err| {
                    ctx.log(|| format!("Exports field in {} can't be processed: {err}", file.path));
                    err
                })?;
            if targets.is_empty() {
                return Err(Error::NotExported {
                    request: remaining,
                    root: file.root,
                    description_file: file.path,
                });
            }

            for target in targets {
                let Some(parsed) = parse_identifier(&target) else {
                    continue;
                };
                if escapes_package_root(&parsed.request) {
                    return Err(Error::OutOfPackageScope {
                        target: parsed.request,
                    });
                }

                let mut obj = request.clone();
                obj.request = None;
                obj.path = Some(resolver.join(&file.root, &parsed.request));
                obj.relative_path = Some(parsed.request);
                obj.query = parsed.query;
                obj.fragment = parsed.fragment;

                let message = format!("using exports field: {target}");
                if let Some(found) = resolver
                    .do_resolve(&self.target, obj, Some(message), ctx)
                    .await?
                {
                    return Ok(Outcome::Resolved(found));
                }
            }
            Ok(Outcome::Stop)
        }
        .boxed_local()
    }
}

/// Maps a `#`-prefixed request through the imports field of the
/// enclosing package.
///
/// Relative targets resolve as files inside the package; anything else is
/// resolved again as a fully specified package request.
pub struct ImportsFieldPlugin {
    conditions: HashSet<String>,
    field_name: String,
    target_file: HookName,
    target_package: HookName,
}

impl ImportsFieldPlugin {
    #[must_use]
    pub fn new(
        conditions: HashSet<String>,
        field_name: impl Into<String>,
        target_file: HookName,
        target_package: HookName,
    ) -> Self {
        Self {
            conditions,
            field_name: field_name.into(),
            target_file,
            target_package,
        }
    }
}

impl Plugin for ImportsFieldPlugin {
    fn name(&self) -> &'static str {
        "ImportsFieldPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(file) = request.description_file() else {
                return Ok(Outcome::Continue);
            };
            let Some(req) = request.request.as_deref() else {
                return Ok(Outcome::Continue);
            };
            let Some(field) = file.manifest.field(&self.field_name) else {
                return Ok(Outcome::Continue);
            };

            let remaining = format!("{req}{}{}", request.query, request.fragment);
            if request.directory {
                return Err(Error::DirectoryRequest {
                    field: self.field_name.clone(),
                    request: remaining,
                });
            }

            let targets = resolver
                .manifests()
                .processor(&file.manifest, FieldKind::Imports, &self.field_name, field)
                .and_then(|processor| processor.process(&remaining, &self.conditions))
                .map_err(|err| {
                    ctx.log(|| format!("Imports field in {} can't be processed: {err}", file.path));
                    err
                })?;
            if targets.is_empty() {
                return Err(Error::NotImported {
                    request: remaining,
                    root: file.root,
                    description_file: file.path,
                });
            }

            for target in targets {
                let Some(parsed) = parse_identifier(&target) else {
                    continue;
                };

                let mut obj = request.clone();
                obj.query = parsed.query;
                obj.fragment = parsed.fragment;
                let (hook, message) = if get_type(&parsed.request) == PathType::Relative {
                    if escapes_package_root(&parsed.request) {
                        return Err(Error::OutOfPackageScope {
                            target: parsed.request,
                        });
                    }
                    obj.request = None;
                    obj.path = Some(resolver.join(&file.root, &parsed.request));
                    obj.relative_path = Some(parsed.request);
                    (&self.target_file, format!("using imports field: {target}"))
                } else {
                    obj.request = Some(parsed.request.clone());
                    obj.relative_path = Some(parsed.request);
                    obj.fully_specified = true;
                    (&self.target_package, format!("resolving import {target}"))
                };

                if let Some(found) = resolver.do_resolve(hook, obj, Some(message), ctx).await? {
                    return Ok(Outcome::Resolved(found));
                }
            }
            Ok(Outcome::Stop)
        }
        .boxed_local()
    }
}
