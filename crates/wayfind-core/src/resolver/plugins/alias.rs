use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::resolver::context::StepContext;
use crate::resolver::hooks::HookName;
use crate::resolver::pipeline::Pipeline;
use crate::resolver::request::ResolveRequest;

use super::{Outcome, Plugin};

/// Where an alias points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// Resolve to nothing (`false` in configuration).
    Ignore,
    /// Alternatives, tried in order.
    Paths(Vec<String>),
}

/// One alias entry. A trailing `$` on the configured name makes it match
/// the exact request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasOption {
    pub name: String,
    pub target: AliasTarget,
    pub only_module: bool,
}

impl AliasOption {
    #[must_use]
    pub fn new(name: &str, target: AliasTarget) -> Self {
        match name.strip_suffix('$') {
            Some(exact) => Self {
                name: exact.to_string(),
                target,
                only_module: true,
            },
            None => Self {
                name: name.to_string(),
                target,
                only_module: false,
            },
        }
    }

    /// Read an alias map: each value is a string, an array of strings or `false`.
    pub fn from_config(config: &Map<String, Value>) -> Result<Vec<Self>, Error> {
        config
            .iter()
            .map(|(name, value)| {
                let target = match value {
                    Value::Bool(false) => AliasTarget::Ignore,
                    Value::String(path) => AliasTarget::Paths(vec![path.clone()]),
                    Value::Array(items) => AliasTarget::Paths(
                        items
                            .iter()
                            .map(|item| {
                                item.as_str().map(str::to_string).ok_or_else(|| {
                                    Error::InvalidArgument(format!(
                                        "alias '{name}' has a non-string alternative"
                                    ))
                                })
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => {
                        return Err(Error::InvalidArgument(format!(
                            "alias '{name}' must be a string, an array of strings or false"
                        )))
                    }
                };
                Ok(Self::new(name, target))
            })
            .collect()
    }

    /// The part of a wildcard name before and after its single `*`.
    fn wildcard(&self) -> Option<(&str, &str)> {
        let (prefix, suffix) = self.name.split_once('*')?;
        (!suffix.contains('*')).then_some((prefix, suffix))
    }
}

/// Rewrites requests matching an alias and resolves the result from the top.
pub struct AliasPlugin {
    options: Vec<AliasOption>,
    target: HookName,
}

impl AliasPlugin {
    #[must_use]
    pub fn new(options: Vec<AliasOption>, target: HookName) -> Self {
        Self { options, target }
    }
}

impl Plugin for AliasPlugin {
    fn name(&self) -> &'static str {
        "AliasPlugin"
    }

    fn apply<'a>(
        &'a self,
        resolver: &'a Pipeline,
        request: ResolveRequest,
        ctx: &'a StepContext<'a>,
    ) -> LocalBoxFuture<'a, Result<Outcome, Error>> {
        async move {
            let Some(inner) = request.request.clone().or_else(|| request.path.clone()) else {
                return Ok(Outcome::Continue);
            };

            for item in &self.options {
                let matches_name = inner == item.name
                    || (!item.only_module
                        && inner.starts_with(item.name.as_str())
                        && inner[item.name.len()..].starts_with('/'));
                let wildcard = if item.only_module {
                    None
                } else {
                    item.wildcard().filter(|(prefix, suffix)| {
                        inner.len() >= prefix.len() + suffix.len()
                            && inner.starts_with(prefix)
                            && inner.ends_with(suffix)
                    })
                };
                if !matches_name && wildcard.is_none() {
                    continue;
                }

                let alternatives = match &item.target {
                    AliasTarget::Ignore => {
                        let mut ignored = request.clone();
                        ignored.path = None;
                        if let Some(on_result) = ctx.on_result() {
                            on_result(ignored);
                            return Ok(Outcome::Stop);
                        }
                        return Ok(Outcome::Resolved(ignored));
                    }
                    AliasTarget::Paths(paths) => paths,
                };

                let mut tried = false;
                for alias in alternatives {
                    if inner == *alias
                        || (inner.starts_with(alias.as_str())
                            && inner[alias.len()..].starts_with('/'))
                    {
                        continue;
                    }
                    tried = true;

                    let new_request = match wildcard {
                        Some((prefix, suffix)) => {
                            let matched = &inner[prefix.len()..inner.len() - suffix.len()];
                            alias.replacen('*', matched, 1)
                        }
                        None => format!("{alias}{}", &inner[item.name.len()..]),
                    };
                    let message = format!(
                        "aliased with mapping '{}': '{alias}' to '{new_request}'",
                        item.name
                    );
                    let mut obj = request.clone();
                    obj.request = Some(new_request);
                    obj.fully_specified = false;

                    if let Some(found) = resolver
                        .do_resolve(&self.target, obj, Some(message), ctx)
                        .await?
                    {
                        return Ok(Outcome::Resolved(found));
                    }
                }
                if tried {
                    return Ok(Outcome::Stop);
                }
            }
            Ok(Outcome::Continue)
        }
        .boxed_local()
    }
}
