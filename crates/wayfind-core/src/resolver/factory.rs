use std::collections::HashSet;

use wayfind_util::{get_type, PathType};

use crate::config::ResolverConfig;
use crate::error::Error;
use crate::fs::{CachedFileSystem, FileSystem, OsFileSystem, MAX_CACHE_DURATION};

use super::hooks::HookName;
use super::pipeline::Pipeline;
use super::plugins::{
    AliasOption, AliasPlugin, AppendPlugin, ConditionalPlugin, DescriptionFilePlugin,
    DirectoryExistsPlugin, ExportsFieldPlugin, FileExistsPlugin, ImportsFieldPlugin,
    JoinRequestPartPlugin, JoinRequestPlugin, MainFieldPlugin,
    ModulesInHierarchicalDirectoriesPlugin, ModulesInRootPlugin, NextPlugin, ParsePlugin, Plugin,
    RequestTest, ResultPlugin, SelfReferencePlugin, SymlinkPlugin, TryNextPlugin, UseFilePlugin,
};
use super::Resolver;

/// Every hook of the standard graph, in pipeline order.
const STANDARD_HOOKS: &[&str] = &[
    "resolve",
    "internal-resolve",
    "parsed-resolve",
    "described-resolve",
    "raw-resolve",
    "normal-resolve",
    "internal",
    "raw-module",
    "module",
    "resolve-as-module",
    "undescribed-resolve-in-package",
    "resolve-in-package",
    "resolve-in-existing-directory",
    "relative",
    "described-relative",
    "directory",
    "undescribed-existing-directory",
    "existing-directory",
    "undescribed-raw-file",
    "raw-file",
    "file",
    "final-file",
    "existing-file",
    "resolved",
];

/// Builds a [`Resolver`] with the standard hook graph for a config.
pub struct ResolverBuilder<F: FileSystem = OsFileSystem> {
    config: ResolverConfig,
    fs: F,
}

impl ResolverBuilder<OsFileSystem> {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            fs: OsFileSystem,
        }
    }
}

impl<F: FileSystem> ResolverBuilder<F> {
    /// Read through `fs` instead of the real filesystem.
    #[must_use]
    pub fn with_file_system<G: FileSystem>(self, fs: G) -> ResolverBuilder<G> {
        ResolverBuilder {
            config: self.config,
            fs,
        }
    }

    pub fn build(self) -> Result<Resolver<F>, Error> {
        let config = self.config;
        if config.cache_duration() > MAX_CACHE_DURATION {
            return Err(Error::InvalidArgument(format!(
                "cacheDurationMs must be at most {} ms, got {}",
                MAX_CACHE_DURATION.as_millis(),
                config.cache_duration_ms
            )));
        }
        let alias = AliasOption::from_config(&config.alias)?;
        let conditions: HashSet<String> = config.condition_names.iter().cloned().collect();
        let descriptions = config.description_files.clone();

        let mut graph = Graph(Pipeline::new());
        for hook in STANDARD_HOOKS {
            graph.0.ensure_hook(hook);
        }

        graph.tap("resolve", ParsePlugin::new(Some(config.fully_specified), HookName::ParsedResolve));
        // Rewritten requests (alias and imports targets) may always probe.
        graph.tap("internal-resolve", ParsePlugin::new(Some(false), HookName::ParsedResolve));

        graph.tap(
            "parsed-resolve",
            DescriptionFilePlugin::new(descriptions.clone(), false, HookName::DescribedResolve),
        );
        graph.tap("after-parsed-resolve", NextPlugin::new(HookName::DescribedResolve));

        graph.tap("described-resolve", NextPlugin::new(HookName::RawResolve));

        if !alias.is_empty() {
            graph.tap("raw-resolve", AliasPlugin::new(alias.clone(), HookName::InternalResolve));
        }
        graph.tap("raw-resolve", NextPlugin::new(HookName::NormalResolve));

        graph.tap(
            "after-normal-resolve",
            ConditionalPlugin::new(
                RequestTest {
                    module: Some(true),
                    ..RequestTest::default()
                },
                Some("resolve as module"),
                false,
                HookName::RawModule,
            ),
        );
        graph.tap(
            "after-normal-resolve",
            ConditionalPlugin::new(
                RequestTest {
                    internal: Some(true),
                    ..RequestTest::default()
                },
                Some("resolve as internal import"),
                false,
                HookName::Internal,
            ),
        );
        graph.tap("after-normal-resolve", JoinRequestPlugin::new(HookName::Relative));

        for field in &config.imports_fields {
            graph.tap(
                "internal",
                ImportsFieldPlugin::new(
                    conditions.clone(),
                    field.clone(),
                    HookName::Relative,
                    HookName::InternalResolve,
                ),
            );
        }

        for field in &config.exports_fields {
            graph.tap(
                "raw-module",
                SelfReferencePlugin::new(field.clone(), HookName::ResolveAsModule),
            );
        }
        for group in module_groups(&config.modules) {
            match group {
                ModuleGroup::Hierarchical(names) => graph.tap(
                    "raw-module",
                    ModulesInHierarchicalDirectoriesPlugin::new(names, HookName::Module),
                ),
                ModuleGroup::Root(root) => {
                    graph.tap("raw-module", ModulesInRootPlugin::new(root, HookName::Module));
                }
            }
        }

        graph.tap("module", JoinRequestPartPlugin::new(HookName::ResolveAsModule));

        graph.tap(
            "resolve-as-module",
            ConditionalPlugin::new(
                RequestTest {
                    directory: Some(false),
                    request: Some(".".to_string()),
                    ..RequestTest::default()
                },
                Some("single file module"),
                true,
                HookName::UndescribedRawFile,
            ),
        );
        graph.tap(
            "resolve-as-module",
            DirectoryExistsPlugin::new(HookName::UndescribedResolveInPackage),
        );

        graph.tap(
            "undescribed-resolve-in-package",
            DescriptionFilePlugin::new(descriptions.clone(), false, HookName::ResolveInPackage),
        );
        graph.tap(
            "after-undescribed-resolve-in-package",
            NextPlugin::new(HookName::ResolveInPackage),
        );

        for field in &config.exports_fields {
            graph.tap(
                "resolve-in-package",
                ExportsFieldPlugin::new(conditions.clone(), field.clone(), HookName::Relative),
            );
        }
        graph.tap(
            "resolve-in-package",
            NextPlugin::new(HookName::ResolveInExistingDirectory),
        );

        graph.tap(
            "resolve-in-existing-directory",
            JoinRequestPlugin::new(HookName::Relative),
        );

        graph.tap(
            "relative",
            DescriptionFilePlugin::new(descriptions.clone(), true, HookName::DescribedRelative),
        );
        graph.tap("after-relative", NextPlugin::new(HookName::DescribedRelative));

        graph.tap(
            "described-relative",
            ConditionalPlugin::new(
                RequestTest {
                    directory: Some(false),
                    ..RequestTest::default()
                },
                None,
                true,
                HookName::RawFile,
            ),
        );
        graph.tap(
            "described-relative",
            ConditionalPlugin::new(
                RequestTest {
                    fully_specified: Some(false),
                    ..RequestTest::default()
                },
                Some("as directory"),
                true,
                HookName::Directory,
            ),
        );

        graph.tap(
            "directory",
            DirectoryExistsPlugin::new(HookName::UndescribedExistingDirectory),
        );

        graph.tap(
            "undescribed-existing-directory",
            DescriptionFilePlugin::new(descriptions.clone(), false, HookName::ExistingDirectory),
        );
        graph.tap(
            "after-undescribed-existing-directory",
            NextPlugin::new(HookName::ExistingDirectory),
        );

        for field in &config.main_fields {
            graph.tap(
                "existing-directory",
                MainFieldPlugin::new(field.clone(), true, HookName::ResolveInExistingDirectory),
            );
        }
        for file in &config.main_files {
            graph.tap(
                "existing-directory",
                UseFilePlugin::new(file.clone(), HookName::UndescribedRawFile),
            );
        }

        graph.tap(
            "undescribed-raw-file",
            DescriptionFilePlugin::new(descriptions, true, HookName::RawFile),
        );
        graph.tap("after-undescribed-raw-file", NextPlugin::new(HookName::RawFile));

        graph.tap(
            "raw-file",
            ConditionalPlugin::new(
                RequestTest {
                    fully_specified: Some(true),
                    ..RequestTest::default()
                },
                None,
                false,
                HookName::File,
            ),
        );
        if !config.enforce_extension {
            graph.tap("raw-file", TryNextPlugin::new("no extension", HookName::File));
        }
        for extension in &config.extensions {
            graph.tap("raw-file", AppendPlugin::new(extension.clone(), HookName::File));
        }

        if !alias.is_empty() {
            graph.tap("file", AliasPlugin::new(alias, HookName::InternalResolve));
        }
        graph.tap("file", NextPlugin::new(HookName::FinalFile));

        graph.tap("final-file", FileExistsPlugin::new(HookName::ExistingFile));

        if config.symlinks {
            graph.tap("existing-file", SymlinkPlugin::new(HookName::ExistingFile));
        }
        graph.tap("existing-file", NextPlugin::new(HookName::Resolved));

        graph.tap("resolved", ResultPlugin::new());

        let fs = CachedFileSystem::new(self.fs, config.cache_duration());
        Ok(Resolver::from_parts(graph.0, fs, config))
    }
}

struct Graph(Pipeline);

impl Graph {
    fn tap(&mut self, hook: &str, plugin: impl Plugin + 'static) {
        let hook = self.0.ensure_hook(hook);
        self.0.tap(&hook, plugin);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ModuleGroup {
    Hierarchical(Vec<String>),
    Root(String),
}

/// Runs of directory names are searched together in each ancestor;
/// absolute paths break a run and are searched on their own.
fn module_groups(modules: &[String]) -> Vec<ModuleGroup> {
    let mut groups = Vec::new();
    let mut names = Vec::new();
    for module in modules {
        if matches!(get_type(module), PathType::AbsolutePosix | PathType::AbsoluteWin) {
            if !names.is_empty() {
                groups.push(ModuleGroup::Hierarchical(std::mem::take(&mut names)));
            }
            groups.push(ModuleGroup::Root(module.clone()));
        } else {
            names.push(module.clone());
        }
    }
    if !names.is_empty() {
        groups.push(ModuleGroup::Hierarchical(names));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_module_groups() {
        let modules: Vec<String> = ["node_modules", "web_modules", "/opt/shared", "vendor"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(
            module_groups(&modules),
            vec![
                ModuleGroup::Hierarchical(vec!["node_modules".into(), "web_modules".into()]),
                ModuleGroup::Root("/opt/shared".into()),
                ModuleGroup::Hierarchical(vec!["vendor".into()]),
            ]
        );
    }

    #[test]
    fn test_standard_graph_taps() {
        let resolver = ResolverBuilder::new(ResolverConfig::default()).build().unwrap();
        let pipeline = resolver.pipeline();

        assert_eq!(
            pipeline.taps(&HookName::ParsedResolve),
            vec!["DescriptionFilePlugin", "NextPlugin"]
        );
        assert_eq!(
            pipeline.taps(&HookName::RawFile),
            vec!["ConditionalPlugin", "TryNextPlugin", "AppendPlugin", "AppendPlugin", "AppendPlugin"]
        );
        assert_eq!(
            pipeline.taps(&HookName::ExistingFile),
            vec!["SymlinkPlugin", "NextPlugin"]
        );
        assert_eq!(pipeline.taps(&HookName::Resolved), vec!["ResultPlugin"]);
        for hook in STANDARD_HOOKS {
            assert!(pipeline.get_hook(hook).is_ok(), "{hook}");
        }
    }

    #[test]
    fn test_optional_taps_follow_config() {
        let config = ResolverConfig::default()
            .with_symlinks(false)
            .with_enforce_extension(true)
            .with_alias("fs", json!(false));
        let resolver = ResolverBuilder::new(config).build().unwrap();
        let pipeline = resolver.pipeline();

        assert_eq!(pipeline.taps(&HookName::ExistingFile), vec!["NextPlugin"]);
        assert!(!pipeline.taps(&HookName::RawFile).contains(&"TryNextPlugin"));
        assert_eq!(pipeline.taps(&HookName::RawResolve), vec!["AliasPlugin", "NextPlugin"]);
        assert_eq!(pipeline.taps(&HookName::File), vec!["AliasPlugin", "NextPlugin"]);
    }

    #[test]
    fn test_invalid_alias_is_rejected() {
        let config = ResolverConfig::default().with_alias("x", json!(42));
        assert!(matches!(
            ResolverBuilder::new(config).build(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_cache_duration_is_rejected() {
        let config = ResolverConfig::default().with_cache_duration_ms(u64::MAX);
        assert!(matches!(
            ResolverBuilder::new(config).build(),
            Err(Error::InvalidArgument(_))
        ));

        let longest = ResolverConfig::default().with_cache_duration_ms(60 * 60 * 1000);
        assert!(ResolverBuilder::new(longest).build().is_ok());
    }
}
