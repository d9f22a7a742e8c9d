//! Named extension points of the pipeline.
//!
//! Hook names are accepted in kebab-case or camelCase. A `before` or
//! `after` prefix addresses the same hook at stage -10 or +10.

use std::fmt;

/// Stage of a tap registered without a `before`/`after` prefix.
pub const DEFAULT_STAGE: i32 = 0;

/// Stage offset of a `before`/`after` prefix.
pub const STAGE_OFFSET: i32 = 10;

/// A pipeline hook.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookName {
    Resolve,
    InternalResolve,
    ParsedResolve,
    DescribedResolve,
    RawResolve,
    NormalResolve,
    Internal,
    RawModule,
    Module,
    ResolveAsModule,
    UndescribedResolveInPackage,
    ResolveInPackage,
    ResolveInExistingDirectory,
    Relative,
    DescribedRelative,
    Directory,
    UndescribedExistingDirectory,
    ExistingDirectory,
    UndescribedRawFile,
    RawFile,
    File,
    FinalFile,
    ExistingFile,
    Resolved,
    /// Any other hook, by its camelCase name.
    Custom(String),
}

impl HookName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resolve => "resolve",
            Self::InternalResolve => "internalResolve",
            Self::ParsedResolve => "parsedResolve",
            Self::DescribedResolve => "describedResolve",
            Self::RawResolve => "rawResolve",
            Self::NormalResolve => "normalResolve",
            Self::Internal => "internal",
            Self::RawModule => "rawModule",
            Self::Module => "module",
            Self::ResolveAsModule => "resolveAsModule",
            Self::UndescribedResolveInPackage => "undescribedResolveInPackage",
            Self::ResolveInPackage => "resolveInPackage",
            Self::ResolveInExistingDirectory => "resolveInExistingDirectory",
            Self::Relative => "relative",
            Self::DescribedRelative => "describedRelative",
            Self::Directory => "directory",
            Self::UndescribedExistingDirectory => "undescribedExistingDirectory",
            Self::ExistingDirectory => "existingDirectory",
            Self::UndescribedRawFile => "undescribedRawFile",
            Self::RawFile => "rawFile",
            Self::File => "file",
            Self::FinalFile => "finalFile",
            Self::ExistingFile => "existingFile",
            Self::Resolved => "resolved",
            Self::Custom(name) => name,
        }
    }

    /// Look up a hook by name, kebab-case or camelCase.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let name = to_camel_case(name);
        match name.as_str() {
            "resolve" => Self::Resolve,
            "internalResolve" => Self::InternalResolve,
            "parsedResolve" => Self::ParsedResolve,
            "describedResolve" => Self::DescribedResolve,
            "rawResolve" => Self::RawResolve,
            "normalResolve" => Self::NormalResolve,
            "internal" => Self::Internal,
            "rawModule" => Self::RawModule,
            "module" => Self::Module,
            "resolveAsModule" => Self::ResolveAsModule,
            "undescribedResolveInPackage" => Self::UndescribedResolveInPackage,
            "resolveInPackage" => Self::ResolveInPackage,
            "resolveInExistingDirectory" => Self::ResolveInExistingDirectory,
            "relative" => Self::Relative,
            "describedRelative" => Self::DescribedRelative,
            "directory" => Self::Directory,
            "undescribedExistingDirectory" => Self::UndescribedExistingDirectory,
            "existingDirectory" => Self::ExistingDirectory,
            "undescribedRawFile" => Self::UndescribedRawFile,
            "rawFile" => Self::RawFile,
            "file" => Self::File,
            "finalFile" => Self::FinalFile,
            "existingFile" => Self::ExistingFile,
            "resolved" => Self::Resolved,
            _ => Self::Custom(name),
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook plus the stage at which taps registered through it run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookRef {
    pub name: HookName,
    pub stage: i32,
}

impl HookRef {
    /// Parse `name`, honouring a `before`/`after` prefix.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let camel = to_camel_case(name);
        for (prefix, stage) in [("before", -STAGE_OFFSET), ("after", STAGE_OFFSET)] {
            if let Some(rest) = camel.strip_prefix(prefix) {
                let mut chars = rest.chars();
                if let Some(first) = chars.next() {
                    let inner: String = first.to_lowercase().chain(chars).collect();
                    return Self {
                        name: HookName::new(&inner),
                        stage,
                    };
                }
            }
        }
        Self {
            name: HookName::new(&camel),
            stage: DEFAULT_STAGE,
        }
    }
}

impl From<HookName> for HookRef {
    fn from(name: HookName) -> Self {
        Self {
            name,
            stage: DEFAULT_STAGE,
        }
    }
}

/// `described-resolve` becomes `describedResolve`.
#[must_use]
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    out.push(next.to_ascii_uppercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("described-resolve"), "describedResolve");
        assert_eq!(to_camel_case("resolve"), "resolve");
        assert_eq!(to_camel_case("a-B"), "a-B");
    }

    #[test]
    fn test_names_round_trip() {
        for name in ["resolve", "undescribed-raw-file", "existingFile", "resolved"] {
            let hook = HookName::new(name);
            assert!(!matches!(hook, HookName::Custom(_)), "{name}");
            assert_eq!(hook.to_string(), to_camel_case(name));
        }
        assert_eq!(HookName::new("my-hook"), HookName::Custom("myHook".into()));
    }

    #[test]
    fn test_stage_prefixes() {
        let before = HookRef::parse("before-raw-file");
        assert_eq!(before.name, HookName::RawFile);
        assert_eq!(before.stage, -10);

        let after = HookRef::parse("afterResolve");
        assert_eq!(after.name, HookName::Resolve);
        assert_eq!(after.stage, 10);

        let plain = HookRef::parse("file");
        assert_eq!(plain.stage, 0);

        // a bare prefix is a hook name of its own
        assert_eq!(HookRef::parse("before").name, HookName::Custom("before".into()));
    }
}
