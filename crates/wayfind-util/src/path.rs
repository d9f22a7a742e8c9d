//! Path classification and joining.
//!
//! Every path and request string is classified by looking at its first
//! two or three characters only. The classification drives which
//! normalization rules apply when joining a request onto a directory.

use std::cell::RefCell;
use std::collections::HashMap;

/// Syntactic category of a path or request string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathType {
    /// The empty string.
    Empty,
    /// A bare name such as `lodash` or `@scope/pkg/file`.
    Normal,
    /// Starts with `./` or `../`, or is exactly `.` or `..`.
    Relative,
    /// A drive-letter path such as `C:\x` or `C:/x`.
    AbsoluteWin,
    /// Starts with `/`.
    AbsolutePosix,
    /// Starts with `#`.
    Internal,
}

/// Classify `p` by its leading characters.
#[must_use]
pub fn get_type(p: &str) -> PathType {
    let b = p.as_bytes();
    match b.len() {
        0 => PathType::Empty,
        1 => match b[0] {
            b'.' => PathType::Relative,
            b'/' => PathType::AbsolutePosix,
            b'#' => PathType::Internal,
            _ => PathType::Normal,
        },
        2 => match b[0] {
            b'.' if matches!(b[1], b'.' | b'/') => PathType::Relative,
            b'/' => PathType::AbsolutePosix,
            b'#' => PathType::Internal,
            c if c.is_ascii_alphabetic() && b[1] == b':' => PathType::AbsoluteWin,
            _ => PathType::Normal,
        },
        _ => match b[0] {
            b'.' => match b[1] {
                b'/' => PathType::Relative,
                b'.' if b[2] == b'/' => PathType::Relative,
                _ => PathType::Normal,
            },
            b'/' => PathType::AbsolutePosix,
            b'#' => PathType::Internal,
            c if c.is_ascii_alphabetic() && b[1] == b':' && matches!(b[2], b'/' | b'\\') => {
                PathType::AbsoluteWin
            }
            _ => PathType::Normal,
        },
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Collapse `.` and `..` segments. Leading `..` survive only for relative paths.
fn collapse<'a>(parts: impl Iterator<Item = &'a str>, allow_above_root: bool) -> Vec<&'a str> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in parts {
        match segment {
            "" | "." => {}
            ".." => {
                if stack.last().is_some_and(|s| *s != "..") {
                    stack.pop();
                } else if allow_above_root {
                    stack.push("..");
                }
            }
            _ => stack.push(segment),
        }
    }
    stack
}

fn posix_normalize(p: &str) -> String {
    if p.is_empty() {
        return ".".to_string();
    }
    let absolute = p.starts_with('/');
    let trailing = p.ends_with('/');
    let body = collapse(p.split('/'), !absolute);

    if body.is_empty() {
        return match (absolute, trailing) {
            (true, _) => "/".to_string(),
            (false, true) => "./".to_string(),
            (false, false) => ".".to_string(),
        };
    }

    let mut out = String::with_capacity(p.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&body.join("/"));
    if trailing {
        out.push('/');
    }
    out
}

/// Normalize a drive-letter path. The caller guarantees `p` starts with `X:`.
fn win_normalize(p: &str) -> String {
    let (device, rest) = p.split_at(2);
    let absolute = rest.starts_with(is_separator);
    let trailing = rest.len() > 1 && rest.ends_with(is_separator);
    let body = collapse(rest.split(is_separator), !absolute);

    let mut out = String::with_capacity(p.len());
    out.push_str(device);
    if absolute {
        out.push('\\');
    }
    if body.is_empty() {
        if !absolute {
            out.push('.');
        }
        return out;
    }
    out.push_str(&body.join("\\"));
    if trailing {
        out.push('\\');
    }
    out
}

/// Normalize `p`, keeping relative paths prefixed with `./`.
#[must_use]
pub fn normalize(p: &str) -> String {
    match get_type(p) {
        PathType::Empty => p.to_string(),
        PathType::AbsoluteWin => win_normalize(p),
        PathType::Relative => {
            let r = posix_normalize(p);
            if get_type(&r) == PathType::Relative {
                r
            } else {
                format!("./{r}")
            }
        }
        _ => posix_normalize(p),
    }
}

/// Join `request` onto `root`.
///
/// An absolute request wins outright. Otherwise the root's kind picks
/// POSIX or Windows normalization.
#[must_use]
pub fn join(root: &str, request: &str) -> String {
    if request.is_empty() {
        return normalize(root);
    }
    let request_type = get_type(request);
    match request_type {
        PathType::AbsolutePosix => return posix_normalize(request),
        PathType::AbsoluteWin => return win_normalize(request),
        _ => {}
    }
    match get_type(root) {
        PathType::Normal | PathType::Relative | PathType::AbsolutePosix => {
            return posix_normalize(&format!("{root}/{request}"));
        }
        PathType::AbsoluteWin => return win_normalize(&format!("{root}\\{request}")),
        PathType::Empty | PathType::Internal => {}
    }
    if request_type == PathType::Relative {
        let r = posix_normalize(root);
        return if get_type(&r) == PathType::Relative {
            r
        } else {
            format!("./{r}")
        };
    }
    posix_normalize(root)
}

/// Memo table for [`join`], keyed by root then request.
///
/// Owned by a single resolver; not shared across threads.
#[derive(Debug, Default)]
pub struct JoinCache {
    roots: RefCell<HashMap<String, HashMap<String, String>>>,
}

impl JoinCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`join`], answered from the table when seen before.
    pub fn join(&self, root: &str, request: &str) -> String {
        if let Some(hit) = self
            .roots
            .borrow()
            .get(root)
            .and_then(|requests| requests.get(request))
        {
            return hit.clone();
        }
        let joined = join(root, request);
        self.roots
            .borrow_mut()
            .entry(root.to_string())
            .or_default()
            .insert(request.to_string(), joined.clone());
        joined
    }

    /// Number of memoized `(root, request)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.borrow().values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.roots.borrow_mut().clear();
    }
}

/// Everything before the last separator, or `""` when there is none.
#[must_use]
pub fn dirname(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Parent directory of `directory`, or `None` at a filesystem root.
#[must_use]
pub fn cd_up(directory: &str) -> Option<&str> {
    if directory == "/" {
        return None;
    }
    let idx = directory.rfind(is_separator)?;
    if idx == 0 {
        Some(&directory[..1])
    } else {
        Some(&directory[..idx])
    }
}

/// A path together with all of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorPaths {
    /// The path itself first, then each parent, ending at the root.
    pub paths: Vec<String>,
    /// The last segment of each entry in `paths`; the root keeps its separator.
    pub segments: Vec<String>,
}

/// List `path` and its ancestors, innermost first.
///
/// `/a/b/c` yields paths `[/a/b/c, /a/b, /a, /]` and segments `[c, b, a, /]`.
#[must_use]
pub fn get_paths(path: &str) -> AncestorPaths {
    if path == "/" {
        return AncestorPaths {
            paths: vec!["/".to_string()],
            segments: vec![String::new()],
        };
    }

    // (start, end of name, end including separators)
    let mut chunks: Vec<(usize, usize, usize)> = Vec::new();
    let mut start = 0;
    let mut iter = path.char_indices().peekable();
    while let Some((idx, c)) = iter.next() {
        if !is_separator(c) {
            continue;
        }
        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = iter.peek() {
            if !is_separator(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            iter.next();
        }
        chunks.push((start, idx, end));
        start = end;
    }

    if chunks.is_empty() {
        return AncestorPaths {
            paths: vec![path.to_string()],
            segments: vec![path.to_string()],
        };
    }

    let mut paths = vec![path.to_string()];
    let mut segments = vec![path[start..].to_string()];
    for &(chunk_start, name_end, _) in chunks.iter().skip(1).rev() {
        paths.push(path[..name_end].to_string());
        segments.push(path[chunk_start..name_end].to_string());
    }
    let (_, _, root_end) = chunks[0];
    let root = &path[..root_end];
    paths.push(root.to_string());
    segments.push(root.to_string());

    AncestorPaths { paths, segments }
}

/// Whether a package-relative target path walks above the package root.
///
/// Segments are split on both separators and counted the way [`join`]
/// collapses them, so `.` and empty segments stay at the current level.
/// The last segment is checked too.
#[must_use]
pub fn escapes_package_root(relative_path: &str) -> bool {
    let mut depth = 0usize;
    for segment in relative_path.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            _ => depth += 1,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_type_table() {
        let cases = [
            ("", PathType::Empty),
            (".", PathType::Relative),
            ("..", PathType::Relative),
            ("./x", PathType::Relative),
            ("../x", PathType::Relative),
            ("..x", PathType::Normal),
            (".x", PathType::Normal),
            ("/", PathType::AbsolutePosix),
            ("/x", PathType::AbsolutePosix),
            ("#", PathType::Internal),
            ("#x", PathType::Internal),
            ("C:", PathType::AbsoluteWin),
            ("C:\\x", PathType::AbsoluteWin),
            ("c:/x", PathType::AbsoluteWin),
            ("C:x", PathType::Normal),
            ("lodash", PathType::Normal),
            ("@scope/pkg", PathType::Normal),
            ("x", PathType::Normal),
        ];
        for (input, expected) in cases {
            assert_eq!(get_type(input), expected, "get_type({input:?})");
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("./foo/../bar"), "./bar");
        assert_eq!(normalize("./foo"), "./foo");
        assert_eq!(normalize("./a/.."), ".");
        assert_eq!(normalize("../a/../../b"), "../../b");
        assert_eq!(normalize("/a/./b//c/"), "/a/b/c/");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("C:\\a\\..\\b"), "C:\\b");
        assert_eq!(normalize("C:/a/b/"), "C:\\a\\b\\");
        assert_eq!(normalize("C:\\"), "C:\\");
    }

    #[test]
    fn test_join_posix() {
        assert_eq!(join("/a/b", "../c"), "/a/c");
        assert_eq!(join("/a/b", "./c/d"), "/a/b/c/d");
        assert_eq!(join("/a/b", "c"), "/a/b/c");
        assert_eq!(join("/a/b", "/x/y"), "/x/y");
        assert_eq!(join("/a/b", ""), "/a/b");
        assert_eq!(join("/", "x"), "/x");
        assert_eq!(join("/a", "../../.."), "/");
    }

    #[test]
    fn test_join_windows() {
        assert_eq!(join("C:\\a", "b"), "C:\\a\\b");
        assert_eq!(join("C:\\a\\b", "../c"), "C:\\a\\c");
        assert_eq!(join("/a", "D:\\x"), "D:\\x");
    }

    #[test]
    fn test_join_cache_matches_join() {
        let cache = JoinCache::new();
        assert!(cache.is_empty());
        let first = cache.join("/a/b", "../c");
        let second = cache.join("/a/b", "../c");
        assert_eq!(first, "/a/c");
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        cache.join("/a/b", "d");
        cache.join("/x", "d");
        assert_eq!(cache.len(), 3);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dirname_and_cd_up() {
        assert_eq!(dirname("/a/b/c"), "/a/b");
        assert_eq!(dirname("/a"), "");
        assert_eq!(dirname("file"), "");
        assert_eq!(dirname("C:\\a\\b"), "C:\\a");

        assert_eq!(cd_up("/a/b"), Some("/a"));
        assert_eq!(cd_up("/a"), Some("/"));
        assert_eq!(cd_up("/"), None);
        assert_eq!(cd_up("C:\\a\\b"), Some("C:\\a"));
        assert_eq!(cd_up("name"), None);
    }

    #[test]
    fn test_get_paths_posix() {
        let result = get_paths("/a/b/c");
        assert_eq!(result.paths, vec!["/a/b/c", "/a/b", "/a", "/"]);
        assert_eq!(result.segments, vec!["c", "b", "a", "/"]);
    }

    #[test]
    fn test_get_paths_windows_and_root() {
        let result = get_paths("C:\\a\\b");
        assert_eq!(result.paths, vec!["C:\\a\\b", "C:\\a", "C:\\"]);
        assert_eq!(result.segments, vec!["b", "a", "C:\\"]);

        let root = get_paths("/");
        assert_eq!(root.paths, vec!["/"]);
    }

    #[test]
    fn test_escapes_package_root() {
        assert!(!escapes_package_root("./dist/index.js"));
        assert!(!escapes_package_root("./a/../b.js"));
        assert!(!escapes_package_root("./a/.."));
        assert!(escapes_package_root("./../x.js"));
        assert!(escapes_package_root("../x.js"));
        assert!(escapes_package_root("./a/../../x"));
        // the final segment is checked as well
        assert!(escapes_package_root("./a/../.."));

        // empty segments do not descend, since join drops them
        assert!(escapes_package_root("./a//../../outside.js"));
        assert!(escapes_package_root(".//../x.js"));
        assert!(!escapes_package_root("./a//b/../c.js"));

        // backslashes separate segments for drive-letter roots
        assert!(escapes_package_root("./..\\..\\x.js"));
        assert!(escapes_package_root("./a\\..\\..\\x.js"));
        assert!(!escapes_package_root("./a\\b.js"));
    }

    #[test]
    fn test_checked_targets_stay_under_root() {
        for target in ["./a//../../outside.js", "./..\\..\\x.js", "./a/./../../x"] {
            assert!(escapes_package_root(target), "{target}");
        }
        for target in ["./a//b/../c.js", "./x/y\\z.js"] {
            assert!(!escapes_package_root(target), "{target}");
            assert!(join("/pkgs/pkg", target).starts_with("/pkgs/pkg/"), "{target}");
            assert!(join("C:\\pkgs\\pkg", target).starts_with("C:\\pkgs\\pkg\\"), "{target}");
        }
    }
}
