use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{self, BoxFuture, LocalBoxFuture};
use futures::FutureExt;
use serde_json::Value;

use super::backend::{Backend, StorageMode};
use super::{FileSystem, FsError, FsResult, Stats, SyncFileSystem};

fn wrap<T>(
    syscall: &'static str,
    path: &str,
    pending: BoxFuture<'static, io::Result<T>>,
) -> BoxFuture<'static, FsResult<T>>
where
    T: Send + 'static,
{
    let path = path.to_string();
    async move { pending.await.map_err(|e| FsError::new(syscall, path, e)) }.boxed()
}

/// A [`FileSystem`] wrapper that coalesces identical in-flight requests
/// and, with a non-zero duration, caches results (failures included).
///
/// Each primitive has its own storage. Parsed JSON is kept as an `Arc` so
/// repeated reads of the same manifest hand out the same allocation until
/// the entry expires.
pub struct CachedFileSystem<F> {
    fs: F,
    lstat: Backend<Stats>,
    stat: Backend<Stats>,
    read_dir: Backend<Arc<Vec<String>>>,
    read_file: Backend<Bytes>,
    read_json: Backend<Arc<Value>>,
    read_link: Backend<String>,
}

impl<F: FileSystem> CachedFileSystem<F> {
    pub fn new(fs: F, duration: Duration) -> Self {
        Self {
            fs,
            lstat: Backend::new("lstat", duration),
            stat: Backend::new("stat", duration),
            read_dir: Backend::new("readdir", duration),
            read_file: Backend::new("readFile", duration),
            read_json: Backend::new("readJson", duration),
            read_link: Backend::new("readlink", duration),
        }
    }

    /// The wrapped filesystem.
    pub fn inner(&self) -> &F {
        &self.fs
    }

    pub fn lstat(&self, path: &str) -> BoxFuture<'static, FsResult<Stats>> {
        self.lstat
            .provide(path, || wrap("lstat", path, self.fs.lstat(path)))
    }

    pub fn stat(&self, path: &str) -> BoxFuture<'static, FsResult<Stats>> {
        self.stat
            .provide(path, || wrap("stat", path, self.fs.stat(path)))
    }

    pub fn read_dir(&self, path: &str) -> BoxFuture<'static, FsResult<Arc<Vec<String>>>> {
        self.read_dir.provide(path, || {
            let pending = self.fs.read_dir(path);
            wrap("readdir", path, async move { pending.await.map(Arc::new) }.boxed())
        })
    }

    pub fn read_file(&self, path: &str) -> BoxFuture<'static, FsResult<Bytes>> {
        self.read_file
            .provide(path, || wrap("readFile", path, self.fs.read_file(path)))
    }

    pub fn read_json(&self, path: &str) -> BoxFuture<'static, FsResult<Arc<Value>>> {
        self.read_json.provide(path, || {
            let pending = self.fs.read_json(path);
            wrap("readJson", path, async move { pending.await.map(Arc::new) }.boxed())
        })
    }

    pub fn read_link(&self, path: &str) -> BoxFuture<'static, FsResult<String>> {
        self.read_link
            .provide(path, || wrap("readlink", path, self.fs.read_link(path)))
    }

    /// Drop everything cached by every primitive.
    pub fn purge_all(&self) {
        self.lstat.purge_all();
        self.stat.purge_all();
        self.read_dir.purge_all();
        self.read_file.purge_all();
        self.read_json.purge_all();
        self.read_link.purge_all();
    }

    /// Drop cached entries under each of `paths`. Directory listings are
    /// dropped for the parent of each path.
    pub fn purge<S: AsRef<str>>(&self, paths: &[S]) {
        let paths: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();
        self.lstat.purge(&paths);
        self.stat.purge(&paths);
        self.read_dir.purge_parents(&paths);
        self.read_file.purge(&paths);
        self.read_json.purge(&paths);
        self.read_link.purge(&paths);
    }

    /// Decay mode of the stat cache, or `None` when caching is disabled.
    pub fn storage_mode(&self) -> Option<StorageMode> {
        self.stat.mode()
    }

    /// Number of results currently held across all primitives.
    pub fn cached_entries(&self) -> usize {
        self.lstat.cached_len()
            + self.stat.cached_len()
            + self.read_dir.cached_len()
            + self.read_file.cached_len()
            + self.read_json.cached_len()
            + self.read_link.cached_len()
    }
}

impl<F: SyncFileSystem> CachedFileSystem<F> {
    pub fn lstat_sync(&self, path: &str) -> FsResult<Stats> {
        self.lstat.provide_sync(path, || {
            self.fs
                .lstat_sync(path)
                .map_err(|e| FsError::new("lstat", path, e))
        })
    }

    pub fn stat_sync(&self, path: &str) -> FsResult<Stats> {
        self.stat.provide_sync(path, || {
            self.fs
                .stat_sync(path)
                .map_err(|e| FsError::new("stat", path, e))
        })
    }

    pub fn read_dir_sync(&self, path: &str) -> FsResult<Arc<Vec<String>>> {
        self.read_dir.provide_sync(path, || {
            self.fs
                .read_dir_sync(path)
                .map(Arc::new)
                .map_err(|e| FsError::new("readdir", path, e))
        })
    }

    pub fn read_file_sync(&self, path: &str) -> FsResult<Bytes> {
        self.read_file.provide_sync(path, || {
            self.fs
                .read_file_sync(path)
                .map_err(|e| FsError::new("readFile", path, e))
        })
    }

    pub fn read_json_sync(&self, path: &str) -> FsResult<Arc<Value>> {
        self.read_json.provide_sync(path, || {
            self.fs
                .read_json_sync(path)
                .map(Arc::new)
                .map_err(|e| FsError::new("readJson", path, e))
        })
    }

    pub fn read_link_sync(&self, path: &str) -> FsResult<String> {
        self.read_link.provide_sync(path, || {
            self.fs
                .read_link_sync(path)
                .map_err(|e| FsError::new("readlink", path, e))
        })
    }
}

/// The filesystem as seen by plugins during one resolution.
///
/// The sync view answers every call with an already-completed future, so a
/// pipeline run over it finishes on its first poll.
pub trait FsAccess {
    fn stat(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Stats>>;
    fn lstat(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Stats>>;
    fn read_dir(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Arc<Vec<String>>>>;
    fn read_json(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Arc<Value>>>;
    fn read_link(&self, path: &str) -> LocalBoxFuture<'_, FsResult<String>>;
}

pub(crate) struct AsyncAccess<'a, F>(pub(crate) &'a CachedFileSystem<F>);

impl<F: FileSystem> FsAccess for AsyncAccess<'_, F> {
    fn stat(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Stats>> {
        self.0.stat(path).boxed_local()
    }

    fn lstat(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Stats>> {
        self.0.lstat(path).boxed_local()
    }

    fn read_dir(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Arc<Vec<String>>>> {
        self.0.read_dir(path).boxed_local()
    }

    fn read_json(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Arc<Value>>> {
        self.0.read_json(path).boxed_local()
    }

    fn read_link(&self, path: &str) -> LocalBoxFuture<'_, FsResult<String>> {
        self.0.read_link(path).boxed_local()
    }
}

pub(crate) struct SyncAccess<'a, F>(pub(crate) &'a CachedFileSystem<F>);

impl<F: SyncFileSystem> FsAccess for SyncAccess<'_, F> {
    fn stat(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Stats>> {
        future::ready(self.0.stat_sync(path)).boxed_local()
    }

    fn lstat(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Stats>> {
        future::ready(self.0.lstat_sync(path)).boxed_local()
    }

    fn read_dir(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Arc<Vec<String>>>> {
        future::ready(self.0.read_dir_sync(path)).boxed_local()
    }

    fn read_json(&self, path: &str) -> LocalBoxFuture<'_, FsResult<Arc<Value>>> {
        future::ready(self.0.read_json_sync(path)).boxed_local()
    }

    fn read_link(&self, path: &str) -> LocalBoxFuture<'_, FsResult<String>> {
        future::ready(self.0.read_link_sync(path)).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use tempfile::tempdir;

    #[test]
    fn test_sync_json_is_shared_until_purged() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("package.json");
        std::fs::write(&file, r#"{"name":"a"}"#).unwrap();
        let file = file.to_str().unwrap();

        let fs = CachedFileSystem::new(OsFileSystem, Duration::from_secs(60));
        let first = fs.read_json_sync(file).unwrap();
        let second = fs.read_json_sync(file).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::write(file, r#"{"name":"b"}"#).unwrap();
        assert_eq!(fs.read_json_sync(file).unwrap()["name"], "a");

        fs.purge(&[file]);
        assert_eq!(fs.read_json_sync(file).unwrap()["name"], "b");
    }

    #[test]
    fn test_missing_file_error_is_cached() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.js");
        let missing = missing.to_str().unwrap();

        let fs = CachedFileSystem::new(OsFileSystem, Duration::from_secs(60));
        let err = fs.stat_sync(missing).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.syscall(), "stat");

        std::fs::write(missing, "").unwrap();
        assert!(fs.stat_sync(missing).is_err());
        fs.purge_all();
        assert!(fs.stat_sync(missing).unwrap().is_file());
    }

    #[test]
    fn test_zero_duration_does_not_cache() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let fs = CachedFileSystem::new(OsFileSystem, Duration::ZERO);
        assert_eq!(fs.read_dir_sync(root).unwrap().len(), 0);
        std::fs::write(dir.path().join("x"), "").unwrap();
        assert_eq!(fs.read_dir_sync(root).unwrap().len(), 1);
        assert_eq!(fs.storage_mode(), None);
        assert_eq!(fs.cached_entries(), 0);
    }
}
