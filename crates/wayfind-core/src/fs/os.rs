use std::io;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::{FileSystem, Stats, SyncFileSystem};

/// The host filesystem, through `tokio::fs` and `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

fn link_to_string(target: std::path::PathBuf) -> String {
    target.to_string_lossy().into_owned()
}

impl FileSystem for OsFileSystem {
    fn lstat(&self, path: &str) -> BoxFuture<'static, io::Result<Stats>> {
        let path = path.to_string();
        async move { tokio::fs::symlink_metadata(path).await.map(|m| Stats::from(&m)) }.boxed()
    }

    fn stat(&self, path: &str) -> BoxFuture<'static, io::Result<Stats>> {
        let path = path.to_string();
        async move { tokio::fs::metadata(path).await.map(|m| Stats::from(&m)) }.boxed()
    }

    fn read_dir(&self, path: &str) -> BoxFuture<'static, io::Result<Vec<String>>> {
        let path = path.to_string();
        async move {
            let mut entries = tokio::fs::read_dir(path).await?;
            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            Ok(names)
        }
        .boxed()
    }

    fn read_file(&self, path: &str) -> BoxFuture<'static, io::Result<Bytes>> {
        let path = path.to_string();
        async move { tokio::fs::read(path).await.map(Bytes::from) }.boxed()
    }

    fn read_link(&self, path: &str) -> BoxFuture<'static, io::Result<String>> {
        let path = path.to_string();
        async move { tokio::fs::read_link(path).await.map(link_to_string) }.boxed()
    }
}

impl SyncFileSystem for OsFileSystem {
    fn lstat_sync(&self, path: &str) -> io::Result<Stats> {
        std::fs::symlink_metadata(path).map(|m| Stats::from(&m))
    }

    fn stat_sync(&self, path: &str) -> io::Result<Stats> {
        std::fs::metadata(path).map(|m| Stats::from(&m))
    }

    fn read_dir_sync(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn read_file_sync(&self, path: &str) -> io::Result<Bytes> {
        std::fs::read(path).map(Bytes::from)
    }

    fn read_link_sync(&self, path: &str) -> io::Result<String> {
        std::fs::read_link(path).map(link_to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sync_primitives() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        std::fs::write(dir.path().join("b.txt"), "hi").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();

        let fs = OsFileSystem;
        assert!(fs.stat_sync(root).unwrap().is_dir());
        let file = fs.stat_sync(&format!("{root}/b.txt")).unwrap();
        assert!(file.is_file());
        assert_eq!(file.len, 2);
        assert_eq!(fs.read_dir_sync(root).unwrap(), vec!["a", "b.txt"]);
        assert_eq!(&fs.read_file_sync(&format!("{root}/b.txt")).unwrap()[..], b"hi");
        assert!(fs.stat_sync(&format!("{root}/missing")).is_err());
    }

    #[tokio::test]
    async fn test_async_primitives() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_string();
        std::fs::write(dir.path().join("p.json"), r#"{"name":"x"}"#).unwrap();

        let fs = OsFileSystem;
        assert!(fs.stat(&root).await.unwrap().is_dir());
        let json = fs.read_json(&format!("{root}/p.json")).await.unwrap();
        assert_eq!(json["name"], "x");
        let err = fs.read_file(&format!("{root}/nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_lstat_sees_symlink() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("t.js");
        std::fs::write(&target, "").unwrap();
        let link = dir.path().join("l.js");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let fs = OsFileSystem;
        let link = link.to_str().unwrap();
        assert!(fs.lstat_sync(link).unwrap().is_symlink());
        assert!(fs.stat_sync(link).unwrap().is_file());
        assert_eq!(fs.read_link_sync(link).unwrap(), target.to_str().unwrap());
    }
}
