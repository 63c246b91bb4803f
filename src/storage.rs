//! Artifact upload.
//!
//! [`ObjectStore`] is the seam between the orchestration and S3. The AWS
//! implementation, [`S3Store`], is available with the `aws` feature.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;

/// Destination for package artifacts
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` to `bucket/key`
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Content type for an artifact, by extension
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Join a key prefix and a relative path with `/`
pub fn object_key(prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        relative
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// `s3://bucket/prefix` URL used as the document's `SourceUrl`
pub fn source_url(bucket: &str, prefix: &str) -> String {
    format!("s3://{}/{}", bucket, prefix.trim_matches('/'))
}

/// Upload every file under `dir` to `bucket` below `prefix`, keyed by the
/// path relative to `dir`. Returns the uploaded keys in walk order.
pub async fn sync_dir(
    store: &dyn ObjectStore,
    dir: &Path,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Other {
            message: format!("Failed to walk {}", dir.display()),
            source: Some(Box::new(e)),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let key = object_key(prefix, relative);
        tracing::info!("Uploading {} to {}.", entry.path().display(), bucket);
        store.put_file(bucket, &key, entry.path()).await?;
        keys.push(key);
    }

    Ok(keys)
}

#[cfg(feature = "aws")]
pub use self::s3::S3Store;

#[cfg(feature = "aws")]
mod s3 {
    use super::{content_type, ObjectStore};
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::Client;
    use std::path::Path;

    /// S3-backed artifact store
    #[derive(Clone, Debug)]
    pub struct S3Store {
        client: Client,
    }

    impl S3Store {
        /// Wrap an existing client
        pub fn new(client: Client) -> Self {
            Self { client }
        }

        /// Create a client from the default credential chain
        pub async fn from_env(region: Option<&str>) -> Self {
            let config = if let Some(region_str) = region {
                aws_config::defaults(BehaviorVersion::latest())
                    .region(aws_sdk_s3::config::Region::new(region_str.to_string()))
                    .load()
                    .await
            } else {
                aws_config::defaults(BehaviorVersion::latest()).load().await
            };

            Self::new(Client::new(&config))
        }
    }

    #[async_trait]
    impl ObjectStore for S3Store {
        async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| Error::aws("s3", "PutObject", e))?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type(path))
                .body(body)
                .send()
                .await
                .map_err(|e| Error::aws("s3", "PutObject", aws_sdk_s3::error::DisplayErrorContext(e)))?;

            tracing::debug!("Uploaded s3://{}/{}", bucket, key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put_file(&self, bucket: &str, key: &str, _path: &Path) -> Result<()> {
            self.puts
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_object_key() {
        assert_eq!(
            object_key("Pkg/v1.0.0", Path::new("manifest.json")),
            "Pkg/v1.0.0/manifest.json"
        );
        assert_eq!(object_key("/Pkg/", Path::new("a/b.zip")), "Pkg/a/b.zip");
        assert_eq!(object_key("", Path::new("b.zip")), "b.zip");
    }

    #[test]
    fn test_source_url_and_content_type() {
        assert_eq!(source_url("bucket", "Pkg/v1/"), "s3://bucket/Pkg/v1");
        assert_eq!(content_type(Path::new("x.zip")), "application/zip");
        assert_eq!(content_type(Path::new("manifest.json")), "application/json");
        assert_eq!(content_type(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_sync_dir_uses_relative_keys() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("manifest.json"), "{}").unwrap();
        std::fs::write(temp.path().join("amazon2-x86_64.zip"), "zip").unwrap();

        let store = RecordingStore::default();
        let keys = sync_dir(&store, temp.path(), "bucket", "Pkg/v1.0.0")
            .await
            .unwrap();

        assert_eq!(
            keys,
            vec!["Pkg/v1.0.0/amazon2-x86_64.zip", "Pkg/v1.0.0/manifest.json"]
        );
        assert!(store
            .puts
            .lock()
            .unwrap()
            .iter()
            .all(|(bucket, _)| bucket == "bucket"));
    }
}
