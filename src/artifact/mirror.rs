use crate::artifact::BucketSource;
use crate::error::ArtifactError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Bucket source backed by a local directory tree: `<root>/<bucket>/<key>`.
///
/// Useful for builds synced from object storage ahead of time.
#[derive(Debug, Clone)]
pub struct DirectoryBuckets {
    root: PathBuf,
}

impl DirectoryBuckets {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl BucketSource for DirectoryBuckets {
    fn object_length(&self, bucket: &str, key: &str) -> Result<u64, ArtifactError> {
        match fs::metadata(self.object_path(bucket, key)) {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            _ => Err(ArtifactError::NotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            }),
        }
    }

    fn latest_matching(&self, bucket: &str, prefix: &str, pattern: &Regex) -> Result<String, ArtifactError> {
        let bucket_root = self.root.join(bucket);
        let mut latest: Option<(SystemTime, String)> = None;

        for entry in WalkDir::new(bucket_root.join(prefix)).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let key = match entry.path().strip_prefix(&bucket_root) {
                Ok(relative) => relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                Err(_) => continue,
            };
            if !pattern.is_match(&key) {
                continue;
            }
            let modified = entry
                .metadata()
                .ok()
                .and_then(|metadata| metadata.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            trace!("Candidate build '{}' modified at {:?}", key, modified);
            match &latest {
                Some((newest, _)) if *newest >= modified => {}
                _ => latest = Some((modified, key)),
            }
        }

        latest.map(|(_, key)| key).ok_or_else(|| ArtifactError::NoMatch {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
            pattern: pattern.as_str().to_owned(),
        })
    }

    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), ArtifactError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let source_path = self.object_path(bucket, key);
        fs::copy(&source_path, destination).map_err(|source| ArtifactError::Io {
            path: source_path,
            source,
        })?;
        Ok(())
    }
}
