//! Resolution of the mobile application binary before the suite starts.
//!
//! `mobile_app` may point at an S3-like bucket (`s3://bucket/key`, where the
//! key may contain a `.*` segment resolved to the newest match) or at a
//! build-distribution service (`hockeyapp://app/platform/buildType/version`).
//! Either way it is replaced by a local path once the binary is available.

pub mod mirror;

use crate::configuration::constants::common::LATEST_VERSION;
use crate::configuration::settings::Configuration;
use crate::error::ArtifactError;
use lazy_static::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref S3_REGEX: Regex = Regex::new(r"^s3://([a-zA-Z-0-9][^/]*)/(.*)$")
        .expect("Regex compilation error");
    static ref HOCKEYAPP_REGEX: Regex = Regex::new(
        r"^hockeyapp://([a-zA-Z-0-9][^/]*)/([a-zA-Z-0-9][^/]*)/([a-zA-Z-0-9][^/]*)/([a-zA-Z-0-9][^/]*)"
    )
    .expect("Regex compilation error");
}

const WILDCARD: &'static str = ".*";

/// S3-like object storage.
pub trait BucketSource: Send + Sync {
    fn object_length(&self, bucket: &str, key: &str) -> Result<u64, ArtifactError>;

    /// Newest key under `prefix` whose full key matches `pattern`.
    fn latest_matching(&self, bucket: &str, prefix: &str, pattern: &Regex) -> Result<String, ArtifactError>;

    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), ArtifactError>;
}

/// Build-distribution service.
pub trait BuildSource: Send + Sync {
    fn fetch_build(
        &self,
        storage: &Path,
        app: &str,
        platform: &str,
        build_type: &str,
        version: &str,
    ) -> Result<PathBuf, ArtifactError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppLocation {
    S3 {
        bucket: String,
        key: String,
    },
    HockeyApp {
        app: String,
        platform: String,
        build_type: String,
        version: String,
    },
    Local(String),
}

impl AppLocation {
    pub fn parse(mobile_app: &str) -> Self {
        if let Some(caps) = S3_REGEX.captures(mobile_app) {
            return AppLocation::S3 {
                bucket: caps[1].to_owned(),
                key: caps[2].to_owned(),
            };
        }
        if let Some(caps) = HOCKEYAPP_REGEX.captures(mobile_app) {
            return AppLocation::HockeyApp {
                app: caps[1].to_owned(),
                platform: caps[2].to_owned(),
                build_type: caps[3].to_owned(),
                version: caps[4].to_owned(),
            };
        }
        AppLocation::Local(mobile_app.to_owned())
    }
}

/// Prefix to search and full-key pattern when `key` carries a wildcard segment.
pub fn wildcard_search(key: &str) -> Option<(String, String)> {
    let position = key.find(WILDCARD).filter(|&pos| pos > 0)?;
    let slash = key[..position].rfind('/').filter(|&pos| pos > 0)?;
    Some((key[..=slash].to_owned(), format!("^{}$", key)))
}

#[derive(Default)]
pub struct ArtifactResolver {
    buckets: Option<Box<dyn BucketSource>>,
    builds: Option<Box<dyn BuildSource>>,
}

impl ArtifactResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets(mut self, buckets: Box<dyn BucketSource>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub fn with_builds(mut self, builds: Box<dyn BuildSource>) -> Self {
        self.builds = Some(builds);
        self
    }

    /// Rewrites `mobile_app` (and a `latest`/empty `app_version`) to the
    /// downloaded binary. Failures are logged and leave the configuration as is.
    pub fn update_app_path(&self, configuration: &mut Configuration) {
        let resolved = match AppLocation::parse(&configuration.mobile_app) {
            AppLocation::S3 { bucket, key } if !configuration.access_key_id.is_empty() => {
                info!("App artifact is located on S3...");
                self.resolve_s3(&bucket, &key, &configuration.s3_local_storage)
            }
            AppLocation::HockeyApp {
                app,
                platform,
                build_type,
                version,
            } if !configuration.hockeyapp_token.is_empty() => {
                info!("App artifact is located on HockeyApp...");
                self.resolve_hockeyapp(
                    &configuration.hockeyapp_local_storage,
                    &app,
                    &platform,
                    &build_type,
                    &version,
                )
            }
            _ => return,
        };

        match resolved {
            Ok(path) => {
                configuration.mobile_app = path.display().to_string();
                info!("Updated mobile app: {}", configuration.mobile_app);
                if configuration.app_version.is_empty() || configuration.app_version == LATEST_VERSION {
                    if let Some(name) = path.file_name() {
                        configuration.app_version = name.to_string_lossy().into_owned();
                    }
                }
            }
            Err(e) => error!("App artifact resolution failed: {}", e),
        }
    }

    pub fn resolve_s3(&self, bucket: &str, key: &str, storage: &Path) -> Result<PathBuf, ArtifactError> {
        let source = self
            .buckets
            .as_ref()
            .ok_or_else(|| ArtifactError::Source("no bucket source configured".to_owned()))?;

        let key = match wildcard_search(key) {
            Some((prefix, pattern)) => {
                let pattern = Regex::new(&pattern)?;
                let latest = source.latest_matching(bucket, &prefix, &pattern)?;
                debug!("Resolved '{}' to latest build '{}'", key, latest);
                latest
            }
            None => key.to_owned(),
        };

        let file_name = key.rsplit('/').next().unwrap_or(key.as_str());
        let file = absolute(&storage.join(file_name))?;
        let length = source.object_length(bucket, &key)?;
        let already_downloaded = fs::metadata(&file)
            .map(|metadata| metadata.is_file() && metadata.len() == length)
            .unwrap_or(false);

        if already_downloaded {
            info!("Build artifact with the same size already downloaded: {}", file.display());
        } else {
            info!(
                "Following data was extracted: bucket: {}, key: {}, local file: {}",
                bucket,
                key,
                file.display()
            );
            source.download(bucket, &key, &file)?;
        }
        Ok(file)
    }

    pub fn resolve_hockeyapp(
        &self,
        storage: &Path,
        app: &str,
        platform: &str,
        build_type: &str,
        version: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let source = self
            .builds
            .as_ref()
            .ok_or_else(|| ArtifactError::Source("no build source configured".to_owned()))?;
        let file = source.fetch_build(storage, app, platform, build_type, version)?;
        absolute(&file)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ArtifactError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
}
