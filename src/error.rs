//! Error types shared across the listener layer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Driver '{name}' is already registered for the current thread")]
    Duplicate { name: String },

    #[error("Driver '{name}' is not registered for the current thread")]
    NotFound { name: String },

    #[error("Unsupported driver_type: {driver_type}")]
    UnsupportedType { driver_type: String },

    #[error("Unable to create driver '{name}': {message}")]
    Creation { name: String, message: String },
}

#[derive(Error, Debug)]
#[error("Session {session} teardown failed: {message}")]
pub struct SessionError {
    pub session: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("Nothing under '{prefix}' in bucket '{bucket}' matches '{pattern}'")]
    NoMatch {
        bucket: String,
        prefix: String,
        pattern: String,
    },

    #[error("Invalid artifact pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O failure for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Build source failure: {0}")]
    Source(String),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Unable to launch nested run '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Nested run '{program}' terminated abnormally: {status}")]
    Exit { program: String, status: String },

    #[error("Nested run is not configured: {0}")]
    NotConfigured(String),
}

/// Signals that the whole outer suite must not proceed.
#[derive(Error, Debug)]
pub enum SuiteAbort {
    #[error("{message}")]
    HealthCheck { message: String },

    #[error("Health check for '{class_name}' could not run: {source}")]
    Runner {
        class_name: String,
        #[source]
        source: RunnerError,
    },

    #[error("Suite bootstrap failed earlier: {message}")]
    Bootstrap { message: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {field} = '{value}'")]
    Invalid { field: String, value: String },
}

/// Aggregate failure of the suite finalizer; every step has been attempted.
#[derive(Error, Debug)]
#[error("Suite finalization failed: {}", describe_finalize(.skip_all, .failures))]
pub struct FinalizeError {
    /// Nothing ran at all, which points at a broken configuration.
    pub skip_all: bool,
    /// Steps that failed or panicked, as `"<step>: <reason>"`.
    pub failures: Vec<String>,
}

fn describe_finalize(skip_all: &bool, failures: &[String]) -> String {
    let mut parts = failures.to_vec();
    if *skip_all {
        parts.push("all tests were skipped".to_owned());
    }
    parts.join("; ")
}
