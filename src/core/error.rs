//! Error handling for helmvals
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** for every ingestion stage, so the orchestrator and
//!    tests can branch on the failure class instead of parsing log text
//! 2. **User-friendly messages** with actionable suggestions at the CLI boundary
//!
//! # Architecture
//!
//! - [`IngestError`] - one variant per pipeline failure class (index, version,
//!   download, archive, publish). Cheap to clone so a cached index failure can be
//!   handed to every chart that shares the repository.
//! - [`ErrorKind`] - the fieldless classification of an [`IngestError`], used in
//!   run summaries and for retry decisions.
//! - [`HelmvalsError`] - top-level error for the binary (configuration problems,
//!   I/O, wrapped ingestion errors).
//! - [`ErrorContext`] - wraps a [`HelmvalsError`] with details and a suggestion for
//!   display on stderr.
//!
//! # Examples
//!
//! ```rust,no_run
//! use helmvals::core::{ErrorKind, IngestError, user_friendly_error};
//!
//! let error = IngestError::ChartNotFound {
//!     chart: "redis".to_string(),
//!     repository: "bitnami".to_string(),
//! };
//! assert_eq!(error.kind(), ErrorKind::ChartNotFound);
//! assert!(!error.is_transient());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure class of a single ingestion stage.
///
/// Every variant of [`IngestError`] maps to exactly one kind. Kinds are what the
/// run summary reports and what the retry policy inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The chart spec names a repository that is not in the registry
    RepositoryNotFound,
    /// The repository index could not be downloaded
    IndexUnavailable,
    /// The repository index was downloaded but could not be parsed
    IndexMalformed,
    /// The chart is absent from the index or has no versions
    ChartNotFound,
    /// The chart name or the selected version cannot be used as a file name
    UnsafeName,
    /// The selected version lists no download URL
    NoDownloadUrl,
    /// The artifact could not be downloaded
    DownloadFailed,
    /// The artifact is not a readable gzip tar archive
    ArchiveCorrupt,
    /// The archive has no `values.yaml` at the chart root
    ConfigurationFileMissing,
    /// Writing the dataset to a sink failed
    PublishFailed,
}

impl ErrorKind {
    /// Stable identifier used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RepositoryNotFound => "repository-not-found",
            Self::IndexUnavailable => "index-unavailable",
            Self::IndexMalformed => "index-malformed",
            Self::ChartNotFound => "chart-not-found",
            Self::UnsafeName => "unsafe-name",
            Self::NoDownloadUrl => "no-download-url",
            Self::DownloadFailed => "download-failed",
            Self::ArchiveCorrupt => "archive-corrupt",
            Self::ConfigurationFileMissing => "configuration-file-missing",
            Self::PublishFailed => "publish-failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the ingestion stages.
///
/// All fields are plain strings so the error can be cloned freely; the index
/// cache stores a failed fetch once and replays it for every chart of that
/// repository.
///
/// The `transient` flag on [`IndexUnavailable`](IngestError::IndexUnavailable) and
/// [`DownloadFailed`](IngestError::DownloadFailed) is set for transport errors,
/// HTTP 5xx and HTTP 429. Only transient errors are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Repository name not present in the registry
    #[error("Repository '{name}' is not configured")]
    RepositoryNotFound {
        /// The unknown repository name
        name: String,
    },

    /// Index download failed (transport error or non-success status)
    #[error("Index of repository '{repository}' is unavailable at {url}: {reason}")]
    IndexUnavailable {
        /// Repository whose index was requested
        repository: String,
        /// Index URL
        url: String,
        /// Transport error or HTTP status
        reason: String,
        /// Whether retrying may help
        transient: bool,
    },

    /// Index body is not a valid index document
    #[error("Index of repository '{repository}' is malformed: {reason}")]
    IndexMalformed {
        /// Repository whose index failed to parse
        repository: String,
        /// Parser message
        reason: String,
    },

    /// Chart missing from the index, or listed without versions
    #[error("Chart '{chart}' not found in repository '{repository}'")]
    ChartNotFound {
        /// Chart name
        chart: String,
        /// Repository name
        repository: String,
    },

    /// Chart name or index version that would escape or collide in a data directory
    #[error("Chart '{chart}' cannot be stored: {field} '{value}' is not a valid file name")]
    UnsafeName {
        /// Chart name as configured
        chart: String,
        /// `name` or `version`
        field: String,
        /// The offending value
        value: String,
    },

    /// Selected version has an empty `urls` list
    #[error("No download URL for chart '{chart}' version {version}")]
    NoDownloadUrl {
        /// Chart name
        chart: String,
        /// Selected version
        version: String,
    },

    /// Artifact download failed
    #[error("Download of {url} failed: {reason}")]
    DownloadFailed {
        /// Artifact URL
        url: String,
        /// Transport error or HTTP status
        reason: String,
        /// Whether retrying may help
        transient: bool,
    },

    /// Artifact could not be unpacked
    #[error("Archive {path} is corrupt: {reason}")]
    ArchiveCorrupt {
        /// Local artifact path
        path: String,
        /// Decoder or extraction message
        reason: String,
    },

    /// Extraction succeeded but there is no `values.yaml` at the chart root
    #[error("values.yaml not found in chart '{chart}' version {version}")]
    ConfigurationFileMissing {
        /// Chart name
        chart: String,
        /// Chart version
        version: String,
    },

    /// Writing the dataset failed
    #[error("Publishing dataset to {sink} failed: {reason}")]
    PublishFailed {
        /// Sink root (or several, comma separated)
        sink: String,
        /// Underlying failure
        reason: String,
    },
}

impl IngestError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            Self::IndexUnavailable { .. } => ErrorKind::IndexUnavailable,
            Self::IndexMalformed { .. } => ErrorKind::IndexMalformed,
            Self::ChartNotFound { .. } => ErrorKind::ChartNotFound,
            Self::UnsafeName { .. } => ErrorKind::UnsafeName,
            Self::NoDownloadUrl { .. } => ErrorKind::NoDownloadUrl,
            Self::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            Self::ArchiveCorrupt { .. } => ErrorKind::ArchiveCorrupt,
            Self::ConfigurationFileMissing { .. } => ErrorKind::ConfigurationFileMissing,
            Self::PublishFailed { .. } => ErrorKind::PublishFailed,
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Structural failures (missing chart, missing `values.yaml`, HTTP 404) are
    /// never transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::IndexUnavailable { transient, .. } | Self::DownloadFailed { transient, .. } => {
                *transient
            }
            _ => false,
        }
    }
}

/// Classifies an HTTP status as retryable.
#[must_use]
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

/// Top-level error type for the helmvals binary.
#[derive(Error, Debug)]
pub enum HelmvalsError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// An explicitly requested configuration file does not exist
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was requested
        path: String,
    },

    /// A pipeline stage failed
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for HelmvalsError {
    fn clone(&self) -> Self {
        match self {
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::ConfigNotFound {
                path,
            } => Self::ConfigNotFound {
                path: path.clone(),
            },
            Self::Ingest(e) => Self::Ingest(e.clone()),
            // io::Error is not Clone; keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// A [`HelmvalsError`] with optional details and a suggestion for the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: HelmvalsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: HelmvalsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Known error types ([`HelmvalsError`], [`IngestError`], [`std::io::Error`],
/// [`toml::de::Error`]) get tailored suggestions. Anything else is reported with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(helmvals_error) = error.downcast_ref::<HelmvalsError>() {
        return create_error_context(helmvals_error.clone());
    }

    if let Some(ingest_error) = error.downcast_ref::<IngestError>() {
        return create_error_context(HelmvalsError::Ingest(ingest_error.clone()));
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(HelmvalsError::Other {
                message: format!("Permission denied: {io_error}"),
            })
            .with_suggestion(
                "Check that the scratch, extraction and output directories are writable",
            );
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(HelmvalsError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your helmvals.toml");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(HelmvalsError::Other {
        message,
    })
}

fn create_error_context(error: HelmvalsError) -> ErrorContext {
    match &error {
        HelmvalsError::ConfigNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Pass an existing file to --config, or omit it to use the built-in defaults",
        ),
        HelmvalsError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Fix the reported field in helmvals.toml")
            .with_details("All fields are optional; remove a field to fall back to its default"),
        HelmvalsError::Ingest(ingest) => match ingest.kind() {
            ErrorKind::PublishFailed => ErrorContext::new(error)
                .with_suggestion("Check free disk space and permissions of the output directories")
                .with_details(
                    "Record files are written before the manifest, \
                     so readers never see a manifest entry without its record",
                ),
            ErrorKind::IndexUnavailable | ErrorKind::DownloadFailed => ErrorContext::new(error)
                .with_suggestion("Check your network connection and the repository URL"),
            ErrorKind::RepositoryNotFound => ErrorContext::new(error)
                .with_suggestion("Add the repository under [repositories] in helmvals.toml"),
            _ => ErrorContext::new(error),
        },
        _ => ErrorContext::new(error),
    }
}
