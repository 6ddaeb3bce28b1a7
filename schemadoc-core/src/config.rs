//! Export configuration.
//!
//! Settings arrive in layers: command-line flags, environment variables, and
//! an optional JSON config file. Each layer is a [`PartialConfig`]; layers
//! are stacked with [`PartialConfig::layered_over`] and resolved into a
//! validated [`ExportConfig`].

use crate::{
    Result,
    error::{SchemaDocError, redact_database_url},
    models::Dialect,
    security::Credentials,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output path used when none is configured.
pub const DEFAULT_OUTPUT: &str = "output.docx";

/// Delimiter separating display name and purpose in table comments.
pub const DEFAULT_COMMENT_DELIMITER: &str = "|";

/// Connect timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One layer of configuration, every field optional.
///
/// This is also the schema of the JSON config file:
///
/// ```json
/// {
///   "url": "mysql://doris-fe:9030/information_schema",
///   "user": "reader",
///   "password": "secret",
///   "schema": "warehouse",
///   "output": "warehouse.docx"
/// }
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    /// Connection URL; the scheme selects the dialect unless `dialect` is set
    pub url: Option<String>,
    /// Login user, overriding any user in the URL
    pub user: Option<String>,
    /// Login password, overriding any password in the URL
    pub password: Option<String>,
    /// Schema (MySQL-family database) to document
    pub schema: Option<String>,
    /// Destination `.docx` path
    pub output: Option<PathBuf>,
    /// Explicit catalog dialect
    pub dialect: Option<Dialect>,
    /// Include views alongside base tables
    pub include_views: Option<bool>,
    /// Table comment delimiter; empty disables splitting
    pub comment_delimiter: Option<String>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for PartialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialConfig")
            .field("url", &self.url.as_deref().map(redact_database_url))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("schema", &self.schema)
            .field("output", &self.output)
            .field("dialect", &self.dialect)
            .field("include_views", &self.include_views)
            .field("comment_delimiter", &self.comment_delimiter)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl PartialConfig {
    /// Loads a layer from a JSON config file.
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read, is not
    /// valid JSON, or contains unknown keys.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SchemaDocError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            SchemaDocError::configuration(format!(
                "Invalid config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Returns `self` with every unset field filled from `lower`.
    pub fn layered_over(self, lower: Self) -> Self {
        Self {
            url: self.url.or(lower.url),
            user: self.user.or(lower.user),
            password: self.password.or(lower.password),
            schema: self.schema.or(lower.schema),
            output: self.output.or(lower.output),
            dialect: self.dialect.or(lower.dialect),
            include_views: self.include_views.or(lower.include_views),
            comment_delimiter: self.comment_delimiter.or(lower.comment_delimiter),
            connect_timeout_secs: self.connect_timeout_secs.or(lower.connect_timeout_secs),
        }
    }

    /// Applies defaults and validates the result.
    ///
    /// # Errors
    /// Returns a configuration error if `url` or `schema` is missing, or if
    /// any value is invalid (see [`ExportConfig::validate`]).
    pub fn resolve(self) -> Result<ExportConfig> {
        let url = self
            .url
            .ok_or_else(|| SchemaDocError::configuration("database URL is required (--url)"))?;
        let schema = self
            .schema
            .ok_or_else(|| SchemaDocError::configuration("schema is required (--schema)"))?;

        let config = ExportConfig {
            url,
            credentials: Credentials::new(self.user, self.password),
            schema,
            output: self
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            dialect: self.dialect,
            include_views: self.include_views.unwrap_or(false),
            comment_delimiter: self
                .comment_delimiter
                .unwrap_or_else(|| DEFAULT_COMMENT_DELIMITER.to_string()),
            connect_timeout: self
                .connect_timeout_secs
                .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Fully resolved settings for one export run.
///
/// # Security
/// `Debug` output masks the password and redacts the URL; use
/// [`ExportConfig::redacted_url`] when logging the target.
#[derive(Clone)]
pub struct ExportConfig {
    /// Connection URL (may contain credentials; never log directly)
    pub url: String,
    /// Login supplied outside the URL
    pub credentials: Credentials,
    /// Schema to document
    pub schema: String,
    /// Destination `.docx` path
    pub output: PathBuf,
    /// Explicit dialect; detected from the URL when `None`
    pub dialect: Option<Dialect>,
    /// Include views alongside base tables
    pub include_views: bool,
    /// Table comment delimiter; empty disables splitting
    pub comment_delimiter: String,
    /// Upper bound on establishing the connection
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportConfig")
            .field("url", &self.redacted_url())
            .field("credentials", &self.credentials)
            .field("schema", &self.schema)
            .field("output", &self.output)
            .field("dialect", &self.dialect)
            .field("include_views", &self.include_views)
            .field("comment_delimiter", &self.comment_delimiter)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ExportConfig {
    /// Validates configuration values.
    ///
    /// # Errors
    /// Returns error if a required value is empty, the dialect cannot be
    /// determined, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SchemaDocError::configuration("database URL cannot be empty"));
        }

        if self.schema.trim().is_empty() {
            return Err(SchemaDocError::configuration("schema cannot be empty"));
        }

        if self.output.as_os_str().is_empty() {
            return Err(SchemaDocError::configuration("output path cannot be empty"));
        }

        if self.connect_timeout.is_zero() {
            return Err(SchemaDocError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        self.resolved_dialect()?;
        Ok(())
    }

    /// The configured dialect, or the one implied by the URL scheme.
    ///
    /// # Errors
    /// Returns a configuration error when neither is available.
    pub fn resolved_dialect(&self) -> Result<Dialect> {
        if let Some(dialect) = self.dialect {
            return Ok(dialect);
        }
        Dialect::from_url(&self.url).ok_or_else(|| {
            SchemaDocError::configuration(format!(
                "Cannot determine dialect from URL '{}'; pass --dialect",
                self.redacted_url()
            ))
        })
    }

    /// Comment delimiter, `None` when splitting is disabled.
    pub fn comment_delimiter(&self) -> Option<&str> {
        Some(self.comment_delimiter.as_str()).filter(|d| !d.is_empty())
    }

    /// Connection URL safe for logs.
    pub fn redacted_url(&self) -> String {
        redact_database_url(self.url.strip_prefix("jdbc:").unwrap_or(&self.url))
    }
}
