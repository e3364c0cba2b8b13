//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ParseError: PKGBUILD/.SRCINFO parsing failures
//! - RegistryError: AUR RPC communication failures
//! - BuildToolError: external command (git/makepkg/nvchecker/gh) failures
//! - ConfigError: missing or invalid startup configuration
//! - IoError: file system operation failures

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// PKGBUILD/.SRCINFO parsing errors
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// AUR registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// External build/publish tool errors
    #[error(transparent)]
    BuildTool(#[from] BuildToolError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO related errors
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors raised while turning a PKGBUILD into a structured descriptor
#[derive(Error, Debug)]
pub enum ParseError {
    /// PKGBUILD file not found
    #[error("PKGBUILD not found: {path}")]
    NotFound { path: PathBuf },

    /// makepkg --printsrcinfo failed or produced nothing
    #[error("failed to generate .SRCINFO for {path}: {message}")]
    SrcinfoFailed { path: PathBuf, message: String },

    /// A mandatory field was absent from the generated .SRCINFO
    #[error("missing mandatory field '{field}' in .SRCINFO for {path}")]
    MissingField { path: PathBuf, field: String },
}

/// Errors related to AUR RPC communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Maintainer or package not known to the AUR
    #[error("'{subject}' not found on the AUR")]
    NotFound { subject: String },

    /// Network request failed
    #[error("failed to query AUR RPC for '{subject}': {message}")]
    NetworkError { subject: String, message: String },

    /// Rate limit exceeded
    #[error("rate limit exceeded on AUR RPC")]
    RateLimitExceeded,

    /// AUR RPC returned an error payload or undecodable body
    #[error("invalid AUR RPC response for '{subject}': {message}")]
    InvalidResponse { subject: String, message: String },

    /// Timeout
    #[error("timeout while querying AUR RPC for '{subject}'")]
    Timeout { subject: String },
}

/// Errors from external commands run during the package pipeline
#[derive(Error, Debug)]
pub enum BuildToolError {
    /// Command exited non-zero where success was required
    #[error("command '{command}' failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Command binary could not be spawned at all
    #[error("failed to spawn '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    /// makepkg succeeded but produced no package files
    #[error("no package files (*.pkg.tar.zst) found after makepkg for '{package}'")]
    NoArtifacts { package: String },

    /// Optimistic-concurrency write to the source repository was rejected
    #[error("conflicting update for '{path}': remote content changed")]
    Conflict { path: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required setting absent from both CLI and environment
    #[error("missing required configuration: {name}")]
    MissingRequired { name: String },

    /// A configured path does not exist or is not a directory
    #[error("invalid path for {name}: {path} ({message})")]
    InvalidPath {
        name: String,
        path: PathBuf,
        message: String,
    },
}

/// Errors related to IO operations
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to create a required directory
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy a file or tree
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error at {path}: {source}")]
    Generic {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ParseError::NotFound { path: path.into() }
    }

    /// Creates a new SrcinfoFailed error
    pub fn srcinfo_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ParseError::SrcinfoFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new MissingField error
    pub fn missing_field(path: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        ParseError::MissingField {
            path: path.into(),
            field: field.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new NotFound error
    pub fn not_found(subject: impl Into<String>) -> Self {
        RegistryError::NotFound {
            subject: subject.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(subject: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::NetworkError {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(subject: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::InvalidResponse {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(subject: impl Into<String>) -> Self {
        RegistryError::Timeout {
            subject: subject.into(),
        }
    }
}

impl BuildToolError {
    /// Creates a new CommandFailed error
    pub fn command_failed(
        command: impl Into<String>,
        code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        BuildToolError::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Creates a new SpawnFailed error
    pub fn spawn_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        BuildToolError::SpawnFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a new NoArtifacts error
    pub fn no_artifacts(package: impl Into<String>) -> Self {
        BuildToolError::NoArtifacts {
            package: package.into(),
        }
    }

    /// Creates a new Conflict error
    pub fn conflict(path: impl Into<String>) -> Self {
        BuildToolError::Conflict { path: path.into() }
    }
}

impl ConfigError {
    /// Creates a new MissingRequired error
    pub fn missing_required(name: impl Into<String>) -> Self {
        ConfigError::MissingRequired { name: name.into() }
    }

    /// Creates a new InvalidPath error
    pub fn invalid_path(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidPath {
            name: name.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl IoError {
    /// Creates a new CreateDir error
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a new Copy error
    pub fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Copy {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Creates a new Generic IO error
    pub fn generic(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Generic {
            path: path.into(),
            source,
        }
    }
}
