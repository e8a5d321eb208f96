use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TwitError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Not a twit repository: {}", path.display())]
    NotARepository { path: PathBuf },

    #[error("Repository directory is not empty: {}", path.display())]
    RepositoryNotEmpty { path: PathBuf },

    #[error("Configuration file missing: {}", path.display())]
    MissingConfig { path: PathBuf },

    #[error("Unsupported repositoryformatversion: {version}")]
    UnsupportedFormatVersion { version: String },

    #[error("Malformed object {sha}: {reason}")]
    MalformedObject { sha: String, reason: String },

    #[error("Unknown object type: {kind}")]
    UnknownObjectType { kind: String },

    #[error("Object {sha} is a {actual}, expected {expected}")]
    ObjectTypeMismatch {
        sha: String,
        expected: String,
        actual: String,
    },

    #[error("No such reference: {name}")]
    ObjectNotFound { name: String },

    #[error("Ambiguous reference {name}: candidates are:\n - {}", candidates.join("\n - "))]
    AmbiguousReference {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Invalid reference name: {name}")]
    InvalidRefName { name: String },

    #[error("Reference cycle while resolving {name}")]
    RefCycle { name: String },

    #[error("Invalid index file: {reason}")]
    InvalidIndex { reason: String },

    #[error("Not a file, or outside the worktree: {}", path.display())]
    PathOutsideWorktree { path: PathBuf },

    #[error("Cannot remove paths not in index: {}", paths.join(", "))]
    NotInIndex { paths: Vec<String> },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Not empty: {}", path.display())]
    DirectoryNotEmpty { path: PathBuf },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Repository,
    Object,
    Reference,
    Index,
    Worktree,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TwitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TwitError::IoError(_) => ErrorCategory::Io,
            TwitError::NotARepository { .. }
            | TwitError::RepositoryNotEmpty { .. }
            | TwitError::MissingConfig { .. }
            | TwitError::UnsupportedFormatVersion { .. } => ErrorCategory::Repository,
            TwitError::MalformedObject { .. }
            | TwitError::UnknownObjectType { .. }
            | TwitError::ObjectTypeMismatch { .. } => ErrorCategory::Object,
            TwitError::ObjectNotFound { .. }
            | TwitError::AmbiguousReference { .. }
            | TwitError::InvalidRefName { .. }
            | TwitError::RefCycle { .. } => ErrorCategory::Reference,
            TwitError::InvalidIndex { .. } => ErrorCategory::Index,
            TwitError::PathOutsideWorktree { .. }
            | TwitError::NotInIndex { .. }
            | TwitError::NotADirectory { .. }
            | TwitError::DirectoryNotEmpty { .. } => ErrorCategory::Worktree,
            TwitError::InvalidConfigValueError { .. }
            | TwitError::ConfigValidationError { .. }
            | TwitError::MissingConfigError { .. } => ErrorCategory::Config,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Io | ErrorCategory::Index => ErrorSeverity::Critical,
            ErrorCategory::Repository | ErrorCategory::Object | ErrorCategory::Config => {
                ErrorSeverity::High
            }
            ErrorCategory::Reference | ErrorCategory::Worktree => ErrorSeverity::Medium,
        }
    }

    /// Exit code the binary uses for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TwitError::IoError(_) => "Check file permissions and available disk space",
            TwitError::NotARepository { .. } => {
                "Run `twit init` first, or run the command inside an existing repository"
            }
            TwitError::RepositoryNotEmpty { .. } => {
                "Pick an empty directory or remove the existing .git directory"
            }
            TwitError::MissingConfig { .. } | TwitError::UnsupportedFormatVersion { .. } => {
                "Repair .git/config so that core.repositoryformatversion is 0"
            }
            TwitError::MalformedObject { .. } => "The object store may be corrupted",
            TwitError::UnknownObjectType { .. } => "Use one of: blob, commit, tree, tag",
            TwitError::ObjectTypeMismatch { .. } => "Check the object type you asked for",
            TwitError::ObjectNotFound { .. } => "Check the name with `twit show-ref`",
            TwitError::AmbiguousReference { .. } => "Use a longer hash prefix",
            TwitError::InvalidRefName { .. } => {
                "Reference names cannot contain spaces, '..', or control characters"
            }
            TwitError::RefCycle { .. } => "Fix the symbolic references under .git/",
            TwitError::InvalidIndex { .. } => {
                "Remove .git/index and stage the files again with `twit add`"
            }
            TwitError::PathOutsideWorktree { .. } => {
                "Only regular files inside the worktree can be staged"
            }
            TwitError::NotInIndex { .. } => "Check the staged paths with `twit ls-files`",
            TwitError::NotADirectory { .. } | TwitError::DirectoryNotEmpty { .. } => {
                "Check out into a new or empty directory"
            }
            TwitError::InvalidConfigValueError { .. }
            | TwitError::ConfigValidationError { .. }
            | TwitError::MissingConfigError { .. } => "Check the twit configuration file",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Filesystem operation failed: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TwitError>;
