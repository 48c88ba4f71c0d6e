use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::graph::forest::ForestError;

/// Machine-readable error codes for operator-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigLoad,
    TemplateLoad,
    SourceUnavailable,
    ProfileParse,
    DuplicateId,
    CycleDetected,
    InvalidDocument,
    WriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigLoad => "E1001",
            Self::TemplateLoad => "E1002",
            Self::SourceUnavailable => "E1003",
            Self::ProfileParse => "E2001",
            Self::DuplicateId => "E2002",
            Self::CycleDetected => "E2003",
            Self::InvalidDocument => "E2004",
            Self::WriteFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigLoad => "Run configuration could not be loaded",
            Self::TemplateLoad => "Item template table could not be loaded",
            Self::SourceUnavailable => "Profile directory could not be listed",
            Self::ProfileParse => "Profile snapshot parse error",
            Self::DuplicateId => "Duplicate item id in inventory",
            Self::CycleDetected => "Inventory parent links form a cycle",
            Self::InvalidDocument => "JSON document is malformed",
            Self::WriteFailed => "Output write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigLoad => Some("Fix syntax in salvage.toml and retry."),
            Self::TemplateLoad => Some("Point [paths].templates at the game's items.json table."),
            Self::SourceUnavailable => Some("Create the directory or point [paths].profiles at it."),
            Self::ProfileParse => Some("Check that the file is an exported profile JSON document."),
            Self::DuplicateId => {
                Some("The snapshot is corrupt; repair or drop the offending items by hand.")
            }
            Self::CycleDetected => {
                Some("Fix the parentId links named in the message so every item reaches a root.")
            }
            Self::InvalidDocument => {
                Some("Fix or move aside the file named in the message, then re-run.")
            }
            Self::WriteFailed => Some("Check disk space and write permissions, then re-run."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while loading inputs or recording outputs of a run.
#[derive(Debug, thiserror::Error)]
pub enum SalvageError {
    /// The run configuration exists but cannot be read or parsed.
    #[error("failed to load config {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    /// The item template table cannot be read or parsed.
    #[error("failed to load item templates {}: {reason}", path.display())]
    TemplateLoad { path: PathBuf, reason: String },

    /// The profile directory cannot be listed.
    #[error("failed to list profiles in {}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One profile snapshot failed to read or deserialize.
    #[error("failed to parse profile {}: {reason}", path.display())]
    ProfileParse { path: PathBuf, reason: String },

    /// The forest index rejected the inventory.
    #[error(transparent)]
    Forest(#[from] ForestError),

    /// A residual snapshot or gift could not be recorded.
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A JSON document could not be encoded or decoded.
    #[error("invalid JSON for {what}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SalvageError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ConfigLoad { .. } => ErrorCode::ConfigLoad,
            Self::TemplateLoad { .. } => ErrorCode::TemplateLoad,
            Self::SourceUnavailable { .. } => ErrorCode::SourceUnavailable,
            Self::ProfileParse { .. } => ErrorCode::ProfileParse,
            Self::Forest(ForestError::DuplicateId(_)) => ErrorCode::DuplicateId,
            Self::Forest(ForestError::Cycle(_)) => ErrorCode::CycleDetected,
            Self::Write { .. } => ErrorCode::WriteFailed,
            Self::Json { .. } => ErrorCode::InvalidDocument,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
