//! Error types for kbswitch operations.

use thiserror::Error;

/// A profile collection rejected before persistence.
///
/// Each variant names the first rule the candidate violated; validation
/// stops at the first failure and never partially applies.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Config must be a JSON array of keyboard profiles: {0}")]
    Shape(String),

    #[error("Config size {size} bytes exceeds maximum allowed size of {max} bytes")]
    Oversize { size: usize, max: usize },

    #[error("Number of keyboards ({count}) exceeds maximum allowed ({max})")]
    TooManyProfiles { count: usize, max: usize },

    #[error("Profile '{profile}': {field} must be at most {max} characters")]
    FieldTooLong {
        profile: String,
        field: &'static str,
        max: usize,
    },

    #[error("Profile '{profile}': vid_pid entry '{value}' must be in format VID_XXXX&PID_YYYY")]
    BadHwId { profile: String, value: String },

    #[error(
        "Profile '{profile}': number of vid_pid entries ({count}) exceeds maximum allowed ({max})"
    )]
    TooManyHwIds {
        profile: String,
        count: usize,
        max: usize,
    },

    #[error("Profile '{profile}': layout '{value}' must be an 8-hex-digit layout identifier")]
    BadLayout { profile: String, value: String },

    #[error("Duplicate profile name '{name}'")]
    DuplicateName { name: String },
}

/// A save that could not complete. The live profile file is guaranteed
/// untouched and the temporary file has been removed.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to serialize profile collection: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write temporary file {path}: {source}")]
    TempWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Temporary file failed round-trip verification: {0}")]
    Verify(String),

    #[error("Failed to replace profile file: {0}")]
    Replace(#[source] std::io::Error),
}

/// Primary error type for kbswitch operations.
#[derive(Error, Debug)]
pub enum KbError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("Profile file {path} is malformed: {reason}")]
    ProfileParse { path: String, reason: String },

    // OS adapter errors
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Failed to read current input layout: {0}")]
    LayoutQuery(String),

    #[error("Layout '{layout}' rejected by the OS: {reason}")]
    LayoutRejected { layout: String, reason: String },

    // Web server errors
    #[error("Web server failed to start on {addr}: {reason}")]
    WebServerFailed { addr: String, reason: String },

    #[error(
        "This command drives the Windows input-layout mechanism and is unavailable on this platform"
    )]
    UnsupportedPlatform,

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl KbError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::LayoutRejected { .. } | Self::ProfileParse { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Validation(_) => Some("Fix the reported field and resubmit the profile list"),
            Self::LayoutRejected { .. } => {
                Some("Ensure the layout identifier names an installed input language")
            }
            Self::ProfileParse { .. } => {
                Some("Restore the profile file from the backups/ directory")
            }
            Self::WebServerFailed { .. } => Some("Use --port to pick a free port"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using KbError.
pub type Result<T> = std::result::Result<T, KbError>;
