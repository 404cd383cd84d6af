use thiserror::Error;

/// Main error type for the beatcut library
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Synchronization error: {0}")]
    Sync(#[from] SyncError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Assembly cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Shot list validation errors, raised before any render work starts
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Shot '{shot_id}' has neither a still image nor a clip reference")]
    MissingMedia { shot_id: String },

    #[error("Shot '{shot_id}' has an invalid time range: {start:.3}s-{end:.3}s")]
    InvalidRange { shot_id: String, start: f64, end: f64 },

    #[error("Shot '{shot_id}' has an invalid duration flexibility: min {min:.3}s, max {max:.3}s")]
    InvalidFlexibility { shot_id: String, min: f64, max: f64 },

    #[error("Duplicate shot id: {shot_id}")]
    DuplicateShot { shot_id: String },

    #[error("Shot list is empty")]
    EmptyShotList,
}

/// Beat synchronization errors
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Worker pool could not be created: {reason}")]
    PoolFailed { reason: String },

    #[error("No synced clip found for shot '{shot_id}'")]
    MissingClip { shot_id: String },
}

/// Errors reported by or while driving the external renderer
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Renderer '{renderer}' is unavailable: {reason}")]
    Unavailable { renderer: String, reason: String },

    #[error("Render failed: {message}")]
    Failed { message: String },

    #[error("Render request is invalid: {details}")]
    InvalidRequest { details: String },

    #[error("Render was cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using AssemblyError
pub type Result<T> = std::result::Result<T, AssemblyError>;

impl AssemblyError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Create a cancellation error for the named stage
    pub fn cancelled<S: Into<String>>(stage: S) -> Self {
        Self::Cancelled { stage: stage.into() }
    }

    /// True when the failure happened before the renderer was invoked
    pub fn is_pre_render(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Sync(_) | Self::Config(_))
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // IO errors might be temporary
            Self::Io(_) => true,
            // A missing ffmpeg binary or a flaky remote renderer might come back
            Self::Render(RenderError::Unavailable { .. }) => true,
            Self::Render(RenderError::Failed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::MissingMedia { shot_id }) => {
                format!("Shot '{}' has no image or clip yet. Generate media for it before assembling.", shot_id)
            }
            Self::Render(RenderError::Unavailable { renderer, .. }) => {
                format!("The '{}' renderer is not available. Please check it is installed.", renderer)
            }
            Self::Render(RenderError::Failed { message }) => {
                format!("Rendering failed: {}", message)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Cancelled { stage } => format!("Assembly was cancelled during {}.", stage),
            _ => self.to_string(),
        }
    }
}
