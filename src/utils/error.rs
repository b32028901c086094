use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Render not ready: {what}")]
    TransientRender { what: String },

    #[error("Slate selection failed: {slate}: {message}")]
    SlateSelection { slate: String, message: String },

    #[error("Table layout drift: {message}")]
    LayoutDrift { message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn transient(what: impl Into<String>) -> Self {
        AppError::TransientRender { what: what.into() }
    }

    /// Only render-timing errors are worth another attempt; everything else
    /// is either structural or fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientRender { .. })
    }

    /// Errors that end the run instead of being absorbed per row or per slate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Persistence(_)
                | AppError::Csv(_)
                | AppError::Io(_)
                | AppError::LayoutDrift { .. }
                | AppError::Config(_)
                | AppError::Validation(_)
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
