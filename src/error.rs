use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListerError {
    #[error("Dependency listing task failed: {reason}")]
    TaskFailed { reason: String },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ListerError>;
