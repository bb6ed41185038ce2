use crate::session::Phase;

pub type GlassResult<T> = Result<T, GlassError>;

#[derive(thiserror::Error, Debug)]
pub enum GlassError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("export error: {0}")]
    Export(String),

    /// The composite could not be written out as a temporary image file.
    #[error("failed to generate image: {0}")]
    Generate(String),

    #[error("timed out after {timeout_ms} ms: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlassError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn generate(msg: impl Into<String>) -> Self {
        Self::Generate(msg.into())
    }

    pub fn timeout(what: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        }
    }
}
