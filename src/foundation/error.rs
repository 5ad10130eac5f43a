pub type QuadreelResult<T> = Result<T, QuadreelError>;

#[derive(thiserror::Error, Debug)]
pub enum QuadreelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("decomposition error: {0}")]
    Decomposition(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("media error: {0}")]
    Media(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuadreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn decomposition(msg: impl Into<String>) -> Self {
        Self::Decomposition(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }
}
