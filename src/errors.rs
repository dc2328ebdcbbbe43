use thiserror::Error;

pub type Result<T> = std::result::Result<T, AvatarError>;

#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Account store error: {0} {1}")]
    Store(String, String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for AvatarError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
