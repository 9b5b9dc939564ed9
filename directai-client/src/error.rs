use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Deployment failed: {0}")]
    Deployment(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Stream request failed: {0}")]
    Stream(String),

    #[error("Invalid response from service: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] directai_core::Error),

    #[error("Annotation failed: {0}")]
    Annotate(#[from] directai_eye::AnnotateError),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Core(directai_core::Error::Io(err))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
