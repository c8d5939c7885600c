use thiserror::Error;

/// Failures while obtaining or opening the model artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch model artifact: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("model cache i/o failed: {0}")]
    Cache(#[from] std::io::Error),
    #[error("malformed model artifact: {0}")]
    Artifact(String),
    #[error("live class index {index} outside label set of {count} labels")]
    LiveClassOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model is not loaded")]
    NotLoaded,
    #[error("inference failed: {0}")]
    Backend(String),
    #[error("classifier returned {got} probabilities for {expected} labels")]
    OutputShape { got: usize, expected: usize },
}

/// Request-boundary failures; these never reach the model manager.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("unrecognized image format {0:?}")]
    UnsupportedFormat(String),
}
