//! Crate error type / 错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Favicon request for {url} failed with status {status}")]
    FaviconStatus { url: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, Error>;
