// [libs/infra/fetchers/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned an unparseable payload: {0}")]
    Decode(String),
    #[error("upstream responded with status {0}")]
    Upstream(reqwest::StatusCode),
    #[error("integration disabled in config")]
    Disabled,
}
