use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("unexpected status {status} from {url}")]
  Status { status: StatusCode, url: String },
  #[error("undecodable response from {url}: {source}")]
  Decode {
    url:    String,
    #[source]
    source: serde_json::Error,
  },
}

impl Error {
  /// Transport and protocol failures may clear up on a later attempt; a
  /// malformed payload will not.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Error::Transport(_) | Error::Status { .. })
  }

  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Error::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
