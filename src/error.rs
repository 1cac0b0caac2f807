//! Error types.
//!
//! `ExamError` is what callers see: I/O and decode failures are fatal for the
//! request, validation failures are rejected before any work starts.
//! `RewriteError` never leaves the variation engine; it only decides when to
//! fall back to the local shuffle.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExamError {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{} is not valid UTF-8", path.display())]
  Decode { path: PathBuf },

  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid request: {0}")]
  Validation(String),

  #[error("config error: {0}")]
  Config(String),
}

impl ExamError {
  pub fn validation(msg: impl Into<String>) -> Self {
    ExamError::Validation(msg.into())
  }

  /// Validation errors are client mistakes; everything else is an operational failure.
  pub fn is_client_error(&self) -> bool {
    matches!(self, ExamError::Validation(_))
  }
}

#[derive(Debug, Error)]
pub enum RewriteError {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("response blocked by content filter")]
  ContentFiltered,

  #[error("malformed response: {0}")]
  Malformed(String),
}
