//! Error types for the table codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
  /// The fragment contains no `<table>` element at all.
  #[error("markup contains no table")]
  NoTable,

  #[error("invalid selector {0:?}")]
  Selector(&'static str),
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;
