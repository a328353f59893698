use serde::Serialize;
use thiserror::Error as ThisError;

use crate::request::{ProviderFailure, Shape};

/// Machine-readable error classification handed to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind
{   QuotaExceeded
  , ProviderError
  , NoPayloadFound
  , MalformedPayload
  , ShapeMismatch
  , IncompleteBatch
  , SlotMismatch
  , InvalidRequest
  , InvalidCatalog
  , Cancelled
  , Export
  , Config
  , Disconnected
}

/// Custom error type for setforge operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error
{   /// Every model in the fallback chain reported quota exhaustion
    #[error("Quota exceeded on last fallback model {model}: {message}")]
    QuotaExceeded
    {   model: String
      , message: String
    }
  , /// Any other provider-side failure; never retried
    #[error("Provider error: {0}")]
    Provider(ProviderFailure)
  , #[error("No JSON {expected} found in model response")]
    NoPayloadFound
    {   expected: Shape
    }
  , #[error("Malformed JSON payload: {0}")]
    MalformedPayload(String)
  , #[error("Expected a JSON {expected}, found {found}")]
    ShapeMismatch
    {   expected: Shape
      , found: String
    }
  , #[error("Batch incomplete, missing slots: {}", .missing.join(", "))]
    IncompleteBatch
    {   missing: Vec<String>
    }
  , /// A returned card names a slot twice or a slot outside its batch
    #[error("Slot mismatch: {0}")]
    SlotMismatch(String)
  , #[error("Invalid request: {0}")]
    InvalidRequest(String)
  , #[error("Invalid catalog: {0}")]
    InvalidCatalog(String)
  , #[error("Generation cancelled")]
    Cancelled
  , #[error("Export failed: {0}")]
    Export(String)
  , #[error("Invalid configuration: {0}")]
    Config(String)
  , /// The backend task is gone
    #[error("Backend disconnected: {0}")]
    Disconnected(String)
}

impl Error
{   pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::QuotaExceeded { .. } => ErrorKind::QuotaExceeded
          , Error::Provider(_) => ErrorKind::ProviderError
          , Error::NoPayloadFound { .. } => ErrorKind::NoPayloadFound
          , Error::MalformedPayload(_) => ErrorKind::MalformedPayload
          , Error::ShapeMismatch { .. } => ErrorKind::ShapeMismatch
          , Error::IncompleteBatch { .. } => ErrorKind::IncompleteBatch
          , Error::SlotMismatch(_) => ErrorKind::SlotMismatch
          , Error::InvalidRequest(_) => ErrorKind::InvalidRequest
          , Error::InvalidCatalog(_) => ErrorKind::InvalidCatalog
          , Error::Cancelled => ErrorKind::Cancelled
          , Error::Export(_) => ErrorKind::Export
          , Error::Config(_) => ErrorKind::Config
          , Error::Disconnected(_) => ErrorKind::Disconnected
        }
    }

    /// Wire form for an error reply
    pub fn to_response(&self) -> ErrorResponse
    {   ErrorResponse
        {   kind: self.kind()
          , message: self.to_string()
        }
    }
}

/// Error body sent in place of any result; never carries partial data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse
{   pub kind: ErrorKind
  , pub message: String
}
