//! Provider-facing request and response types for setforge

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level JSON shape a request expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape
{   Object
  , Array
}

impl Shape
{   /// Opening and closing delimiters for this shape
    pub fn delimiters(&self) -> (char, char)
    {   match self
        {   Shape::Object => ('{', '}')
          , Shape::Array => ('[', ']')
        }
    }

    /// The shape that is not this one
    pub fn other(&self) -> Shape
    {   match self
        {   Shape::Object => Shape::Array
          , Shape::Array => Shape::Object
        }
    }
}

impl fmt::Display for Shape
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self
        {   Shape::Object => write!(f, "object")
          , Shape::Array => write!(f, "array")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

/// One logical provider request: a system and a user instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayload
{   /// System instruction
    pub system: String
  , /// User instruction
    pub user: String
  , /// Temperature for sampling
    pub temperature: f32
  , /// Shape the caller will parse out of the reply
    pub expected_shape: Shape
}

impl ProviderPayload
{   pub fn messages(&self) -> Vec<ChatMessage>
    {   vec![
          ChatMessage
          {   role: "system".to_string()
            , content: self.system.clone()
          }
        , ChatMessage
          {   role: "user".to_string()
            , content: self.user.clone()
          }
        ]
    }
}

/// Raw model output together with the model that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply
{   /// Generated text
    pub text: String
  , /// Model that generated it
    pub model: String
}

/// Structured provider failure, the input to quota classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure
{   /// HTTP status, absent for transport failures
    pub status: Option<u16>
  , /// Provider error code (e.g. "insufficient_quota")
    pub code: Option<String>
  , /// Provider error type
    pub error_type: Option<String>
  , /// Error message
    pub message: String
}

impl ProviderFailure
{   pub fn transport(message: impl Into<String>) -> Self
    {   ProviderFailure
        {   status: None
          , code: None
          , error_type: None
          , message: message.into()
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self
    {   ProviderFailure
        {   status: Some(status)
          , code: None
          , error_type: None
          , message: message.into()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self
    {   self.code = Some(code.into());
        self
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self
    {   self.error_type = Some(error_type.into());
        self
    }
}

impl fmt::Display for ProviderFailure
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self.status
        {   Some(status) => write!(f, "status {}: ", status)?
          , None => write!(f, "transport: ")?
        }
        if let Some(code) = &self.code
        {   write!(f, "[{}] ", code)?;
        }
        write!(f, "{}", self.message)
    }
}
