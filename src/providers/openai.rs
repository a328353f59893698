use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use log::{debug, trace, error};
use std::time::Duration;

use crate::request::{ChatMessage, ProviderFailure, ProviderPayload};

pub const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>
  , pub temperature: f32
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ResponseMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

/// `{"error": {...}}` body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope
{   pub error: ApiErrorBody
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody
{   #[serde(default)]
    pub message: String
  , #[serde(rename = "type", default)]
    pub error_type: Option<String>
  , #[serde(default)]
    pub code: Option<String>
}

/// Decode a non-success response body into a structured failure.
/// Bodies that are not the standard envelope keep their raw text.
pub fn failure_from_body(status: u16, body: &str) -> ProviderFailure
{   match serde_json::from_str::<ApiErrorEnvelope>(body)
    {   Ok(envelope) => ProviderFailure
        {   status: Some(status)
          , code: envelope.error.code
          , error_type: envelope.error.error_type
          , message: envelope.error.message
        }
      , Err(_) => ProviderFailure::http(status, body.trim())
    }
}

// ===== OpenAI Client =====

/// OpenAI-compatible chat completions over HTTP
pub struct OpenAiProvider
{   api_key: String
  , api_base: String
  , max_tokens: Option<usize>
  , http_client: reqwest::Client
}

impl OpenAiProvider
{   pub fn new(
      api_key: String
    , api_base: Option<String>
    ) -> Self
    {   debug!("Creating OpenAiProvider");
        OpenAiProvider
        {   api_key
          , api_base: api_base
              .unwrap_or_else(|| OPENAI_API_BASE.to_string())
              .trim_end_matches('/')
              .to_string()
          , max_tokens: None
          , http_client: reqwest::Client::new()
        }
    }

    /// Build from configuration, reading the key from the environment
    pub fn from_config(
      config: &crate::config::ProviderConfig
    ) -> Result<Self, crate::error::Error>
    {   let api_key = config.api_key()?;
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          crate::error::Error::Config(e.to_string())
        })?;

        let mut provider = OpenAiProvider::new(
          api_key,
          config.api_base.clone()
        );
        provider.http_client = http_client;
        provider.max_tokens = config.max_tokens;
        Ok(provider)
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self
    {   self.max_tokens = Some(max_tokens);
        self
    }

    pub fn api_base(&self) -> &str
    {   &self.api_base
    }

    fn endpoint(&self) -> String
    {   format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl crate::providers::ChatProvider for OpenAiProvider
{   fn name(&self) -> &str
    {   "openai"
    }

    async fn complete(
      &self
    , model: &str
    , payload: &ProviderPayload
    ) -> Result<String, ProviderFailure>
    {   debug!("Handling completion for: {}", model);

        let request = OpenAiChatRequest
        {   model: model.to_string()
          , messages: payload.messages()
          , max_tokens: self.max_tokens
          , temperature: payload.temperature
        };

        trace!("OpenAI request: {:?}", request);

        let response = self.http_client
          .post(self.endpoint())
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            ProviderFailure::transport(e.to_string())
          })?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("OpenAI API error: {}", error_text);
            return Err(failure_from_body(status.as_u16(), &error_text));
        }

        let chat_response: OpenAiChatResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            ProviderFailure::transport(format!(
              "unreadable completion body: {}", e
            ))
          })?;

        chat_response.choices.into_iter().next()
          .and_then(|c| {
            if let Some(reason) = &c.finish_reason
            {   trace!("finish_reason: {}", reason);
            }
            c.message.content
          })
          .ok_or_else(|| {
            error!("No choices in response");
            ProviderFailure::transport(
              "API response contained no choices"
            )
          })
    }
}
