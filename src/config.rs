//! Configuration for the provider, the fallback chain and batching

use serde::{Deserialize, Serialize};
use std::path::Path;
use log::debug;

use crate::error::Error;

pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Environment variable holding the API key
    pub api_key_env: String
  , /// Request timeout in seconds
    pub timeout_secs: Option<u64>
  , /// Max tokens to generate per request
    pub max_tokens: Option<usize>
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_base: None
          , api_key_env: DEFAULT_API_KEY_ENV.to_string()
          , timeout_secs: Some(300)
          , max_tokens: None
        }
    }
}

impl ProviderConfig
{   /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, Error>
    {   std::env::var(&self.api_key_env)
          .ok()
          .filter(|key| !key.trim().is_empty())
          .ok_or_else(|| Error::Config(format!(
            "environment variable {} is not set",
            self.api_key_env
          )))
    }
}

/// Fallback chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig
{   /// Models in order of preference
    pub models: Vec<String>
}

impl Default for FallbackConfig
{   fn default() -> Self
    {   FallbackConfig
        {   models: crate::failover::DEFAULT_MODEL_CHAIN
              .iter()
              .map(|m| m.to_string())
              .collect()
        }
    }
}

/// Batching and sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig
{   pub standard_batch_size: usize
  , pub large_batch_size: usize
  , /// Temperature for single-card requests
    pub card_temperature: f32
  , /// Temperature for batch requests; lower keeps arrays well formed
    pub batch_temperature: f32
  , pub concept_temperature: f32
}

impl Default for GenerationConfig
{   fn default() -> Self
    {   GenerationConfig
        {   standard_batch_size: 15
          , large_batch_size: 25
          , card_temperature: 1.0
          , batch_temperature: 0.9
          , concept_temperature: 0.8
        }
    }
}

/// setforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig
{   pub provider: ProviderConfig
  , pub fallback: FallbackConfig
  , pub generation: GenerationConfig
}

impl ForgeConfig
{   /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| Error::Config(format!(
            "cannot read {}: {}", path.display(), e
          )))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, Error>
    {   let config: ForgeConfig = serde_json::from_str(text)
          .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error>
    {   if self.fallback.models.is_empty()
        {   return Err(Error::Config(
              "fallback.models must list at least one model".to_string()
            ));
        }
        if self.fallback.models.iter().any(|m| m.trim().is_empty())
        {   return Err(Error::Config(
              "fallback.models contains an empty model name".to_string()
            ));
        }
        if self.generation.standard_batch_size == 0
          || self.generation.large_batch_size == 0
        {   return Err(Error::Config(
              "batch sizes must be greater than zero".to_string()
            ));
        }
        Ok(())
    }
}
