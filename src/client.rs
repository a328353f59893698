use log::{debug, info, warn, error};

use crate::error::Error;
use crate::failover::{FallbackPosition, ModelFallbackState};
use crate::providers::ChatProvider;
use crate::request::{ProviderPayload, ProviderReply};

/// Provider client with model fallback.
///
/// A quota failure moves the chain forward and retries the same
/// payload on the next model; anything else propagates at once.
/// The chain position is shared by every request this instance
/// issues, so an exhausted model is never tried again, and once
/// the whole chain is exhausted every call fails without touching
/// the network.
pub struct FallbackClient<P: ChatProvider>
{   provider: P
  , state: ModelFallbackState
}

impl<P: ChatProvider> FallbackClient<P>
{   pub fn new(provider: P, state: ModelFallbackState) -> Self
    {   debug!(
          "Creating FallbackClient over {} with {} models",
          provider.name(),
          state.models().len()
        );
        FallbackClient
        {   provider
          , state
        }
    }

    /// Build with a chain of model names; an empty chain is a
    /// configuration error.
    pub fn with_models(
      provider: P
    , models: Vec<String>
    ) -> Result<Self, Error>
    {   let state = ModelFallbackState::new(models)
          .ok_or_else(|| Error::Config(
            "model fallback chain is empty".to_string()
          ))?;
        Ok(Self::new(provider, state))
    }

    pub fn state(&self) -> &ModelFallbackState
    {   &self.state
    }

    pub fn position(&self) -> FallbackPosition
    {   self.state.position()
    }

    pub fn provider(&self) -> &P
    {   &self.provider
    }

    /// Send one logical request, walking the chain on quota failures
    pub async fn complete(
      &mut self
    , payload: &ProviderPayload
    ) -> Result<ProviderReply, Error>
    {   loop
        {   let model = match self.state.current()
            {   Some(model) => model.to_string()
              , None => {
                  debug!("Fallback chain exhausted, failing fast");
                  return Err(Error::QuotaExceeded
                  {   model: self.state.last_model().to_string()
                    , message: "all models in fallback chain have \
                        exceeded quota".to_string()
                  });
                }
            };

            info!(
              "Making {} request with model: {}",
              self.provider.name(),
              model
            );

            match self.provider.complete(&model, payload).await
            {   Ok(text) => {
                  debug!(
                    "Model {} answered with {} bytes",
                    model,
                    text.len()
                  );
                  return Ok(ProviderReply
                  {   text
                    , model
                  });
                }
              , Err(failure)
                  if crate::failover::is_quota_failure(&failure) => {
                  warn!(
                    "Quota exceeded for model {}: {}",
                    model,
                    failure.message
                  );
                  match self.state.advance()
                  {   Some(next) => {
                        info!("Switching to fallback model: {}", next);
                      }
                    , None => {
                        warn!("All models exhausted");
                        return Err(Error::QuotaExceeded
                        {   model
                          , message: failure.message
                        });
                      }
                  }
                }
              , Err(failure) => {
                  error!(
                    "Provider error on model {}: {}",
                    model,
                    failure
                  );
                  return Err(Error::Provider(failure));
                }
            }
        }
    }
}
