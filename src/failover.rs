//! Model fallback chain and quota failure classification

use log::debug;

use crate::request::ProviderFailure;

/// Default chain, cheapest first
pub const DEFAULT_MODEL_CHAIN: [&str; 5] = [
  "gpt-4o-mini"
, "gpt-4o"
, "gpt-4-turbo"
, "gpt-4"
, "gpt-3.5-turbo"
];

const QUOTA_CODE: &str = "insufficient_quota";
const QUOTA_MESSAGE_MARKERS: [&str; 2] = [
  "insufficient_quota"
, "you exceeded your current quota"
];
const RATE_LIMIT_STATUS: u16 = 429;
const QUOTA_KEYWORD: &str = "quota";

/// How a provider failure is treated by the fallback client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass
{   /// Advance to the next model and retry the same request
    Quota
  , /// Propagate untouched
    Other
}

/// Classify a provider failure.
///
/// Quota when the code or type is `insufficient_quota`, when the
/// message carries one of the over-quota markers, or when a 429
/// status co-occurs with the word "quota". A bare 429 is `Other`.
pub fn classify(failure: &ProviderFailure) -> FailureClass
{   let code_hit = failure.code.as_deref() == Some(QUOTA_CODE)
      || failure.error_type.as_deref() == Some(QUOTA_CODE);
    let message = failure.message.to_lowercase();
    let marker_hit = QUOTA_MESSAGE_MARKERS
      .iter()
      .any(|marker| message.contains(marker));
    let rate_limited_quota = failure.status == Some(RATE_LIMIT_STATUS)
      && message.contains(QUOTA_KEYWORD);

    if code_hit || marker_hit || rate_limited_quota
    {   FailureClass::Quota
    } else
    {   FailureClass::Other
    }
}

pub fn is_quota_failure(failure: &ProviderFailure) -> bool
{   classify(failure) == FailureClass::Quota
}

/// Observable position of a fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPosition
{   Active(usize)
  , Exhausted
}

/// Ordered candidate models plus a cursor that only moves forward.
#[derive(Debug, Clone)]
pub struct ModelFallbackState
{   models: Vec<String>
  , cursor: usize
  , exhausted: bool
}

impl ModelFallbackState
{   /// Create a new fallback state. `None` for an empty chain.
    pub fn new(models: Vec<String>) -> Option<Self>
    {   if models.is_empty()
        {   return None;
        }
        debug!(
          "Creating model fallback chain with {} models",
          models.len()
        );
        Some(ModelFallbackState
        {   models
          , cursor: 0
          , exhausted: false
        })
    }

    /// The active model, `None` once exhausted
    pub fn current(&self) -> Option<&str>
    {   if self.exhausted
        {   return None;
        }
        self.models.get(self.cursor).map(String::as_str)
    }

    /// Move past the active model. Returns the new active model, or
    /// `None` when the chain is now exhausted.
    pub fn advance(&mut self) -> Option<&str>
    {   if self.exhausted
        {   return None;
        }
        if self.cursor + 1 < self.models.len()
        {   self.cursor += 1;
            debug!("Fallback cursor moved to {}", self.cursor);
            self.current()
        } else
        {   debug!("Fallback chain exhausted");
            self.exhausted = true;
            None
        }
    }

    pub fn position(&self) -> FallbackPosition
    {   if self.exhausted
        {   FallbackPosition::Exhausted
        } else
        {   FallbackPosition::Active(self.cursor)
        }
    }

    pub fn is_exhausted(&self) -> bool
    {   self.exhausted
    }

    /// Last model that was (or is) active
    pub fn last_model(&self) -> &str
    {   &self.models[self.cursor]
    }

    pub fn models(&self) -> &[String]
    {   &self.models
    }
}

impl Default for ModelFallbackState
{   fn default() -> Self
    {   ModelFallbackState
        {   models: DEFAULT_MODEL_CHAIN
              .iter()
              .map(|m| m.to_string())
              .collect()
          , cursor: 0
          , exhausted: false
        }
    }
}
