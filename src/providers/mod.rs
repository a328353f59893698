//! Chat-completion provider implementations

pub mod openai;

use std::sync::Arc;
use async_trait::async_trait;

use crate::request::{ProviderFailure, ProviderPayload};

// Re-export for convenience
pub use openai::OpenAiProvider;

/// A remote chat-completion service.
///
/// Implementations make exactly one attempt per call and report
/// failures in structured form; retry and fallback belong to
/// [`crate::client::FallbackClient`].
#[async_trait]
pub trait ChatProvider: Send + Sync
{   /// Short provider name for logs
    fn name(&self) -> &str;

    /// Run one completion against `model`, returning the raw text
    async fn complete(
      &self
    , model: &str
    , payload: &ProviderPayload
    ) -> Result<String, ProviderFailure>;
}

#[async_trait]
impl<T: ChatProvider + ?Sized> ChatProvider for Arc<T>
{   fn name(&self) -> &str
    {   (**self).name()
    }

    async fn complete(
      &self
    , model: &str
    , payload: &ProviderPayload
    ) -> Result<String, ProviderFailure>
    {   (**self).complete(model, payload).await
    }
}
