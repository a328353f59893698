//! Publish-only notification sink for per-card progress.

use log::{debug, error, trace};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::card::GeneratedCard;
use crate::error::{Error, ErrorKind};
use crate::{Color, Rarity};

/// Events a transport relays to its clients, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent
{   Status
    {   message: String
      , theme: String
      , total_slots: usize
    }
  , Card
    {   color: Color
      , rarity: Rarity
      , slot_id: String
      , card: GeneratedCard
    }
  , Complete
    {   message: String
      , total_cards: usize
    }
  , Error
    {   kind: ErrorKind
      , message: String
    }
}

impl GenerationEvent
{   pub fn card(color: Color, rarity: Rarity, card: &GeneratedCard) -> Self
    {   GenerationEvent::Card
        {   color
          , rarity
          , slot_id: card.slot_id.clone()
          , card: card.clone()
        }
    }

    pub fn failed(error: &Error) -> Self
    {   GenerationEvent::Error
        {   kind: error.kind()
          , message: error.to_string()
        }
    }

    /// Terminal events end a stream
    pub fn is_terminal(&self) -> bool
    {   matches!(
          self,
          GenerationEvent::Complete { .. } | GenerationEvent::Error { .. }
        )
    }
}

/// Fire-and-forget observer. Delivery failures are logged and never
/// reach the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct NotificationSink
{   tx: Option<mpsc::UnboundedSender<GenerationEvent>>
}

impl NotificationSink
{   pub fn new(tx: mpsc::UnboundedSender<GenerationEvent>) -> Self
    {   NotificationSink { tx: Some(tx) }
    }

    /// A sink that drops every event
    pub fn disabled() -> Self
    {   NotificationSink { tx: None }
    }

    /// Sink plus the receiving end of its event stream
    pub fn channel()
      -> (Self, mpsc::UnboundedReceiver<GenerationEvent>)
    {   let (tx, rx) = mpsc::unbounded_channel();
        (NotificationSink::new(tx), rx)
    }

    pub fn publish(&self, event: GenerationEvent)
    {   let Some(tx) = &self.tx else
        {   trace!("No event channel attached, dropping event");
            return;
        };
        if let GenerationEvent::Card { slot_id, card, .. } = &event
        {   debug!("Emitting card '{}' for slot {}", card.name, slot_id);
        }
        if let Err(e) = tx.send(event)
        {   error!("Failed to emit generation event: {}", e);
        }
    }
}
