pub mod error;
pub mod config;
pub mod request;
pub mod failover;
pub mod providers;
pub mod client;
pub mod catalog;
pub mod card;
pub mod complete_set;
pub mod prompt;
pub mod parser;
pub mod notify;
pub mod orchestrator;
pub mod concept;
pub mod export;
pub mod backend;

use serde::{Deserialize, Serialize};

pub use backend::ForgeBackend;
pub use card::GeneratedCard;
pub use catalog::{Catalog, CardClass, SlotRequest, SlotSpec};
pub use client::FallbackClient;
pub use complete_set::CompleteSet;
pub use config::ForgeConfig;
pub use error::{Error, ErrorKind};
pub use notify::{GenerationEvent, NotificationSink};
pub use orchestrator::{BatchMode, Orchestrator};

/*

setforge drives a chat-completion model to fill every slot of a
card set skeleton. One request per batch of slots; the model
fallback chain absorbs quota failures; every slot is filled
exactly once or the run fails.

setforge/
├── src/
│   ├── lib.rs            # Domain enums + backend channel API
│   ├── error.rs          # Error + ErrorKind
│   ├── config.rs         # serde configuration
│   ├── request.rs        # Provider payload/reply/failure types
│   ├── failover.rs       # Model fallback chain + quota predicate
│   ├── providers/        # ChatProvider trait + OpenAI transport
│   ├── client.rs         # Provider client with fallback
│   ├── catalog.rs        # Skeleton catalog + flattening
│   ├── card.rs           # GeneratedCard validation
│   ├── complete_set.rs   # color -> rarity -> slot -> card
│   ├── prompt.rs         # Prompt builder
│   ├── parser.rs         # JSON extraction from model output
│   ├── notify.rs         # Per-card event sink
│   ├── orchestrator.rs   # Batching + reconciliation
│   ├── concept.rs        # Set concept generation
│   ├── export.rs         # JSON / CSV / Cockatrice
│   ├── backend.rs        # Actor front door
│   └── main.rs           # CLI
└── tests/

*/

/// SETFORGE API INTERFACE:

// ===== GenerateSingleCard =====

pub type GenerateSingleCardReply
  = Result<crate::GeneratedCard, crate::error::Error>;
pub type GenerateSingleCardReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateSingleCardReply>;

pub struct GenerateSingleCardArgs
{   pub theme: String
  , pub color: Color
  , pub rarity: Rarity
  , pub slot_id: String
  , pub slot_descriptor: serde_json::Map<String, serde_json::Value>
  , pub events
      : Option<tokio::sync::mpsc::UnboundedSender<crate::GenerationEvent>>
  , pub reply: GenerateSingleCardReplySender
}

// ===== GenerateFullSet / GenerateSetBatch =====

pub type GenerateSetReply
  = Result<crate::CompleteSet, crate::error::Error>;
pub type GenerateSetReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateSetReply>;

pub struct GenerateFullSetArgs
{   pub theme: String
  , pub catalog: crate::Catalog
  , pub reply: GenerateSetReplySender
}

pub struct GenerateSetBatchArgs
{   pub theme: String
  , pub catalog: crate::Catalog
  , pub batch_size: usize
  , pub reply: GenerateSetReplySender
}

// ===== GenerateSetStream =====

pub struct GenerateSetStreamArgs
{   pub theme: String
  , pub catalog: crate::Catalog
  , pub batch_size: Option<usize>
  , pub events
      : tokio::sync::mpsc::UnboundedSender<crate::GenerationEvent>
}

// ===== GenerateSetConcept =====

pub type GenerateSetConceptReply
  = Result<crate::concept::ConceptReply, crate::error::Error>;
pub type GenerateSetConceptReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateSetConceptReply>;

pub struct GenerateSetConceptArgs
{   pub pitch: String
  , pub reply: GenerateSetConceptReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== ForgeHand (sender side) =====

pub struct ForgeHand
{   pub generate_single_card_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateSingleCardArgs>
  , pub generate_full_set_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateFullSetArgs>
  , pub generate_set_batch_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateSetBatchArgs>
  , pub generate_set_stream_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateSetStreamArgs>
  , pub generate_set_concept_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateSetConceptArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== ForgeFoot (receiver side) =====

pub struct ForgeFoot
{   pub generate_single_card_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateSingleCardArgs>
  , pub generate_full_set_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateFullSetArgs>
  , pub generate_set_batch_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateSetBatchArgs>
  , pub generate_set_stream_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateSetStreamArgs>
  , pub generate_set_concept_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateSetConceptArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// SETFORGE STRUCTURES:

/// Color sections of a set skeleton.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
  PartialOrd, Ord, Deserialize, Serialize
)]
#[serde(rename_all = "lowercase")]
pub enum Color
{   White
  , Blue
  , Black
  , Red
  , Green
  , Colorless
  , Multicolor
  , /// Land slots; the skeleton keeps them beside the colors
    #[serde(rename = "lands")]
    Lands
}

impl Color
{   pub const MONO: [Color; 5] = [
      Color::White
    , Color::Blue
    , Color::Black
    , Color::Red
    , Color::Green
    ];

    /// Parse a skeleton section key
    pub fn from_key(key: &str) -> Option<Color>
    {   match key.trim().to_ascii_lowercase().as_str()
        {   "white" => Some(Color::White)
          , "blue" => Some(Color::Blue)
          , "black" => Some(Color::Black)
          , "red" => Some(Color::Red)
          , "green" => Some(Color::Green)
          , "colorless" => Some(Color::Colorless)
          , "multicolor" => Some(Color::Multicolor)
          , "lands" | "land" => Some(Color::Lands)
          , _ => None
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   Color::White => "white"
          , Color::Blue => "blue"
          , Color::Black => "black"
          , Color::Red => "red"
          , Color::Green => "green"
          , Color::Colorless => "colorless"
          , Color::Multicolor => "multicolor"
          , Color::Lands => "lands"
        }
    }
}

impl std::fmt::Display for Color
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// Card rarities.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
  PartialOrd, Ord, Deserialize, Serialize
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity
{   Common
  , Uncommon
  , Rare
  , Mythic
}

impl Rarity
{   /// Parse a skeleton rarity key. Signpost uncommons share the
    /// uncommon bucket.
    pub fn from_key(key: &str) -> Option<Rarity>
    {   match key.trim().to_ascii_lowercase().as_str()
        {   "common" => Some(Rarity::Common)
          , "uncommon" | "uncommon_signposts" => Some(Rarity::Uncommon)
          , "rare" => Some(Rarity::Rare)
          , "mythic" | "mythic_rare" => Some(Rarity::Mythic)
          , _ => None
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   Rarity::Common => "common"
          , Rarity::Uncommon => "uncommon"
          , Rarity::Rare => "rare"
          , Rarity::Mythic => "mythic"
        }
    }

    /// "Common", "Uncommon", ... as printed on a card
    pub fn title(&self) -> &'static str
    {   match self
        {   Rarity::Common => "Common"
          , Rarity::Uncommon => "Uncommon"
          , Rarity::Rare => "Rare"
          , Rarity::Mythic => "Mythic"
        }
    }
}

impl std::fmt::Display for Rarity
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}
