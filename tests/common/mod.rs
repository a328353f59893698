#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use async_trait::async_trait;
use serde_json::{json, Value};

use setforge::catalog::{Catalog, SlotSpec};
use setforge::providers::ChatProvider;
use setforge::request::{ProviderFailure, ProviderPayload};
use setforge::{Color, Rarity};

/// Provider double answering from a queue of scripted replies and
/// recording every call it receives
pub struct ScriptedProvider
{   replies: Mutex<VecDeque<Result<String, ProviderFailure>>>
  , calls: Mutex<Vec<(String, ProviderPayload)>>
}

impl ScriptedProvider
{   pub fn new(
      replies: Vec<Result<String, ProviderFailure>>
    ) -> Self
    {   ScriptedProvider
        {   replies: Mutex::new(replies.into())
          , calls: Mutex::new(vec![])
        }
    }

    /// Models called, in order
    pub fn models_called(&self) -> Vec<String>
    {   self.calls.lock().unwrap()
          .iter()
          .map(|(model, _)| model.clone())
          .collect()
    }

    pub fn payloads(&self) -> Vec<ProviderPayload>
    {   self.calls.lock().unwrap()
          .iter()
          .map(|(_, payload)| payload.clone())
          .collect()
    }

    pub fn call_count(&self) -> usize
    {   self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider
{   fn name(&self) -> &str
    {   "scripted"
    }

    async fn complete(
      &self
    , model: &str
    , payload: &ProviderPayload
    ) -> Result<String, ProviderFailure>
    {   self.calls.lock().unwrap()
          .push((model.to_string(), payload.clone()));
        self.replies.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| Err(ProviderFailure::transport("script exhausted")))
    }
}

pub fn quota_failure() -> ProviderFailure
{   ProviderFailure::http(
      429,
      "You exceeded your current quota, please check your plan and billing details."
    )
    .with_code("insufficient_quota")
    .with_type("insufficient_quota")
}

pub fn rate_limit_failure() -> ProviderFailure
{   ProviderFailure::http(429, "Rate limit reached for requests")
      .with_code("rate_limit_exceeded")
}

pub fn models(names: &[&str]) -> Vec<String>
{   names.iter().map(|n| n.to_string()).collect()
}

pub fn creature_json(slot_id: &str, name: &str) -> Value
{   json!({
      "slot_id": slot_id,
      "name": name,
      "mana_cost": "1W",
      "type": "Creature — Human Soldier",
      "power": 2,
      "toughness": 2,
      "rules_text": "Vigilance",
      "flavor_text": "They hold the line.",
      "rarity": "Common"
    })
}

pub fn artifact_json(slot_id: &str, name: &str) -> Value
{   json!({
      "slot_id": slot_id,
      "name": name,
      "mana_cost": "2",
      "type": "Artifact",
      "rules_text": "{T}: Add {C}.",
      "flavor_text": "Still humming.",
      "rarity": "Common"
    })
}

/// A reply wrapping `cards` in the kind of prose models add
pub fn batch_reply(cards: &[Value]) -> String
{   format!(
      "Here are your cards:\n```json\n{}\n```\nEnjoy!",
      serde_json::to_string_pretty(&Value::Array(cards.to_vec())).unwrap()
    )
}

/// Three white common creatures
pub fn small_catalog() -> Catalog
{   Catalog::from_value(&json!({
      "white": {
        "common": {
          "creatures": [
            { "id": "W-C-01", "description": "2-drop", "mana_value": 2 },
            { "id": "W-C-02", "description": "3-drop", "mana_value": 3 },
            { "id": "W-C-03", "description": "flier", "mana_value": 4 }
          ]
        }
      }
    }))
    .unwrap()
}

pub fn fixture_catalog() -> Catalog
{   let text = std::fs::read_to_string("tests/fixtures/catalog.json")
      .unwrap();
    Catalog::from_json_str(&text).unwrap()
}

pub fn colorless_slot(id: &str) -> SlotSpec
{   SlotSpec
    {   id: id.to_string()
      , color: Color::Colorless
      , rarity: Rarity::Common
      , constraints: serde_json::Map::new()
    }
}
