//! Generated cards and their structural validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::Rarity;

/// One card produced for one slot. `slot_id` is the join key back to
/// the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard
{   pub slot_id: String
  , pub name: String
  , pub mana_cost: String
  , #[serde(rename = "type")]
    pub type_line: String
  , #[serde(skip_serializing_if = "Option::is_none", default)]
    pub power: Option<i32>
  , #[serde(skip_serializing_if = "Option::is_none", default)]
    pub toughness: Option<i32>
  , pub rules_text: String
  , pub flavor_text: String
  , pub rarity: String
  , pub generated_for_theme: String
}

impl GeneratedCard
{   /// Validate one parsed JSON object into a card for `slot_id`.
    ///
    /// `name` and `type` are required. Creatures must carry integral
    /// `power` and `toughness`; other card types never keep them.
    pub fn from_value(
      value: &Value
    , slot_id: &str
    , rarity: Rarity
    , theme: &str
    ) -> Result<Self, Error>
    {   let object = value.as_object().ok_or_else(|| {
          Error::MalformedPayload(format!(
            "card for slot {} is not a JSON object", slot_id
          ))
        })?;

        let name = required_text(object, "name", slot_id)?;
        let type_line = required_text(object, "type", slot_id)?;
        let is_creature = type_line.to_lowercase().contains("creature");

        let (power, toughness) = if is_creature
        {   (
              Some(integral_stat(object, "power", slot_id)?)
            , Some(integral_stat(object, "toughness", slot_id)?)
            )
        } else
        {   (None, None)
        };

        Ok(GeneratedCard
        {   slot_id: slot_id.to_string()
          , name
          , mana_cost: optional_text(object, "mana_cost")
          , type_line
          , power
          , toughness
          , rules_text: optional_text(object, "rules_text")
          , flavor_text: optional_text(object, "flavor_text")
          , rarity: match object.get("rarity").and_then(Value::as_str)
            {   Some(r) if !r.trim().is_empty() => r.trim().to_string()
              , _ => rarity.title().to_string()
            }
          , generated_for_theme: theme.to_string()
        })
    }

    pub fn is_creature(&self) -> bool
    {   self.type_line.to_lowercase().contains("creature")
    }
}

fn required_text(
  object: &Map<String, Value>
, key: &str
, slot_id: &str
) -> Result<String, Error>
{   match object.get(key).and_then(Value::as_str)
    {   Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string())
      , _ => Err(Error::MalformedPayload(format!(
          "card for slot {} is missing required field '{}'",
          slot_id, key
        )))
    }
}

fn optional_text(object: &Map<String, Value>, key: &str) -> String
{   match object.get(key)
    {   Some(Value::String(text)) => text.clone()
      , Some(Value::Number(n)) => n.to_string()
      , _ => String::new()
    }
}

/// Accept integral numbers and numeric strings ("3"), nothing else
fn integral_stat(
  object: &Map<String, Value>
, key: &str
, slot_id: &str
) -> Result<i32, Error>
{   let parsed = match object.get(key)
    {   Some(Value::Number(n)) => n.as_i64()
          .or_else(|| n.as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64))
          .and_then(|i| i32::try_from(i).ok())
      , Some(Value::String(s)) => s.trim().parse::<i32>().ok()
      , _ => None
    };
    parsed.ok_or_else(|| Error::MalformedPayload(format!(
      "creature card for slot {} needs an integer '{}'",
      slot_id, key
    )))
}
