//! Set concept generation from a short pitch.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::client::FallbackClient;
use crate::error::Error;
use crate::parser::extract_json;
use crate::prompt::build_concept_prompt;
use crate::providers::ChatProvider;
use crate::request::Shape;

/// The ten two-color pairs every concept covers
pub const COLOR_PAIRS: [&str; 10] = [
  "WU", "UB", "BR", "RG", "GW", "WB", "UR", "BG", "RW", "GU"
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype
{   pub colors: String
  , pub name: String
  , #[serde(default)]
    pub description: String
  , #[serde(default)]
    pub key_cards: Vec<String>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetConcept
{   pub name: String
  , #[serde(default)]
    pub description: String
  , #[serde(default)]
    pub mechanics: Vec<String>
  , #[serde(default)]
    pub archetypes: Vec<Archetype>
  , #[serde(default)]
    pub flavor_themes: Vec<String>
  , #[serde(default)]
    pub design_notes: String
}

/// Concept plus whether it came from the hand-authored fallback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptReply
{   pub concept: SetConcept
  , pub fallback_used: bool
}

impl SetConcept
{   /// Parse a model reply into a concept
    pub fn from_reply(raw: &str) -> Result<Self, Error>
    {   let value = extract_json(raw, Shape::Object)?;
        let concept: SetConcept = serde_json::from_value(value)
          .map_err(|e| Error::MalformedPayload(e.to_string()))?;
        if concept.name.trim().is_empty()
        {   return Err(Error::MalformedPayload(
              "set concept has an empty name".to_string()
            ));
        }
        let missing = concept.missing_pairs();
        if !missing.is_empty()
        {   warn!(
              "Concept '{}' lacks archetypes for: {}",
              concept.name,
              missing.join(", ")
            );
        }
        Ok(concept)
    }

    /// Color pairs without an archetype
    pub fn missing_pairs(&self) -> Vec<&'static str>
    {   COLOR_PAIRS.iter()
          .copied()
          .filter(|pair| {
            !self.archetypes.iter().any(|a| a.colors.eq_ignore_ascii_case(pair))
          })
          .collect()
    }

    /// Hand-authored concept for when every model is out of quota
    pub fn fallback(pitch: &str) -> Self
    {   let title = title_case(pitch.trim());
        let archetypes = [
          ("WU", "Control", "Counter spells and card draw", ["Counterspell variants", "Card draw spells"])
        , ("UB", "Mill", "Library destruction strategy", ["Mill spells", "Graveyard value"])
        , ("BR", "Aggro", "Fast aggressive creatures", ["Cheap creatures", "Burn spells"])
        , ("RG", "Ramp", "Big creatures and mana acceleration", ["Mana dorks", "Large threats"])
        , ("GW", "Tokens", "Create multiple small creatures", ["Token makers", "Anthem effects"])
        , ("WB", "Lifegain", "Gain life and drain opponents", ["Lifegain spells", "Life drain"])
        , ("UR", "Spells", "Instant and sorcery synergies", ["Cheap spells", "Spell payoffs"])
        , ("BG", "Graveyard", "Use the graveyard as a resource", ["Self-mill", "Recursion"])
        , ("RW", "Equipment", "Artifacts that enhance creatures", ["Equipment", "Equipment matters"])
        , ("GU", "Ramp", "Accelerate into big spells", ["Ramp spells", "Big payoffs"])
        ];

        SetConcept
        {   name: format!("{} Set", title)
          , description: format!(
              "A Magic: The Gathering set based on the theme of '{}'. \
               It explores new mechanical territory while keeping the \
               familiar strengths of Magic gameplay, with room for both \
               competitive and casual play.",
              pitch.trim()
            )
          , mechanics: ["Adapt", "Investigate", "Prowess", "Scry", "Token Generation"]
              .iter()
              .map(|m| m.to_string())
              .collect()
          , archetypes: archetypes.iter()
              .map(|(colors, name, description, key_cards)| Archetype
              {   colors: colors.to_string()
                , name: name.to_string()
                , description: description.to_string()
                , key_cards: key_cards.iter().map(|c| c.to_string()).collect()
              })
              .collect()
          , flavor_themes: vec![
              title
            , "Adventure".to_string()
            , "Discovery".to_string()
            , "Magic".to_string()
            , "Wonder".to_string()
            ]
          , design_notes: format!(
              "This set concept was generated as a fallback due to API \
               limitations. The theme '{}' offers rich design space for a \
               full Magic set.",
              pitch.trim()
            )
        }
    }
}

/// One object-shaped request through the fallback client
pub async fn generate_set_concept<P: ChatProvider>(
  client: &mut FallbackClient<P>
, pitch: &str
, temperature: f32
) -> Result<SetConcept, Error>
{   let payload = build_concept_prompt(pitch, temperature)?;
    info!("Generating set concept from pitch: {}", pitch.trim());
    let reply = client.complete(&payload).await?;
    let concept = SetConcept::from_reply(&reply.text)?;
    info!(
      "Generated set concept '{}' with {} archetypes",
      concept.name,
      concept.archetypes.len()
    );
    Ok(concept)
}

fn title_case(text: &str) -> String
{   text.split_whitespace()
      .map(|word| {
        let mut chars = word.chars();
        match chars.next()
        {   Some(first) => first.to_uppercase()
              .chain(chars.flat_map(|c| c.to_lowercase()))
              .collect()
          , None => String::new()
        }
      })
      .collect::<Vec<String>>()
      .join(" ")
}

