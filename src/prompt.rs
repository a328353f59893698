//! Prompt builder: theme + slot requests -> provider payload.
//!
//! Design constraints in the wording (balance curves, color pie,
//! no "strictly better" reprints) are advice to the model; nothing
//! here enforces them.

use std::fmt::{self, Write};

use crate::catalog::{CardClass, SlotRequest};
use crate::config::GenerationConfig;
use crate::error::Error;
use crate::request::{ProviderPayload, Shape};

const SINGLE_CARD_SYSTEM: &str = "You are an expert Magic: The Gathering \
card designer with deep knowledge of game balance, the color pie, and \
rarity expectations. Create cards that are balanced according to \
established Magic design principles. Every creature must pass the \
'vanilla test' for its stats and every card must be appropriately costed. \
Prioritize balance and playability over flashy effects.";

const BATCH_SYSTEM: &str = "You are an expert Magic: The Gathering card \
designer specializing in batch card creation. You create multiple \
balanced, thematic cards in a single response. Always return exactly \
the number of cards requested as one valid JSON array. Every creature \
must have appropriate stats for its mana cost, and every spell must be \
fairly costed according to established Magic design principles.";

const CONCEPT_SYSTEM: &str = "You are an expert Magic: The Gathering set \
designer. Given a brief pitch for a set, expand it into a comprehensive \
set concept. Respond with one JSON object with the keys \"name\", \
\"description\" (2-3 paragraphs on the world, story and themes), \
\"mechanics\" (3-5 key mechanics), \"archetypes\" (objects with \"colors\", \
\"name\", \"description\" and \"key_cards\"), \"flavor_themes\" and \
\"design_notes\". You MUST create exactly 10 archetypes, one for each \
two-color pair: WU, UB, BR, RG, GW, WB, UR, BG, RW, GU.";

const BALANCE_RULES: &str = "\
CRITICAL BALANCE REQUIREMENTS:
- Creatures: follow the \"vanilla test\"; stats must be reasonable even without abilities
- 1-mana creatures: usually 2/1, 1/2, or 1/1 with upside
- 2-mana creatures: usually 2/2, 3/1, 1/3, or 2/1 with an ability
- 3-mana creatures: usually 3/3, 4/2, 2/4, or 3/2 with an ability
- Higher costs: scale stats or abilities appropriately
- Spells: cost effects fairly based on existing Magic cards
- Avoid \"strictly better\" versions of existing cards
- Respect each color's slice of the color pie
- Match rarity expectations for complexity and power level
";

const COLORLESS_RULE: &str = "For colorless cards, use generic mana costs \
only and focus on artifacts, Equipment, or colorless creatures.";

/// Sampling temperatures for the two request sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptTemperatures
{   pub single: f32
  , pub batch: f32
}

impl Default for PromptTemperatures
{   fn default() -> Self
    {   PromptTemperatures::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for PromptTemperatures
{   fn from(config: &GenerationConfig) -> Self
    {   PromptTemperatures
        {   single: config.card_temperature
          , batch: config.batch_temperature
        }
    }
}

/// Build the payload for one or more slots.
///
/// One slot asks for exactly one JSON object; N slots ask for exactly
/// one JSON array of N objects, each tagged with its `slot_id`.
pub fn build_prompt(
  theme: &str
, requests: &[SlotRequest]
, temperatures: PromptTemperatures
) -> Result<ProviderPayload, Error>
{   match requests
    {   [] => Err(Error::InvalidRequest(
          "cannot build a prompt for zero slots".to_string()
        ))
      , [single] => single_card_payload(theme, single, temperatures.single)
          .map_err(render_error)
      , many => batch_payload(theme, many, temperatures.batch)
          .map_err(render_error)
    }
}

/// Array-shaped payload for any non-empty batch, including a batch of
/// one; set runs always reconcile against an array.
pub fn build_batch_prompt(
  theme: &str
, requests: &[SlotRequest]
, temperatures: PromptTemperatures
) -> Result<ProviderPayload, Error>
{   if requests.is_empty()
    {   return Err(Error::InvalidRequest(
          "cannot build a prompt for zero slots".to_string()
        ));
    }
    batch_payload(theme, requests, temperatures.batch)
      .map_err(render_error)
}

fn render_error(e: fmt::Error) -> Error
{   Error::InvalidRequest(format!("failed to render prompt: {}", e))
}

fn single_card_payload(
  theme: &str
, request: &SlotRequest
, temperature: f32
) -> Result<ProviderPayload, fmt::Error>
{   let spec = &request.spec;
    let rarity = spec.rarity;
    let mut user = String::new();

    writeln!(
      user,
      "Create a Magic: The Gathering {} card with the following specifications:\n",
      rarity
    )?;
    write_slot_block(&mut user, theme, request)?;
    writeln!(user, "\nThe card should:")?;
    writeln!(user, "1. Fit the \"{}\" theme with creative, immersive flavor", theme)?;
    writeln!(user, "2. Meet the specific requirements of slot {}", spec.id)?;
    writeln!(user, "3. Be appropriate for {} rarity with a balanced power level", rarity)?;
    writeln!(user, "4. Follow modern Magic templating")?;
    writeln!(user, "5. Have a memorable, thematic name and evocative flavor text")?;
    writeln!(user, "6. Stay within {}'s slice of the color pie\n", spec.color)?;
    write_class_guidance(&mut user, request.card_class)?;
    writeln!(user, "\n{}", BALANCE_RULES)?;
    writeln!(user, "Return the card as one JSON object in this format:")?;
    writeln!(user, "{}", card_example(&spec.id, rarity.title(), true))?;
    writeln!(user, "\nFor non-creatures, omit the power and toughness fields.")?;

    Ok(ProviderPayload
    {   system: SINGLE_CARD_SYSTEM.to_string()
      , user
      , temperature
      , expected_shape: Shape::Object
    })
}

fn batch_payload(
  theme: &str
, requests: &[SlotRequest]
, temperature: f32
) -> Result<ProviderPayload, fmt::Error>
{   let count = requests.len();
    let mut user = String::new();

    writeln!(
      user,
      "Create exactly {} Magic: The Gathering cards for the \"{}\" theme in a single response.\n",
      count, theme
    )?;
    writeln!(
      user,
      "IMPORTANT: You must create exactly {} cards, one for each specification below.\n",
      count
    )?;
    writeln!(user, "Cards to generate:")?;

    for (i, request) in requests.iter().enumerate()
    {   writeln!(user, "\nCard {} (Slot ID: {}):", i + 1, request.spec.id)?;
        write_slot_block(&mut user, theme, request)?;
        if request.card_class == CardClass::Creature
        {   writeln!(user, "- Must be a creature")?;
        }
    }

    writeln!(user, "\nDESIGN REQUIREMENTS:")?;
    writeln!(user, "1. Each card must fit the \"{}\" theme with immersive flavor", theme)?;
    writeln!(user, "2. Follow modern Magic templating")?;
    writeln!(user, "3. Be appropriate for the specified rarity with a balanced power level")?;
    writeln!(user, "4. Have memorable, thematic names and evocative flavor text\n")?;
    writeln!(user, "{}", BALANCE_RULES)?;
    if requests.iter().any(|r| r.card_class == CardClass::Colorless)
    {   writeln!(user, "{}\n", COLORLESS_RULE)?;
    }
    writeln!(
      user,
      "CRITICAL: Return exactly {} cards as one JSON array. Each card must include its slot_id field.\n",
      count
    )?;
    writeln!(user, "Format:")?;
    let examples: Vec<String> = requests.iter()
      .take(2)
      .enumerate()
      .map(|(i, r)| card_example(&r.spec.id, r.spec.rarity.title(), i == 0))
      .collect();
    writeln!(user, "[\n{}\n]", examples.join(",\n"))?;
    writeln!(user, "\nFor non-creatures, omit the power and toughness fields.")?;
    writeln!(user, "ENSURE: each card has a unique slot_id matching the specifications above.")?;

    Ok(ProviderPayload
    {   system: BATCH_SYSTEM.to_string()
      , user
      , temperature
      , expected_shape: Shape::Array
    })
}

fn write_slot_block(
  out: &mut String
, theme: &str
, request: &SlotRequest
) -> fmt::Result
{   let spec = &request.spec;
    writeln!(out, "- Theme: {}", theme)?;
    writeln!(out, "- Color: {}", spec.color)?;
    writeln!(out, "- Rarity: {}", spec.rarity)?;
    writeln!(out, "- Slot ID: {}", spec.id)?;
    writeln!(out, "- Requirements: {}", spec.description())?;
    writeln!(out, "- Mana Value: {}", spec.constraint_text("mana_value"))?;
    writeln!(out, "- Card Type: {}", spec.constraint_text("type"))?;
    if spec.constraints.contains_key("colors")
    {   writeln!(out, "- Colors: {}", spec.constraint_text("colors"))?;
    }
    Ok(())
}

fn write_class_guidance(out: &mut String, class: CardClass) -> fmt::Result
{   let line = match class
    {   CardClass::Creature => "This slot is a creature: give it power and toughness that fit its mana value."
      , CardClass::Spell => "This slot is a non-creature spell: cost its effect fairly."
      , CardClass::Colorless => COLORLESS_RULE
      , CardClass::Generic => "Choose whichever card type best serves the slot requirements."
    };
    writeln!(out, "{}", line)
}

fn card_example(slot_id: &str, rarity: &str, creature: bool) -> String
{   let mut example = serde_json::Map::new();
    example.insert("slot_id".into(), slot_id.into());
    if creature
    {   example.insert("name".into(), "Card Name".into());
        example.insert("mana_cost".into(), "1W".into());
        example.insert("type".into(), "Creature — Human Soldier".into());
        example.insert("power".into(), 2.into());
        example.insert("toughness".into(), 1.into());
        example.insert("rules_text".into(), "Card abilities text".into());
    } else
    {   example.insert("name".into(), "Another Card Name".into());
        example.insert("mana_cost".into(), "2U".into());
        example.insert("type".into(), "Instant".into());
        example.insert("rules_text".into(), "Card effect".into());
    }
    example.insert("flavor_text".into(), "Flavor text".into());
    example.insert("rarity".into(), rarity.into());
    serde_json::to_string_pretty(&serde_json::Value::Object(example))
      .unwrap_or_default()
}

/// Payload for a set concept built from a short pitch
pub fn build_concept_prompt(
  pitch: &str
, temperature: f32
) -> Result<ProviderPayload, Error>
{   let pitch = pitch.trim();
    if pitch.is_empty()
    {   return Err(Error::InvalidRequest("pitch is required".to_string()));
    }
    Ok(ProviderPayload
    {   system: CONCEPT_SYSTEM.to_string()
      , user: format!(
          "Create a comprehensive Magic: The Gathering set concept from \
this pitch: {}\n\nRemember: you must include exactly 10 archetypes \
covering all two-color pairs (WU, UB, BR, RG, GW, WB, UR, BG, RW, GU). \
Each should be thematically appropriate and mechanically distinct.",
          pitch
        )
      , temperature
      , expected_shape: Shape::Object
    })
}
