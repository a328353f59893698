//! Set skeleton catalog: parsing, subsets and flattening into slot
//! requests.
//!
//! The catalog mirrors the skeleton JSON: `color -> rarity ->` either a
//! list of slots (rares, mythics, colorless, lands) or a map of
//! buckets (`creatures`, `spells`) holding lists of slots. Entries that
//! are not slot lists, such as keyword tallies, are ignored.

use std::collections::HashSet;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::{Color, Rarity};

/// Prompt wording class of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardClass
{   Creature
  , Spell
  , Colorless
  , Generic
}

impl CardClass
{   fn infer(color: Color, bucket: &BucketKind) -> CardClass
    {   match bucket
        {   BucketKind::Creatures => CardClass::Creature
          , BucketKind::Spells => CardClass::Spell
          , BucketKind::Other(_) if color == Color::Colorless => {
              CardClass::Colorless
            }
          , BucketKind::Other(_) => CardClass::Generic
        }
    }
}

/// One named position in the skeleton
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSpec
{   pub id: String
  , pub color: Color
  , pub rarity: Rarity
  , /// Everything the skeleton says about the slot besides its id
    pub constraints: Map<String, Value>
}

impl SlotSpec
{   /// Read a constraint as display text ("flexible" when absent)
    pub fn constraint_text(&self, key: &str) -> String
    {   match self.constraints.get(key)
        {   None | Some(Value::Null) => "flexible".to_string()
          , Some(Value::String(s)) => s.clone()
          , Some(Value::Array(items)) => items
              .iter()
              .map(|v| match v
              {   Value::String(s) => s.clone()
                , other => other.to_string()
              })
              .collect::<Vec<_>>()
              .join(" or ")
          , Some(other) => other.to_string()
        }
    }

    pub fn description(&self) -> String
    {   match self.constraints.get("description")
        {   Some(Value::String(s)) if !s.trim().is_empty() => s.clone()
          , _ => "Generic slot".to_string()
        }
    }
}

/// A slot paired with the theme and the wording class for its prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRequest
{   pub spec: SlotSpec
  , pub theme: String
  , pub card_class: CardClass
}

impl SlotRequest
{   /// A standalone request outside any bucket
    pub fn new(spec: SlotSpec, theme: impl Into<String>) -> Self
    {   let card_class = CardClass::infer(
          spec.color,
          &BucketKind::Other(String::new())
        );
        SlotRequest
        {   spec
          , theme: theme.into()
          , card_class
        }
    }

    pub fn id(&self) -> &str
    {   &self.spec.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketKind
{   Creatures
  , Spells
  , /// Direct slot lists and any other named bucket
    Other(String)
}

impl BucketKind
{   fn from_key(key: &str) -> BucketKind
    {   match key
        {   "creatures" => BucketKind::Creatures
          , "spells" => BucketKind::Spells
          , other => BucketKind::Other(other.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotBucket
{   pub kind: BucketKind
  , pub slots: Vec<SlotSpec>
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaritySection
{   pub rarity: Rarity
  , pub buckets: Vec<SlotBucket>
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorSection
{   pub color: Color
  , pub rarities: Vec<RaritySection>
}

/// Slot counts for a catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary
{   pub total_cards: usize
  , pub colors: IndexMap<Color, usize>
}

/// Immutable, ordered description of every slot in a set (or subset)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog
{   sections: Vec<ColorSection>
}

impl Catalog
{   pub fn from_json_str(text: &str) -> Result<Self, Error>
    {   let value: Value = serde_json::from_str(text)
          .map_err(|e| Error::InvalidCatalog(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Build from skeleton JSON, preserving key order
    pub fn from_value(value: &Value) -> Result<Self, Error>
    {   let root = value.as_object().ok_or_else(|| {
          Error::InvalidCatalog(
            "catalog root must be a JSON object".to_string()
          )
        })?;

        let mut seen = HashSet::new();
        let mut sections: Vec<ColorSection> = Vec::new();

        for (color_key, color_value) in root
        {   let color = match Color::from_key(color_key)
            {   Some(color) => color
              , None => {
                  warn!("Skipping unknown catalog section: {}", color_key);
                  continue;
                }
            };
            let rarity_map = match color_value.as_object()
            {   Some(map) => map
              , None => {
                  warn!("Catalog section {} is not an object", color_key);
                  continue;
                }
            };

            let mut rarities: Vec<RaritySection> = Vec::new();
            for (rarity_key, rarity_value) in rarity_map
            {   let rarity = match Rarity::from_key(rarity_key)
                {   Some(rarity) => rarity
                  , None => {
                      debug!(
                        "Ignoring non-rarity key {}.{}",
                        color_key,
                        rarity_key
                      );
                      continue;
                    }
                };
                let buckets = parse_buckets(
                  color, rarity, rarity_value, &mut seen
                )?;

                // signposts and plain uncommons share one section
                match rarities.iter_mut().find(|r| r.rarity == rarity)
                {   Some(section) => section.buckets.extend(buckets)
                  , None => rarities.push(RaritySection
                    {   rarity
                      , buckets
                    })
                }
            }

            match sections.iter_mut().find(|s| s.color == color)
            {   Some(section) => section.rarities.extend(rarities)
              , None => sections.push(ColorSection
                {   color
                  , rarities
                })
            }
        }

        debug!("Parsed catalog with {} slots", seen.len());
        Ok(Catalog { sections })
    }

    pub fn sections(&self) -> &[ColorSection]
    {   &self.sections
    }

    /// Every slot in traversal order: color, rarity, bucket, slot
    pub fn slots(&self) -> impl Iterator<Item = &SlotSpec>
    {   self.sections.iter()
          .flat_map(|c| c.rarities.iter())
          .flat_map(|r| r.buckets.iter())
          .flat_map(|b| b.slots.iter())
    }

    pub fn total_slots(&self) -> usize
    {   self.slots().count()
    }

    pub fn is_empty(&self) -> bool
    {   self.total_slots() == 0
    }

    pub fn slot(&self, id: &str) -> Option<&SlotSpec>
    {   self.slots().find(|s| s.id == id)
    }

    /// Flatten into slot requests in traversal order
    pub fn flatten(&self, theme: &str) -> Vec<SlotRequest>
    {   let mut requests = Vec::with_capacity(self.total_slots());
        for section in &self.sections
        {   for rarity in &section.rarities
            {   for bucket in &rarity.buckets
                {   let card_class
                      = CardClass::infer(section.color, &bucket.kind);
                    for slot in &bucket.slots
                    {   requests.push(SlotRequest
                        {   spec: slot.clone()
                          , theme: theme.to_string()
                          , card_class
                        });
                    }
                }
            }
        }
        requests
    }

    /// Keep only the given colors and rarities; empty sections drop out
    pub fn subset(&self, colors: &[Color], rarities: &[Rarity]) -> Catalog
    {   let sections = self.sections.iter()
          .filter(|s| colors.contains(&s.color))
          .map(|s| ColorSection
          {   color: s.color
            , rarities: s.rarities.iter()
                .filter(|r| rarities.contains(&r.rarity))
                .cloned()
                .collect()
          })
          .filter(|s| !s.rarities.is_empty())
          .collect();
        Catalog { sections }
    }

    /// Commons of the five colors plus colorless
    pub fn commons_only(&self) -> Catalog
    {   let mut colors = Color::MONO.to_vec();
        colors.push(Color::Colorless);
        self.subset(&colors, &[Rarity::Common])
    }

    pub fn summary(&self) -> CatalogSummary
    {   let mut colors = IndexMap::new();
        for section in &self.sections
        {   let count: usize = section.rarities.iter()
              .flat_map(|r| r.buckets.iter())
              .map(|b| b.slots.len())
              .sum();
            *colors.entry(section.color).or_insert(0) += count;
        }
        CatalogSummary
        {   total_cards: colors.values().sum()
          , colors
        }
    }
}

fn parse_buckets(
  color: Color
, rarity: Rarity
, value: &Value
, seen: &mut HashSet<String>
) -> Result<Vec<SlotBucket>, Error>
{   match value
    {   Value::Array(entries) => {
          let slots = parse_slots(color, rarity, entries, seen)?;
          Ok(vec![SlotBucket
          {   kind: BucketKind::Other(String::new())
            , slots
          }])
        }
      , Value::Object(buckets) => {
          let mut out = Vec::new();
          for (bucket_key, bucket_value) in buckets
          {   match bucket_value
              {   Value::Array(entries) => {
                    let slots = parse_slots(color, rarity, entries, seen)?;
                    out.push(SlotBucket
                    {   kind: BucketKind::from_key(bucket_key)
                      , slots
                    });
                  }
                , _ => debug!(
                    "Ignoring non-slot entry {}.{}.{}",
                    color, rarity, bucket_key
                  )
              }
          }
          Ok(out)
        }
      , _ => {
          debug!("Ignoring scalar entry under {}.{}", color, rarity);
          Ok(vec![])
        }
    }
}

fn parse_slots(
  color: Color
, rarity: Rarity
, entries: &[Value]
, seen: &mut HashSet<String>
) -> Result<Vec<SlotSpec>, Error>
{   let mut slots = Vec::with_capacity(entries.len());
    for entry in entries
    {   let object = match entry.as_object()
        {   Some(object) => object
          , None => {
              warn!("Skipping non-object slot under {}.{}", color, rarity);
              continue;
            }
        };
        let id = match object.get("id").and_then(Value::as_str)
        {   Some(id) if !id.trim().is_empty() => id.trim().to_string()
          , _ => {
              warn!("Skipping slot without id under {}.{}", color, rarity);
              continue;
            }
        };
        if !seen.insert(id.clone())
        {   return Err(Error::InvalidCatalog(
              format!("duplicate slot id {}", id)
            ));
        }
        let constraints = object.iter()
          .filter(|(key, _)| key.as_str() != "id")
          .map(|(key, value)| (key.clone(), value.clone()))
          .collect();
        slots.push(SlotSpec
        {   id
          , color
          , rarity
          , constraints
        });
    }
    Ok(slots)
}
