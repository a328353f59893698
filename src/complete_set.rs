use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::card::GeneratedCard;
use crate::catalog::Catalog;
use crate::{Color, Rarity};

pub type RarityCards = IndexMap<String, GeneratedCard>;

/// `color -> rarity -> slot_id -> card`, shaped like the catalog it was
/// generated from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompleteSet
{   sections: IndexMap<Color, IndexMap<Rarity, RarityCards>>
}

impl CompleteSet
{   /// Empty set with one (empty) section per catalog color/rarity
    pub fn shaped_like(catalog: &Catalog) -> Self
    {   let mut sections = IndexMap::new();
        for color in catalog.sections()
        {   let rarities: &mut IndexMap<Rarity, RarityCards>
              = sections.entry(color.color).or_default();
            for rarity in &color.rarities
            {   rarities.entry(rarity.rarity).or_default();
            }
        }
        CompleteSet { sections }
    }

    /// Place a card; returns the card it displaced, if any
    pub fn insert(
      &mut self
    , color: Color
    , rarity: Rarity
    , card: GeneratedCard
    ) -> Option<GeneratedCard>
    {   self.sections
          .entry(color)
          .or_default()
          .entry(rarity)
          .or_default()
          .insert(card.slot_id.clone(), card)
    }

    pub fn get(
      &self
    , color: Color
    , rarity: Rarity
    , slot_id: &str
    ) -> Option<&GeneratedCard>
    {   self.sections.get(&color)?.get(&rarity)?.get(slot_id)
    }

    pub fn section(&self, color: Color) -> Option<&IndexMap<Rarity, RarityCards>>
    {   self.sections.get(&color)
    }

    /// Cards in placement order
    pub fn cards(&self)
      -> impl Iterator<Item = (Color, Rarity, &GeneratedCard)>
    {   self.sections.iter().flat_map(|(color, rarities)| {
          rarities.iter().flat_map(move |(rarity, cards)| {
            cards.values().map(move |card| (*color, *rarity, card))
          })
        })
    }

    pub fn len(&self) -> usize
    {   self.sections.values()
          .flat_map(|r| r.values())
          .map(|cards| cards.len())
          .sum()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }

    /// Catalog slots that have no card yet, in catalog order
    pub fn missing_slots(&self, catalog: &Catalog) -> Vec<String>
    {   catalog.slots()
          .filter(|slot| self.get(slot.color, slot.rarity, &slot.id).is_none())
          .map(|slot| slot.id.clone())
          .collect()
    }
}
