//! Serializers for a finished set: JSON, CSV and Cockatrice XML.

use std::io::Cursor;
use std::str::FromStr;
use chrono::{Local, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use serde_json::Value;

use crate::card::GeneratedCard;
use crate::complete_set::CompleteSet;
use crate::error::Error;
use crate::{Color, Rarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat
{   Json
  , Csv
  , Cockatrice
}

impl ExportFormat
{   pub fn extension(&self) -> &'static str
    {   match self
        {   ExportFormat::Json => "json"
          , ExportFormat::Csv => "csv"
          , ExportFormat::Cockatrice => "xml"
        }
    }

    /// Render `set`; `set_name` is only used by Cockatrice
    pub fn render(
      &self
    , set: &CompleteSet
    , theme: &str
    , set_name: &str
    , metadata: Option<&Value>
    ) -> Result<String, Error>
    {   match self
        {   ExportFormat::Json => to_json(set, theme, metadata)
          , ExportFormat::Csv => to_csv(set)
          , ExportFormat::Cockatrice => to_cockatrice(set, set_name)
        }
    }
}

impl FromStr for ExportFormat
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "json" => Ok(ExportFormat::Json)
          , "csv" => Ok(ExportFormat::Csv)
          , "cockatrice" | "xml" => Ok(ExportFormat::Cockatrice)
          , other => Err(Error::InvalidRequest(format!(
              "unsupported export format '{}', use json, csv or cockatrice",
              other
            )))
        }
    }
}

/// A card with its set position, flattened for export
#[derive(Debug, Serialize)]
struct FlatCard<'a>
{   slot_id: &'a str
  , color: Color
  , rarity: Rarity
  , name: &'a str
  , mana_cost: &'a str
  , #[serde(rename = "type")]
    type_line: &'a str
  , #[serde(skip_serializing_if = "Option::is_none")]
    power: Option<i32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    toughness: Option<i32>
  , rules_text: &'a str
  , flavor_text: &'a str
  , card_rarity: &'a str
  , generated_for_theme: &'a str
}

#[derive(Debug, Serialize)]
struct JsonExport<'a>
{   theme: &'a str
  , created_at: String
  , metadata: Value
  , total_cards: usize
  , cards: Vec<FlatCard<'a>>
}

/// Header order is fixed; empty power/toughness for non-creatures
#[derive(Debug, Serialize)]
struct CsvRow<'a>
{   slot_id: &'a str
  , color: Color
  , rarity: Rarity
  , name: &'a str
  , mana_cost: &'a str
  , #[serde(rename = "type")]
    type_line: &'a str
  , power: Option<i32>
  , toughness: Option<i32>
  , rules_text: &'a str
  , flavor_text: &'a str
}

pub fn to_json(
  set: &CompleteSet
, theme: &str
, metadata: Option<&Value>
) -> Result<String, Error>
{   let cards: Vec<FlatCard> = set.cards()
      .map(|(color, rarity, card)| FlatCard
      {   slot_id: &card.slot_id
        , color
        , rarity
        , name: &card.name
        , mana_cost: &card.mana_cost
        , type_line: &card.type_line
        , power: card.power
        , toughness: card.toughness
        , rules_text: &card.rules_text
        , flavor_text: &card.flavor_text
        , card_rarity: &card.rarity
        , generated_for_theme: &card.generated_for_theme
      })
      .collect();

    let export = JsonExport
    {   theme
      , created_at: Utc::now().to_rfc3339()
      , metadata: metadata.cloned().unwrap_or_else(|| Value::Object(Default::default()))
      , total_cards: cards.len()
      , cards
    };
    serde_json::to_string_pretty(&export)
      .map_err(|e| Error::Export(e.to_string()))
}

pub fn to_csv(set: &CompleteSet) -> Result<String, Error>
{   let mut writer = csv::Writer::from_writer(vec![]);
    for (color, rarity, card) in set.cards()
    {   writer.serialize(CsvRow
        {   slot_id: &card.slot_id
          , color
          , rarity
          , name: &card.name
          , mana_cost: &card.mana_cost
          , type_line: &card.type_line
          , power: card.power
          , toughness: card.toughness
          , rules_text: &card.rules_text
          , flavor_text: &card.flavor_text
        })
        .map_err(|e| Error::Export(e.to_string()))?;
    }
    if set.is_empty()
    {   writer.write_record([
          "slot_id", "color", "rarity", "name", "mana_cost", "type",
          "power", "toughness", "rules_text", "flavor_text"
        ])
        .map_err(|e| Error::Export(e.to_string()))?;
    }
    let bytes = writer.into_inner()
      .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

/// Cockatrice card database (version 4) holding one custom set
pub fn to_cockatrice(set: &CompleteSet, set_name: &str) -> Result<String, Error>
{   let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("cockatrice_carddatabase");
    root.push_attribute(("version", "4"));
    write(&mut writer, Event::Start(root))?;

    start(&mut writer, "sets")?;
    start(&mut writer, "set")?;
    text_element(&mut writer, "name", set_name)?;
    text_element(&mut writer, "longname", &format!("{} Set", set_name))?;
    text_element(&mut writer, "settype", "Custom")?;
    text_element(
      &mut writer,
      "releasedate",
      &Local::now().format("%Y-%m-%d").to_string()
    )?;
    end(&mut writer, "set")?;
    end(&mut writer, "sets")?;

    start(&mut writer, "cards")?;
    for (_, rarity, card) in set.cards()
    {   write_card(&mut writer, card, rarity, set_name)?;
    }
    end(&mut writer, "cards")?;
    end(&mut writer, "cockatrice_carddatabase")?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

fn write_card(
  writer: &mut Writer<Cursor<Vec<u8>>>
, card: &GeneratedCard
, section_rarity: Rarity
, set_name: &str
) -> Result<(), Error>
{   start(writer, "card")?;
    text_element(writer, "name", &card.name)?;
    text_element(writer, "set", set_name)?;
    text_element(writer, "color", &color_identity(&card.mana_cost))?;
    text_element(writer, "manacost", &card.mana_cost)?;
    text_element(writer, "type", &card.type_line)?;
    text_element(writer, "text", &card.rules_text)?;
    if let (Some(power), Some(toughness)) = (card.power, card.toughness)
    {   text_element(writer, "pt", &format!("{}/{}", power, toughness))?;
    }
    let rarity = Rarity::from_key(&card.rarity.replace(' ', "_"))
      .unwrap_or(section_rarity);
    text_element(writer, "rarity", rarity.as_str())?;
    end(writer, "card")
}

/// WUBRG letters present in a mana cost, in that order
pub fn color_identity(mana_cost: &str) -> String
{   ['W', 'U', 'B', 'R', 'G'].iter()
      .filter(|c| mana_cost.contains(**c))
      .collect()
}

fn write(
  writer: &mut Writer<Cursor<Vec<u8>>>
, event: Event<'_>
) -> Result<(), Error>
{   writer.write_event(event)
      .map_err(|e| Error::Export(e.to_string()))
}

fn start(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> Result<(), Error>
{   write(writer, Event::Start(BytesStart::new(name)))
}

fn end(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> Result<(), Error>
{   write(writer, Event::End(BytesEnd::new(name)))
}

fn text_element(
  writer: &mut Writer<Cursor<Vec<u8>>>
, name: &str
, text: &str
) -> Result<(), Error>
{   start(writer, name)?;
    write(writer, Event::Text(BytesText::new(text)))?;
    end(writer, name)
}
