mod common;

use serde_json::json;
use setforge::catalog::SlotRequest;
use setforge::parser::{extract_json, parse_batch, parse_single_card};
use setforge::request::Shape;
use setforge::{Error, GeneratedCard, Rarity};

#[test]
fn test_prose_wrapped_object()
{   let raw = "Sure! Here is your card:\n{\"name\": \"Glint\", \"type\": \"Instant\"}\nHope you like it.";
    let value = extract_json(raw, Shape::Object).unwrap();
    assert_eq!(value["name"], "Glint");
}

#[test]
fn test_markdown_fenced_array()
{   let raw = "```json\n[{\"a\": 1}, {\"b\": [2, 3]}]\n```";
    let value = extract_json(raw, Shape::Array).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);
}

#[test]
fn test_no_delimiters_is_no_payload()
{   let result = extract_json("I cannot help with that.", Shape::Object);
    assert_eq!(result, Err(Error::NoPayloadFound { expected: Shape::Object }));

    let result = extract_json("no list here", Shape::Array);
    assert_eq!(result, Err(Error::NoPayloadFound { expected: Shape::Array }));
}

#[test]
fn test_unbalanced_json_is_malformed()
{   let result = extract_json("{\"name\": \"Glint\", }", Shape::Object);
    assert!(matches!(result, Err(Error::MalformedPayload(_))));

    let result = extract_json("} before {", Shape::Object);
    assert!(matches!(result, Err(Error::MalformedPayload(_))));
}

#[test]
fn test_object_wrapping_array_is_shape_mismatch()
{   let raw = "{\"cards\": [{\"name\": \"A\"}, {\"name\": \"B\"}]}";
    let result = extract_json(raw, Shape::Array);
    assert!(matches!(
      result,
      Err(Error::ShapeMismatch { expected: Shape::Array, .. })
    ));
}

#[test]
fn test_array_wrapping_object_is_shape_mismatch()
{   let raw = "[{\"name\": \"A\"}, {\"name\": \"B\"}]";
    let result = extract_json(raw, Shape::Object);
    assert!(matches!(
      result,
      Err(Error::ShapeMismatch { expected: Shape::Object, .. })
    ));
}

#[test]
fn test_brackets_inside_object_strings_are_fine()
{   let raw = "{\"name\": \"Sigil\", \"type\": \"Enchantment\", \"rules_text\": \"Choose one [or both]\"}";
    let value = extract_json(raw, Shape::Object).unwrap();
    assert_eq!(value["rules_text"], "Choose one [or both]");
}

#[test]
fn test_single_card_keeps_requested_slot()
{   let request = SlotRequest::new(common::colorless_slot("C-C-07"), "clockwork");
    let raw = format!(
      "Here you go: {}",
      common::artifact_json("WRONG-ID", "Cog Lantern")
    );
    let card = parse_single_card(&raw, &request).unwrap();
    assert_eq!(card.slot_id, "C-C-07");
    assert_eq!(card.generated_for_theme, "clockwork");
    assert_eq!(card.power, None);
    assert_eq!(card.toughness, None);
}

#[test]
fn test_creature_requires_integral_stats()
{   let bad = json!({
      "name": "Half Golem",
      "type": "Artifact Creature — Golem",
      "power": 1.5,
      "toughness": 2
    });
    let result = GeneratedCard::from_value(&bad, "C-C-01", Rarity::Common, "t");
    assert!(matches!(result, Err(Error::MalformedPayload(_))));

    let missing = json!({ "name": "Statless", "type": "Creature — Elf" });
    let result = GeneratedCard::from_value(&missing, "C-C-01", Rarity::Common, "t");
    assert!(matches!(result, Err(Error::MalformedPayload(_))));

    let stringy = json!({
      "name": "Old Golem",
      "type": "Artifact Creature — Golem",
      "power": "3",
      "toughness": 3.0
    });
    let card = GeneratedCard::from_value(&stringy, "C-C-01", Rarity::Common, "t")
      .unwrap();
    assert_eq!((card.power, card.toughness), (Some(3), Some(3)));
}

#[test]
fn test_non_creature_drops_stats()
{   let value = json!({
      "name": "Shock",
      "type": "Instant",
      "power": 9,
      "toughness": 9
    });
    let card = GeneratedCard::from_value(&value, "R-C-01", Rarity::Common, "t")
      .unwrap();
    assert_eq!(card.power, None);
    assert_eq!(card.toughness, None);
    assert_eq!(card.rarity, "Common");
}

#[test]
fn test_missing_name_is_malformed()
{   let value = json!({ "type": "Instant" });
    let result = GeneratedCard::from_value(&value, "R-C-01", Rarity::Common, "t");
    assert!(matches!(result, Err(Error::MalformedPayload(_))));
}

#[test]
fn test_batch_assigns_missing_slot_ids_by_position()
{   let catalog = common::small_catalog();
    let requests = catalog.flatten("dawn");

    let mut second = common::creature_json("ignored", "Dawn Squire");
    second.as_object_mut().unwrap().remove("slot_id");
    let raw = common::batch_reply(&[
      common::creature_json("W-C-01", "Dawn Sentry"),
      second,
      common::creature_json("W-C-03", "Dawn Skyrider"),
    ]);

    let cards = parse_batch(&raw, &requests).unwrap();
    let ids: Vec<&str> = cards.iter().map(|c| c.slot_id.as_str()).collect();
    assert_eq!(ids, vec!["W-C-01", "W-C-02", "W-C-03"]);
    assert!(cards.iter().all(|c| c.generated_for_theme == "dawn"));
}

#[test]
fn test_batch_drops_untagged_extras_and_non_objects()
{   let catalog = common::small_catalog();
    let requests = catalog.flatten("dawn");

    let mut extra = common::creature_json("x", "Extra");
    extra.as_object_mut().unwrap().remove("slot_id");
    let raw = common::batch_reply(&[
      common::creature_json("W-C-01", "One"),
      json!("not a card"),
      common::creature_json("W-C-02", "Two"),
      extra,
    ]);

    let cards = parse_batch(&raw, &requests).unwrap();
    assert_eq!(cards.len(), 2);
}

#[test]
fn test_batch_keeps_foreign_ids_for_reconciliation()
{   let catalog = common::small_catalog();
    let requests = catalog.flatten("dawn");
    let raw = common::batch_reply(&[common::creature_json("Z-Z-99", "Stray")]);

    let cards = parse_batch(&raw, &requests).unwrap();
    assert_eq!(cards[0].slot_id, "Z-Z-99");
}
