mod common;

use setforge::concept::SetConcept;
use setforge::config::ForgeConfig;
use setforge::prompt::{
  build_batch_prompt, build_concept_prompt, build_prompt, PromptTemperatures
};
use setforge::request::Shape;
use setforge::Error;

#[test]
fn test_single_slot_asks_for_object()
{   let requests = common::fixture_catalog().flatten("clockwork city");
    let payload = build_prompt(
      "clockwork city",
      &requests[..1],
      PromptTemperatures::default()
    ).unwrap();

    assert_eq!(payload.expected_shape, Shape::Object);
    assert_eq!(payload.temperature, 1.0);
    assert!(payload.user.contains("W-C-01"));
    assert!(payload.user.contains("clockwork city"));
    assert!(payload.user.contains("Efficient 2-drop"));
}

#[test]
fn test_batch_asks_for_exact_count()
{   let requests = common::fixture_catalog().flatten("clockwork city");
    let payload = build_prompt(
      "clockwork city",
      &requests[..4],
      PromptTemperatures::default()
    ).unwrap();

    assert_eq!(payload.expected_shape, Shape::Array);
    assert_eq!(payload.temperature, 0.9);
    assert!(payload.user.contains("exactly 4"));
    for request in &requests[..4]
    {   assert!(payload.user.contains(request.id()));
    }
    assert!(!payload.user.contains("U-C-01"));
    assert!(payload.user.contains("slot_id"));
}

#[test]
fn test_batch_prompt_of_one_is_still_an_array()
{   let requests = common::small_catalog().flatten("dawn");
    let payload = build_batch_prompt(
      "dawn",
      &requests[2..],
      PromptTemperatures::default()
    ).unwrap();
    assert_eq!(payload.expected_shape, Shape::Array);
    assert!(payload.user.contains("exactly 1"));
}

#[test]
fn test_zero_slots_rejected()
{   let result = build_prompt("dawn", &[], PromptTemperatures::default());
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    let result = build_batch_prompt("dawn", &[], PromptTemperatures::default());
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[test]
fn test_colorless_batch_mentions_generic_mana()
{   let requests = common::fixture_catalog().flatten("t");
    let colorless: Vec<_> = requests.into_iter()
      .filter(|r| r.id().starts_with("C-") || r.id().starts_with("L-"))
      .collect();
    let payload = build_prompt("t", &colorless, PromptTemperatures::default())
      .unwrap();
    assert!(payload.user.contains("generic mana costs only"));
}

#[test]
fn test_concept_prompt()
{   let payload = build_concept_prompt("  sky pirates ", 0.8).unwrap();
    assert_eq!(payload.expected_shape, Shape::Object);
    assert!(payload.user.contains("sky pirates"));
    assert!(payload.system.contains("exactly 10 archetypes"));

    assert!(matches!(
      build_concept_prompt("   ", 0.8),
      Err(Error::InvalidRequest(_))
    ));
}

#[test]
fn test_fallback_concept_covers_every_pair()
{   let concept = SetConcept::fallback("sunken  EMPIRE");
    assert_eq!(concept.name, "Sunken Empire Set");
    assert_eq!(concept.archetypes.len(), 10);
    assert!(concept.missing_pairs().is_empty());
    assert_eq!(concept.flavor_themes[0], "Sunken Empire");
    assert_eq!(concept.mechanics.len(), 5);
}

#[test]
fn test_concept_without_name_is_malformed()
{   let result = SetConcept::from_reply("{\"name\": \" \", \"archetypes\": []}");
    assert!(matches!(result, Err(Error::MalformedPayload(_))));
}

#[test]
fn test_config_defaults_and_overrides()
{   let config = ForgeConfig::from_json_str("{}").unwrap();
    assert_eq!(config.fallback.models[0], "gpt-4o-mini");
    assert_eq!(config.generation.standard_batch_size, 15);
    assert_eq!(config.generation.large_batch_size, 25);
    assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");

    let config = ForgeConfig::from_json_str(
      r#"{"fallback": {"models": ["a"]}, "generation": {"standard_batch_size": 5}}"#
    ).unwrap();
    assert_eq!(config.fallback.models, vec!["a"]);
    assert_eq!(config.generation.standard_batch_size, 5);
    assert_eq!(config.generation.large_batch_size, 25);
}

#[test]
fn test_config_validation()
{   let result = ForgeConfig::from_json_str(r#"{"fallback": {"models": []}}"#);
    assert!(matches!(result, Err(Error::Config(_))));

    let result = ForgeConfig::from_json_str(
      r#"{"generation": {"large_batch_size": 0}}"#
    );
    assert!(matches!(result, Err(Error::Config(_))));

    let result = ForgeConfig::from_json_str("not json");
    assert!(matches!(result, Err(Error::Config(_))));
}
