mod common;

use common::{
  artifact_json, batch_reply, creature_json, models, quota_failure,
  ScriptedProvider
};
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use setforge::catalog::{Catalog, SlotRequest};
use setforge::orchestrator::{partition, reconcile, Batch};
use setforge::providers::ChatProvider;
use setforge::request::{ProviderFailure, ProviderPayload, Shape};
use setforge::{
  BatchMode, Color, Error, FallbackClient, GenerationEvent,
  NotificationSink, Orchestrator, Rarity
};

fn orchestrator(
  replies: Vec<Result<String, setforge::request::ProviderFailure>>
, sink: NotificationSink
) -> Orchestrator<ScriptedProvider>
{   let client = FallbackClient::with_models(
      ScriptedProvider::new(replies),
      models(&["m1", "m2"])
    ).unwrap();
    Orchestrator::new(client, sink)
}

/// Cancels its token once the first reply has been handed back
struct CancelAfterFirst
{   inner: ScriptedProvider
  , cancel: CancellationToken
}

#[async_trait]
impl ChatProvider for CancelAfterFirst
{   fn name(&self) -> &str
    {   "cancel-after-first"
    }

    async fn complete(
      &self
    , model: &str
    , payload: &ProviderPayload
    ) -> Result<String, ProviderFailure>
    {   let reply = self.inner.complete(model, payload).await;
        self.cancel.cancel();
        reply
    }
}

fn drain(
  rx: &mut tokio::sync::mpsc::UnboundedReceiver<GenerationEvent>
) -> Vec<GenerationEvent>
{   let mut events = vec![];
    while let Ok(event) = rx.try_recv()
    {   events.push(event);
    }
    events
}

#[tokio::test]
async fn test_three_slots_in_batches_of_two()
{   let catalog = common::small_catalog();
    let (sink, mut rx) = NotificationSink::channel();
    let mut orchestrator = orchestrator(vec![
      Ok(batch_reply(&[
        creature_json("W-C-01", "Dawn Sentry"),
        creature_json("W-C-02", "Dawn Squire"),
      ]))
    , Ok(batch_reply(&[creature_json("W-C-03", "Dawn Skyrider")]))
    ], sink);

    let set = orchestrator.generate_set_batch("dawn", &catalog, 2)
      .await
      .unwrap();

    assert_eq!(set.len(), 3);
    assert!(set.missing_slots(&catalog).is_empty());
    assert_eq!(
      set.get(Color::White, Rarity::Common, "W-C-03").unwrap().name,
      "Dawn Skyrider"
    );

    let provider = orchestrator.client().provider();
    assert_eq!(provider.call_count(), 2);
    assert!(provider.payloads().iter().all(|p| p.expected_shape == Shape::Array));

    let emitted: Vec<String> = drain(&mut rx).into_iter()
      .filter_map(|e| match e
      {   GenerationEvent::Card { slot_id, .. } => Some(slot_id)
        , _ => None
      })
      .collect();
    assert_eq!(emitted, vec!["W-C-01", "W-C-02", "W-C-03"]);
}

#[tokio::test]
async fn test_empty_second_batch_is_incomplete()
{   let catalog = common::small_catalog();
    let (sink, mut rx) = NotificationSink::channel();
    let mut orchestrator = orchestrator(vec![
      Ok(batch_reply(&[
        creature_json("W-C-01", "Dawn Sentry"),
        creature_json("W-C-02", "Dawn Squire"),
      ]))
    , Ok("[]".to_string())
    ], sink);

    let result = orchestrator.generate_set_batch("dawn", &catalog, 2).await;
    assert_eq!(
      result,
      Err(Error::IncompleteBatch { missing: vec!["W-C-03".to_string()] })
    );

    // the first batch was reconciled before the failure
    let cards = drain(&mut rx).into_iter()
      .filter(|e| matches!(e, GenerationEvent::Card { .. }))
      .count();
    assert_eq!(cards, 2);
}

#[tokio::test]
async fn test_duplicate_slot_in_batch_is_mismatch()
{   let catalog = common::small_catalog();
    let mut orchestrator = orchestrator(vec![
      Ok(batch_reply(&[
        creature_json("W-C-01", "One"),
        creature_json("W-C-01", "Again"),
        creature_json("W-C-03", "Three"),
      ]))
    ], NotificationSink::disabled());

    let result = orchestrator.generate_set("dawn", &catalog).await;
    assert!(matches!(result, Err(Error::SlotMismatch(_))));
}

#[tokio::test]
async fn test_foreign_slot_in_batch_is_mismatch()
{   let catalog = common::small_catalog();
    let mut orchestrator = orchestrator(vec![
      Ok(batch_reply(&[
        creature_json("W-C-01", "One"),
        creature_json("W-C-02", "Two"),
        creature_json("B-C-09", "Intruder"),
      ]))
    ], NotificationSink::disabled());

    let result = orchestrator.generate_set("dawn", &catalog).await;
    assert!(matches!(result, Err(Error::SlotMismatch(_))));
}

#[tokio::test]
async fn test_fallback_state_carries_across_batches()
{   let catalog = common::small_catalog();
    let mut orchestrator = orchestrator(vec![
      Err(quota_failure())
    , Ok(batch_reply(&[creature_json("W-C-01", "One")]))
    , Ok(batch_reply(&[creature_json("W-C-02", "Two")]))
    , Ok(batch_reply(&[creature_json("W-C-03", "Three")]))
    ], NotificationSink::disabled());

    let set = orchestrator.generate_set_batch("dawn", &catalog, 1)
      .await
      .unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(
      orchestrator.client().provider().models_called(),
      vec!["m1", "m2", "m2", "m2"]
    );
}

#[tokio::test]
async fn test_quota_exhaustion_aborts_run()
{   let catalog = common::small_catalog();
    let mut orchestrator = orchestrator(vec![
      Err(quota_failure())
    , Err(quota_failure())
    ], NotificationSink::disabled());

    let result = orchestrator.generate_set("dawn", &catalog).await;
    assert!(matches!(result, Err(Error::QuotaExceeded { .. })));
}

#[tokio::test]
async fn test_cancelled_before_first_batch()
{   let catalog = common::small_catalog();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut orchestrator = orchestrator(vec![], NotificationSink::disabled())
      .with_cancellation(cancel);

    let result = orchestrator.generate_set("dawn", &catalog).await;
    assert_eq!(result, Err(Error::Cancelled));
    assert_eq!(orchestrator.client().provider().call_count(), 0);
}

#[tokio::test]
async fn test_cancelled_between_batches()
{   let catalog = common::small_catalog();
    let (sink, mut rx) = NotificationSink::channel();
    let cancel = CancellationToken::new();
    let provider = CancelAfterFirst
    {   inner: ScriptedProvider::new(vec![
          Ok(batch_reply(&[
            creature_json("W-C-01", "One"),
            creature_json("W-C-02", "Two"),
          ]))
        , Ok(batch_reply(&[creature_json("W-C-03", "Three")]))
        ])
      , cancel: cancel.clone()
    };
    let client = FallbackClient::with_models(provider, models(&["m1"]))
      .unwrap();
    let mut orchestrator = Orchestrator::new(client, sink)
      .with_cancellation(cancel);

    let result = orchestrator.generate_set_batch("dawn", &catalog, 2).await;
    assert_eq!(result, Err(Error::Cancelled));
    assert_eq!(orchestrator.client().provider().inner.call_count(), 1);

    // the in-flight batch still lands
    let cards = drain(&mut rx).into_iter()
      .filter(|e| matches!(e, GenerationEvent::Card { .. }))
      .count();
    assert_eq!(cards, 2);
}

#[tokio::test]
async fn test_padded_slot_id_round_trips()
{   let catalog = Catalog::from_value(&json!({
      "white": {
        "rare": {
          "creatures": [
            { "id": "W-R-01 ", "description": "Legendary angel" }
          ]
        }
      }
    })).unwrap();
    assert!(catalog.slot("W-R-01").is_some());

    let mut orchestrator = orchestrator(vec![
      Ok(batch_reply(&[creature_json("W-R-01 ", "Dawn Seraph")]))
    ], NotificationSink::disabled());

    let set = orchestrator.generate_set_batch("dawn", &catalog, 1)
      .await
      .unwrap();
    assert_eq!(
      set.get(Color::White, Rarity::Rare, "W-R-01").unwrap().name,
      "Dawn Seraph"
    );
    assert!(orchestrator.client().provider().payloads()[0]
      .user
      .contains("Slot ID: W-R-01\n"));
}

#[tokio::test]
async fn test_single_card_trims_slot_id()
{   let mut orchestrator = orchestrator(vec![
      Ok(artifact_json("C-C-01 ", "Cog Lantern").to_string())
    ], NotificationSink::disabled());

    let card = orchestrator
      .generate_single_card("clockwork", common::colorless_slot(" C-C-01 "))
      .await
      .unwrap();
    assert_eq!(card.slot_id, "C-C-01");
}

#[tokio::test]
async fn test_empty_inputs_rejected()
{   let catalog = common::small_catalog();
    let mut orchestrator = orchestrator(vec![], NotificationSink::disabled());

    let result = orchestrator.generate_set("  ", &catalog).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));

    let empty = catalog.subset(&[Color::Red], &[Rarity::Common]);
    let result = orchestrator.generate_set("dawn", &empty).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));

    let result = orchestrator.generate_set_batch("dawn", &catalog, 0).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
    assert_eq!(orchestrator.client().provider().call_count(), 0);
}

#[tokio::test]
async fn test_single_card_uses_object_prompt()
{   let (sink, mut rx) = NotificationSink::channel();
    let mut orchestrator = orchestrator(vec![
      Ok(format!("Here it is:\n{}", artifact_json("C-C-01", "Cog Lantern")))
    ], sink);

    let card = orchestrator
      .generate_single_card("clockwork", common::colorless_slot("C-C-01"))
      .await
      .unwrap();
    assert_eq!(card.name, "Cog Lantern");
    assert_eq!(card.power, None);
    assert_eq!(card.toughness, None);

    let payloads = orchestrator.client().provider().payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].expected_shape, Shape::Object);
    assert!(payloads[0].user.contains("colorless"));

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_single_colorless_creature_keeps_stats()
{   let (sink, mut rx) = NotificationSink::channel();
    let golem = json!({
      "slot_id": "C-C-02",
      "name": "Brass Golem",
      "mana_cost": "4",
      "type": "Artifact Creature — Golem",
      "power": 3,
      "toughness": "4",
      "rules_text": "Ward {2}",
      "flavor_text": "Wound once, walks forever.",
      "rarity": "Common"
    });
    let mut orchestrator = orchestrator(vec![
      Ok(format!("Sure!\n{}", golem))
    ], sink);

    let card = orchestrator
      .generate_single_card("clockwork", common::colorless_slot("C-C-02"))
      .await
      .unwrap();
    assert!(card.is_creature());
    assert_eq!((card.power, card.toughness), (Some(3), Some(4)));
    assert_eq!(card.slot_id, "C-C-02");

    let events = drain(&mut rx);
    assert!(matches!(
      events.as_slice(),
      [GenerationEvent::Card { color: Color::Colorless, rarity: Rarity::Common, .. }]
    ));
}

#[tokio::test]
async fn test_single_card_failure_emits_nothing()
{   let (sink, mut rx) = NotificationSink::channel();
    let mut orchestrator = orchestrator(vec![
      Ok("I'm sorry, I can't do that.".to_string())
    ], sink);

    let result = orchestrator
      .generate_single_card("clockwork", common::colorless_slot("C-C-01"))
      .await;
    assert!(matches!(result, Err(Error::NoPayloadFound { .. })));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_large_mode_fits_in_one_batch()
{   let catalog = common::fixture_catalog();
    let requests = catalog.flatten("t");
    let cards: Vec<_> = requests.iter()
      .map(|r| artifact_json(r.id(), "Filler"))
      .collect();
    let mut orchestrator = orchestrator(
      vec![Ok(batch_reply(&cards))],
      NotificationSink::disabled()
    );

    let set = orchestrator
      .generate_set_in_mode("t", &catalog, BatchMode::Large)
      .await
      .unwrap();
    assert_eq!(set.len(), catalog.total_slots());
    assert_eq!(orchestrator.client().provider().call_count(), 1);
}

#[test]
fn test_reconcile_returns_request_order()
{   let catalog = common::small_catalog();
    let batch = Batch
    {   number: 1
      , requests: catalog.flatten("t")
    };
    let cards = vec![
      setforge::GeneratedCard::from_value(
        &creature_json("W-C-03", "C"), "W-C-03", Rarity::Common, "t"
      ).unwrap()
    , setforge::GeneratedCard::from_value(
        &creature_json("W-C-01", "A"), "W-C-01", Rarity::Common, "t"
      ).unwrap()
    , setforge::GeneratedCard::from_value(
        &creature_json("W-C-02", "B"), "W-C-02", Rarity::Common, "t"
      ).unwrap()
    ];
    let ids: Vec<String> = reconcile(&batch, cards).unwrap()
      .into_iter()
      .map(|(request, _)| request.id().to_string())
      .collect();
    assert_eq!(ids, vec!["W-C-01", "W-C-02", "W-C-03"]);
}

fn requests(count: usize) -> Vec<SlotRequest>
{   (0..count)
      .map(|i| SlotRequest::new(
        common::colorless_slot(&format!("S-{:03}", i)),
        "t"
      ))
      .collect()
}

proptest! {
    #[test]
    fn prop_partition_covers_every_slot_once(count in 1usize..80, size in 1usize..30)
    {   let batches = partition(requests(count), size).unwrap();

        prop_assert_eq!(batches.len(), (count + size - 1) / size);
        prop_assert!(batches.iter().all(|b| !b.requests.is_empty() && b.requests.len() <= size));

        let ids: Vec<String> = batches.iter()
          .flat_map(|b| b.requests.iter().map(|r| r.id().to_string()))
          .collect();
        let expected: Vec<String> = (0..count).map(|i| format!("S-{:03}", i)).collect();
        prop_assert_eq!(ids, expected);
    }
}
