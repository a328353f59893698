//! Batch orchestration: catalog -> batches -> provider calls ->
//! reconciled cards -> complete set.
//!
//! Batches run strictly one after another on a single fallback client,
//! so the model cursor and the order of emitted cards are
//! deterministic. A run either returns a set with exactly one card per
//! requested slot or fails without returning anything.

use std::collections::{HashMap, HashSet};
use std::time::Instant;
use log::{debug, info, error};
use tokio_util::sync::CancellationToken;

use crate::card::GeneratedCard;
use crate::catalog::{Catalog, SlotRequest, SlotSpec};
use crate::client::FallbackClient;
use crate::complete_set::CompleteSet;
use crate::config::GenerationConfig;
use crate::error::Error;
use crate::notify::{GenerationEvent, NotificationSink};
use crate::parser::{parse_batch, parse_single_card};
use crate::prompt::{build_batch_prompt, build_prompt, PromptTemperatures};
use crate::providers::ChatProvider;

pub const STANDARD_BATCH_SIZE: usize = 15;
pub const LARGE_BATCH_SIZE: usize = 25;

/// Batch size presets; the algorithm is identical for both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode
{   Standard
  , Large
}

impl BatchMode
{   pub fn batch_size(&self, config: &GenerationConfig) -> usize
    {   match self
        {   BatchMode::Standard => config.standard_batch_size
          , BatchMode::Large => config.large_batch_size
        }
    }
}

/// Slots sent together in one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct Batch
{   /// 1-based position in the run
    pub number: usize
  , pub requests: Vec<SlotRequest>
}

impl Batch
{   pub fn slot_ids(&self) -> Vec<&str>
    {   self.requests.iter().map(|r| r.id()).collect()
    }
}

/// Split requests, in order, into non-empty batches of at most
/// `max_size`.
pub fn partition(
  requests: Vec<SlotRequest>
, max_size: usize
) -> Result<Vec<Batch>, Error>
{   if max_size == 0
    {   return Err(Error::InvalidRequest(
          "batch size must be greater than zero".to_string()
        ));
    }
    let mut batches = Vec::with_capacity(requests.len().div_ceil(max_size));
    let mut current = Vec::with_capacity(max_size);
    for request in requests
    {   current.push(request);
        if current.len() == max_size
        {   batches.push(Batch
            {   number: batches.len() + 1
              , requests: std::mem::take(&mut current)
            });
        }
    }
    if !current.is_empty()
    {   batches.push(Batch
        {   number: batches.len() + 1
          , requests: current
        });
    }
    Ok(batches)
}

/// Match returned cards to the batch's requests by `slot_id`.
///
/// Duplicate ids and ids outside the batch are `SlotMismatch`; any
/// request left without a card is `IncompleteBatch` naming every
/// missing slot. On success the pairs come back in request order.
pub fn reconcile(
  batch: &Batch
, cards: Vec<GeneratedCard>
) -> Result<Vec<(SlotRequest, GeneratedCard)>, Error>
{   let expected: HashSet<&str> = batch.requests.iter()
      .map(|r| r.id())
      .collect();

    let mut by_slot: HashMap<String, GeneratedCard> = HashMap::new();
    for card in cards
    {   if !expected.contains(card.slot_id.as_str())
        {   return Err(Error::SlotMismatch(format!(
              "card for slot {} does not belong to batch {}",
              card.slot_id, batch.number
            )));
        }
        if by_slot.contains_key(&card.slot_id)
        {   return Err(Error::SlotMismatch(format!(
              "slot {} answered more than once in batch {}",
              card.slot_id, batch.number
            )));
        }
        by_slot.insert(card.slot_id.clone(), card);
    }

    let missing: Vec<String> = batch.requests.iter()
      .filter(|r| !by_slot.contains_key(r.id()))
      .map(|r| r.id().to_string())
      .collect();
    if !missing.is_empty()
    {   error!(
          "Batch {} generated {}/{} cards, missing slots: {:?}",
          batch.number,
          by_slot.len(),
          batch.requests.len(),
          missing
        );
        return Err(Error::IncompleteBatch { missing });
    }

    Ok(batch.requests.iter()
      .filter_map(|r| {
        by_slot.remove(r.id()).map(|card| (r.clone(), card))
      })
      .collect())
}

/// Drives one fallback client through single-card and set runs
pub struct Orchestrator<P: ChatProvider>
{   client: FallbackClient<P>
  , sink: NotificationSink
  , config: GenerationConfig
  , cancel: CancellationToken
}

impl<P: ChatProvider> Orchestrator<P>
{   pub fn new(client: FallbackClient<P>, sink: NotificationSink) -> Self
    {   Orchestrator
        {   client
          , sink
          , config: GenerationConfig::default()
          , cancel: CancellationToken::new()
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self
    {   self.config = config;
        self
    }

    /// Token checked before every batch
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self
    {   self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &FallbackClient<P>
    {   &self.client
    }

    pub fn into_client(self) -> FallbackClient<P>
    {   self.client
    }

    /// Full set in `Standard` mode
    pub async fn generate_set(
      &mut self
    , theme: &str
    , catalog: &Catalog
    ) -> Result<CompleteSet, Error>
    {   self.generate_set_in_mode(theme, catalog, BatchMode::Standard).await
    }

    pub async fn generate_set_in_mode(
      &mut self
    , theme: &str
    , catalog: &Catalog
    , mode: BatchMode
    ) -> Result<CompleteSet, Error>
    {   let batch_size = mode.batch_size(&self.config);
        self.generate_set_batch(theme, catalog, batch_size).await
    }

    /// Generate every slot of `catalog` in batches of `batch_size`.
    pub async fn generate_set_batch(
      &mut self
    , theme: &str
    , catalog: &Catalog
    , batch_size: usize
    ) -> Result<CompleteSet, Error>
    {   let theme = validate_theme(theme)?;
        let requests = catalog.flatten(theme);
        if requests.is_empty()
        {   return Err(Error::InvalidRequest(
              "catalog subset contains no slots".to_string()
            ));
        }

        let total_cards = requests.len();
        let batches = partition(requests, batch_size)?;
        let total_batches = batches.len();
        let started = Instant::now();
        info!(
          "Generating {} cards for theme '{}' in {} batches of up to {}",
          total_cards, theme, total_batches, batch_size
        );
        self.sink.publish(GenerationEvent::Status
        {   message: "Starting generation...".to_string()
          , theme: theme.to_string()
          , total_slots: total_cards
        });

        let mut set = CompleteSet::shaped_like(catalog);
        for batch in &batches
        {   if self.cancel.is_cancelled()
            {   info!(
                  "Generation cancelled before batch {}/{}",
                  batch.number, total_batches
                );
                return Err(Error::Cancelled);
            }
            info!(
              "Processing batch {}/{} ({} cards in one request)",
              batch.number, total_batches, batch.requests.len()
            );
            let reconciled = self.run_batch(theme, batch).await?;
            for (request, card) in reconciled
            {   self.sink.publish(GenerationEvent::card(
                  request.spec.color,
                  request.spec.rarity,
                  &card
                ));
                set.insert(request.spec.color, request.spec.rarity, card);
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        info!(
          "Completed set for '{}' in {:.2}s ({} cards)",
          theme, elapsed, total_cards
        );
        debug_assert!(set.missing_slots(catalog).is_empty());
        Ok(set)
    }

    /// One batch: array prompt, provider call, parse, reconcile
    pub async fn run_batch(
      &mut self
    , theme: &str
    , batch: &Batch
    ) -> Result<Vec<(SlotRequest, GeneratedCard)>, Error>
    {   let started = Instant::now();
        for (i, request) in batch.requests.iter().enumerate()
        {   debug!(
              "  Batch card {}: {} ({} {})",
              i + 1,
              request.id(),
              request.spec.color,
              request.spec.rarity
            );
        }

        let payload = build_batch_prompt(
          theme,
          &batch.requests,
          PromptTemperatures::from(&self.config)
        )?;
        let reply = self.client.complete(&payload).await
          .map_err(|e| {
            error!("Batch {} failed: {}", batch.number, e);
            e
          })?;

        let cards = parse_batch(&reply.text, &batch.requests)?;
        let reconciled = reconcile(batch, cards)?;

        info!(
          "Batch {} produced {} cards with {} in {:.2}s",
          batch.number,
          reconciled.len(),
          reply.model,
          started.elapsed().as_secs_f64()
        );
        Ok(reconciled)
    }

    /// One slot, one object-shaped request, emitted once on success
    pub async fn generate_single_card(
      &mut self
    , theme: &str
    , mut spec: SlotSpec
    ) -> Result<GeneratedCard, Error>
    {   let theme = validate_theme(theme)?;
        spec.id = spec.id.trim().to_string();
        if spec.id.is_empty()
        {   return Err(Error::InvalidRequest("slot_id is required".to_string()));
        }
        if self.cancel.is_cancelled()
        {   return Err(Error::Cancelled);
        }

        let started = Instant::now();
        info!(
          "Starting card generation for slot {} - {} {} with theme '{}'",
          spec.id, spec.color, spec.rarity, theme
        );
        let (color, rarity) = (spec.color, spec.rarity);
        let request = SlotRequest::new(spec, theme);
        let payload = build_prompt(
          theme,
          std::slice::from_ref(&request),
          PromptTemperatures::from(&self.config)
        )?;

        let card = match self.client.complete(&payload).await
          .and_then(|reply| parse_single_card(&reply.text, &request))
        {   Ok(card) => card
          , Err(e) => {
              error!(
                "Failed to generate card for slot {} after {:.2}s: {}",
                request.id(),
                started.elapsed().as_secs_f64(),
                e
              );
              return Err(e);
            }
        };

        info!(
          "Generated card '{}' for slot {} in {:.2}s",
          card.name,
          card.slot_id,
          started.elapsed().as_secs_f64()
        );
        self.sink.publish(GenerationEvent::card(color, rarity, &card));
        Ok(card)
    }
}

fn validate_theme(theme: &str) -> Result<&str, Error>
{   let theme = theme.trim();
    if theme.is_empty()
    {   return Err(Error::InvalidRequest("theme is required".to_string()));
    }
    Ok(theme)
}
