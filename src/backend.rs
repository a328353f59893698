use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use log::{debug, error, info, warn};

use crate::catalog::{Catalog, SlotSpec};
use crate::client::FallbackClient;
use crate::concept::{generate_set_concept, ConceptReply, SetConcept};
use crate::config::ForgeConfig;
use crate::error::Error;
use crate::notify::{GenerationEvent, NotificationSink};
use crate::orchestrator::Orchestrator;
use crate::providers::ChatProvider;
use crate::ForgeFoot;

/// Everything a command handler needs to build its own run
struct ForgeBackendState<P: ChatProvider>
{   provider: Arc<P>
  , config: ForgeConfig
  , cancel: CancellationToken
}

impl<P: ChatProvider> ForgeBackendState<P>
{   /// Fresh fallback chain per run
    fn client(&self) -> Result<FallbackClient<Arc<P>>, Error>
    {   FallbackClient::with_models(
          Arc::clone(&self.provider),
          self.config.fallback.models.clone()
        )
    }

    fn orchestrator(
      &self
    , sink: NotificationSink
    ) -> Result<Orchestrator<Arc<P>>, Error>
    {   Ok(Orchestrator::new(self.client()?, sink)
          .with_config(self.config.generation.clone())
          .with_cancellation(self.cancel.child_token()))
    }
}

/// Public API for the setforge backend - owns the task
pub struct ForgeBackend
{   hand: crate::ForgeHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl ForgeBackend
{   /// Create and spawn a new backend around `provider`.
    /// Returns immediately - spawns background task
    pub fn new<P>(provider: P, config: ForgeConfig) -> Self
    where P: ChatProvider + 'static
    {   debug!("Creating ForgeBackend over {}", provider.name());

        let (generate_single_card_tx, generate_single_card_rx)
          = mpsc::unbounded_channel();
        let (generate_full_set_tx, generate_full_set_rx)
          = mpsc::unbounded_channel();
        let (generate_set_batch_tx, generate_set_batch_rx)
          = mpsc::unbounded_channel();
        let (generate_set_stream_tx, generate_set_stream_rx)
          = mpsc::unbounded_channel();
        let (generate_set_concept_tx, generate_set_concept_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::ForgeHand
        {   generate_single_card_tx
          , generate_full_set_tx
          , generate_set_batch_tx
          , generate_set_stream_tx
          , generate_set_concept_tx
          , kill_process_tx
        };

        let foot = ForgeFoot
        {   generate_single_card_rx
          , generate_full_set_rx
          , generate_set_batch_rx
          , generate_set_stream_rx
          , generate_set_concept_rx
          , kill_process_rx
        };

        let state = ForgeBackendState
        {   provider: Arc::new(provider)
          , config
          , cancel: CancellationToken::new()
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, state).await
        });

        ForgeBackend
        {   hand
          , _task_handle
        }
    }

    /// Generate one card for a slot - returns almost immediately
    pub async fn generate_single_card(
      &self
    , theme: String
    , slot: SlotSpec
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateSingleCardReply>,
        Error
      >
    {   debug!("generate_single_card queuing slot {}", slot.id);
        self.queue_single_card(theme, slot, None)
    }

    /// Generate one card for a slot, also streaming its `card` event
    pub async fn stream_single_card(
      &self
    , theme: String
    , slot: SlotSpec
    ) -> Result<
        (
          mpsc::UnboundedReceiver<crate::GenerateSingleCardReply>,
          mpsc::UnboundedReceiver<GenerationEvent>
        ),
        Error
      >
    {   debug!("stream_single_card queuing slot {}", slot.id);
        let (events_tx, events_rx)
          = mpsc::unbounded_channel();
        let reply_rx = self.queue_single_card(theme, slot, Some(events_tx))?;
        Ok((reply_rx, events_rx))
    }

    fn queue_single_card(
      &self
    , theme: String
    , slot: SlotSpec
    , events: Option<mpsc::UnboundedSender<GenerationEvent>>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateSingleCardReply>,
        Error
      >
    {   let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateSingleCardArgs
        {   theme
          , color: slot.color
          , rarity: slot.rarity
          , slot_id: slot.id
          , slot_descriptor: slot.constraints
          , events
          , reply: reply_tx
        };

        self.hand.generate_single_card_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Generate a full set in standard batches
    pub async fn generate_full_set(
      &self
    , theme: String
    , catalog: Catalog
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateSetReply>,
        Error
      >
    {   debug!(
          "generate_full_set queuing {} slots",
          catalog.total_slots()
        );
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateFullSetArgs
        {   theme
          , catalog
          , reply: reply_tx
        };

        self.hand.generate_full_set_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Generate a set with an explicit batch size
    pub async fn generate_set_batch(
      &self
    , theme: String
    , catalog: Catalog
    , batch_size: usize
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateSetReply>,
        Error
      >
    {   debug!("generate_set_batch queuing batch size {}", batch_size);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateSetBatchArgs
        {   theme
          , catalog
          , batch_size
          , reply: reply_tx
        };

        self.hand.generate_set_batch_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Generate a set, streaming progress events.
    /// The stream ends with one `complete` or `error` event.
    pub async fn stream_set(
      &self
    , theme: String
    , catalog: Catalog
    , batch_size: Option<usize>
    ) -> Result<
        mpsc::UnboundedReceiver<GenerationEvent>,
        Error
      >
    {   debug!("stream_set queuing theme '{}'", theme);
        let (events_tx, events_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateSetStreamArgs
        {   theme
          , catalog
          , batch_size
          , events: events_tx
        };

        self.hand.generate_set_stream_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(events_rx)
    }

    /// Expand a pitch into a set concept
    pub async fn generate_set_concept(
      &self
    , pitch: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateSetConceptReply>,
        Error
      >
    {   debug!("generate_set_concept queuing");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateSetConceptArgs
        {   pitch
          , reply: reply_tx
        };

        self.hand.generate_set_concept_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend. In-flight runs stop before
    /// their next batch.
    pub async fn shutdown(self) -> Result<(), Error>
    {   debug!("Shutting down ForgeBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            Error::Disconnected("backend already shut down".to_string())
          })?;

        match reply_rx.recv().await
        {   Some(result) => {
              debug!("Backend shutdown confirmed");
              result
            }
          , None => {
              error!("Backend exited without confirming shutdown");
              Err(disconnected())
            }
        }
    }
}

fn disconnected() -> Error
{   error!("Backend channel closed");
    Error::Disconnected("backend task is not running".to_string())
}

/// Main backend event loop
///
/// tokio::select! only routes: every command runs in its own task
/// so a long set generation never blocks the queue.
async fn run_backend_loop<P>(
  foot: ForgeFoot
, state: ForgeBackendState<P>
)
where P: ChatProvider + 'static
{   debug!("Starting ForgeBackend event loop");
    let state = Arc::new(state);
    let ForgeFoot
    {   mut generate_single_card_rx
      , mut generate_full_set_rx
      , mut generate_set_batch_rx
      , mut generate_set_stream_rx
      , mut generate_set_concept_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_single_card_rx.recv() => {
          debug!("Received GenerateSingleCard for slot {}", cmd.slot_id);
          let state = Arc::clone(&state);
          tokio::spawn(async move {
            let slot = SlotSpec
            {   id: cmd.slot_id
              , color: cmd.color
              , rarity: cmd.rarity
              , constraints: cmd.slot_descriptor
            };
            let sink = cmd.events
              .map(NotificationSink::new)
              .unwrap_or_else(NotificationSink::disabled);
            let result = match state.orchestrator(sink)
            {   Ok(mut orchestrator) => {
                  orchestrator.generate_single_card(&cmd.theme, slot).await
                }
              , Err(e) => Err(e)
            };
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = generate_full_set_rx.recv() => {
          debug!("Received GenerateFullSet");
          let state = Arc::clone(&state);
          tokio::spawn(async move {
            let result = match state.orchestrator(NotificationSink::disabled())
            {   Ok(mut orchestrator) => {
                  orchestrator.generate_set(&cmd.theme, &cmd.catalog).await
                }
              , Err(e) => Err(e)
            };
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = generate_set_batch_rx.recv() => {
          debug!("Received GenerateSetBatch ({})", cmd.batch_size);
          let state = Arc::clone(&state);
          tokio::spawn(async move {
            let result = match state.orchestrator(NotificationSink::disabled())
            {   Ok(mut orchestrator) => {
                  orchestrator.generate_set_batch(
                    &cmd.theme,
                    &cmd.catalog,
                    cmd.batch_size
                  ).await
                }
              , Err(e) => Err(e)
            };
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = generate_set_stream_rx.recv() => {
          debug!("Received GenerateSetStream");
          let state = Arc::clone(&state);
          tokio::spawn(async move {
            run_stream(&state, cmd).await
          });
        }
      , Some(cmd) = generate_set_concept_rx.recv() => {
          debug!("Received GenerateSetConcept");
          let state = Arc::clone(&state);
          tokio::spawn(async move {
            let result = concept_with_fallback(&state, &cmd.pitch).await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          state.cancel.cancel();
          let _ = cmd.reply.send(Ok(()));
          info!("ForgeBackend shutting down");
          break;
        }
      , else => {
          warn!("All ForgeBackend channels closed");
          break;
        }
      }
    }
}

async fn run_stream<P: ChatProvider>(
  state: &ForgeBackendState<P>
, cmd: crate::GenerateSetStreamArgs
)
{   let sink = NotificationSink::new(cmd.events.clone());
    let batch_size = cmd.batch_size
      .unwrap_or(state.config.generation.standard_batch_size);

    let result = match state.orchestrator(sink.clone())
    {   Ok(mut orchestrator) => {
          orchestrator.generate_set_batch(
            &cmd.theme,
            &cmd.catalog,
            batch_size
          ).await
        }
      , Err(e) => Err(e)
    };

    match result
    {   Ok(set) => sink.publish(GenerationEvent::Complete
        {   message: format!("Generated {} cards", set.len())
          , total_cards: set.len()
        })
      , Err(e) => {
          error!("Streamed generation failed: {}", e);
          sink.publish(GenerationEvent::failed(&e));
        }
    }
}

/// Concept generation with the caller-level quota fallback: only
/// `QuotaExceeded` is replaced, every other failure propagates.
async fn concept_with_fallback<P: ChatProvider>(
  state: &ForgeBackendState<P>
, pitch: &str
) -> Result<ConceptReply, Error>
{   let mut client = state.client()?;
    let temperature = state.config.generation.concept_temperature;
    match generate_set_concept(&mut client, pitch, temperature).await
    {   Ok(concept) => Ok(ConceptReply
        {   concept
          , fallback_used: false
        })
      , Err(Error::QuotaExceeded { model, message }) => {
          warn!(
            "Quota exhausted through {} ({}), returning fallback concept",
            model, message
          );
          Ok(ConceptReply
          {   concept: SetConcept::fallback(pitch)
            , fallback_used: true
          })
        }
      , Err(e) => Err(e)
    }
}
