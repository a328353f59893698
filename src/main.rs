//! setforge CLI
//!
//! Usage:
//!   setforge set --theme "sunken empire" --catalog skeleton.json \
//!     --format cockatrice --output sunken.xml
//!   setforge card --theme "sunken empire" --catalog skeleton.json \
//!     --slot W-C-01
//!   setforge concept --pitch "a drowned empire rising from the sea"

use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use log::{error, info};
use tokio::sync::mpsc;

use setforge::export::ExportFormat;
use setforge::providers::OpenAiProvider;
use setforge::{
  Catalog, Error, FallbackClient, ForgeBackend, ForgeConfig,
  GenerationEvent, NotificationSink, Orchestrator
};

#[derive(Parser, Debug)]
#[command(name = "setforge")]
#[command(about = "Generate trading card sets with a chat-completion model")]
struct Cli
{   /// JSON configuration file (provider, fallback chain, batching)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>
  , #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command
{   /// Generate every slot of a skeleton catalog
    Set
    {   #[arg(long, short = 't')]
        theme: String
      , /// Skeleton catalog JSON
        #[arg(long)]
        catalog: PathBuf
      , /// Cards per request (defaults to the standard batch size)
        #[arg(long, short = 'b')]
        batch_size: Option<usize>
      , /// Use the large batch size
        #[arg(long, conflicts_with = "batch_size")]
        large: bool
      , /// Only the commons of the five colors plus colorless
        #[arg(long)]
        commons_only: bool
      , /// json, csv or cockatrice
        #[arg(long, short = 'f', default_value = "json")]
        format: ExportFormat
      , /// Set name for Cockatrice exports (defaults to the theme)
        #[arg(long)]
        set_name: Option<String>
      , /// Output file (stdout if omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>
    }
  , /// Generate a single slot
    Card
    {   #[arg(long, short = 't')]
        theme: String
      , #[arg(long)]
        catalog: PathBuf
      , /// Slot id within the catalog
        #[arg(long, short = 's')]
        slot: String
    }
  , /// Expand a pitch into a set concept
    Concept
    {   #[arg(long, short = 'p')]
        pitch: String
    }
}

#[tokio::main]
async fn main()
{   dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await
    {   error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error>
{   let config = match &cli.config
    {   Some(path) => ForgeConfig::from_json_file(path)?
      , None => ForgeConfig::default()
    };
    let provider = OpenAiProvider::from_config(&config.provider)?;

    match cli.command
    {   Command::Set
        {   theme
          , catalog
          , batch_size
          , large
          , commons_only
          , format
          , set_name
          , output
        } => {
          let mut catalog = load_catalog(&catalog)?;
          if commons_only
          {   catalog = catalog.commons_only();
          }
          let batch_size = match (large, batch_size)
          {   (true, _) => config.generation.large_batch_size
            , (false, Some(size)) => size
            , (false, None) => config.generation.standard_batch_size
          };
          info!("Catalog holds {} slots", catalog.summary().total_cards);

          let (sink, events) = NotificationSink::channel();
          let progress = tokio::spawn(log_progress(events));
          let client = FallbackClient::with_models(
            provider,
            config.fallback.models.clone()
          )?;
          let mut orchestrator = Orchestrator::new(client, sink)
            .with_config(config.generation.clone());
          let result = orchestrator
            .generate_set_batch(&theme, &catalog, batch_size)
            .await;
          drop(orchestrator);
          let _ = progress.await;

          let set = result?;
          let set_name = set_name.unwrap_or_else(|| theme.clone());
          let rendered = format.render(&set, &theme, &set_name, None)?;
          write_output(output.as_deref(), &rendered, format)
        }
      , Command::Card
        {   theme
          , catalog
          , slot
        } => {
          let catalog = load_catalog(&catalog)?;
          let spec = catalog.slot(&slot)
            .cloned()
            .ok_or_else(|| Error::InvalidRequest(
              format!("no slot {} in catalog", slot)
            ))?;
          let backend = ForgeBackend::new(provider, config);
          let mut rx = backend.generate_single_card(theme, spec).await?;
          let card = recv(&mut rx).await?;
          backend.shutdown().await?;
          print_json(&card?)
        }
      , Command::Concept { pitch } => {
          let backend = ForgeBackend::new(provider, config);
          let mut rx = backend.generate_set_concept(pitch).await?;
          let reply = recv(&mut rx).await?;
          backend.shutdown().await?;
          let reply = reply?;
          if reply.fallback_used
          {   info!("Every model is out of quota, showing the fallback concept");
          }
          print_json(&reply)
        }
    }
}

async fn log_progress(mut events: mpsc::UnboundedReceiver<GenerationEvent>)
{   while let Some(event) = events.recv().await
    {   match event
        {   GenerationEvent::Status { message, total_slots, .. } => {
              info!("{} ({} slots)", message, total_slots);
            }
          , GenerationEvent::Card { color, rarity, card, .. } => {
              info!("[{} {}] {} - {}", color, rarity, card.slot_id, card.name);
            }
          , other => info!("{:?}", other)
        }
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, Error>
{   let text = std::fs::read_to_string(path)
      .map_err(|e| Error::InvalidCatalog(format!(
        "cannot read {}: {}", path.display(), e
      )))?;
    Catalog::from_json_str(&text)
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Result<T, Error>
{   rx.recv().await.ok_or_else(|| {
      Error::Disconnected("no reply from backend".to_string())
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error>
{   let text = serde_json::to_string_pretty(value)
      .map_err(|e| Error::Export(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn write_output(
  output: Option<&Path>
, rendered: &str
, format: ExportFormat
) -> Result<(), Error>
{   match output
    {   Some(path) => {
          std::fs::write(path, rendered)
            .map_err(|e| Error::Export(format!(
              "cannot write {}: {}", path.display(), e
            )))?;
          info!("Wrote {} export to {}", format.extension(), path.display());
        }
      , None => println!("{}", rendered)
    }
    Ok(())
}
