use std::sync::Arc;

use clap::Parser;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

pub mod cli;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod handler;
pub mod message;
pub mod report;
pub mod store;

use cli::{Area, Cli, Commands};
use config::Config;
use decode::TopicDecoder;
use engine::Reprocessor;
use handler::{HandlerRegistry, TargetResolver};
use message::ReplaySelection;
use store::Store;

/// Parse the command line and run the selected command against the
/// configured store.
pub async fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    let config = Config::load()?;

    let store = Store::connect_with(config.clone()).await?;

    match cli.command {
        Commands::Process {
            topic,
            id,
            area,
            force,
        } => {
            let area = Area::parse_lenient(&area);
            debug!(%area, "processing with area wiring");

            let registry = match config.topology_path() {
                Some(path) => HandlerRegistry::from_topology_file(path)?,
                None => HandlerRegistry::new(),
            };

            let engine = Reprocessor::builder()
                .store(store)
                .decoder(Arc::new(TopicDecoder::permissive()))
                .registry(registry)
                .targets(TargetResolver::builtin())
                .build();

            let selection = ReplaySelection::new(id, topic, force != 0);
            let outcome = engine.reprocess(&selection).await?;

            println!("{}", outcome.summary());
        }
        Commands::Status { topic, id } => {
            let selection = ReplaySelection::new(id, topic, false);
            let rows = report::report(&store, &selection).await?;

            print!("{}", report::render(&rows));
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) -> eyre::Result<()> {
    let default_level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("REPLAYQ_LOG")
                .with_default_directive(default_level.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("REPLAYQ_LOG")
                .with_default_directive(default_level.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    Ok(())
}
