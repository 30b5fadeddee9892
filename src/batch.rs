//! Wires configuration into one pipeline run

use std::sync::Arc;

use tracing::info;

use logsift::aggregate::Aggregator;
use logsift::bot::BotClassifier;
use logsift::config::Config;
use logsift::geo::{GeoCache, HttpGeoClient, Resolver, ResolverConfig};
use logsift::output::DatasetWriter;
use logsift::pipeline::Pipeline;
use logsift::record::{Cleaner, LineParser};
use logsift::source::LogSource;
use logsift::storage;

use crate::cli::RunArgs;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

pub async fn run(args: RunArgs) -> Result<(), AnyError> {
    let mut config = match args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(prefix) = args.input {
        config.input.prefix = prefix;
    }
    if let Some(prefix) = args.output {
        config.output.prefix = prefix;
    }

    let input_store = storage::open_store(&config.input.store)?;
    let output_store = storage::open_store(&config.output.store)?;
    let source = LogSource::new(input_store, &config.input.prefix);
    let writer = DatasetWriter::new(output_store, &config.output.prefix);

    let cache = GeoCache::open(&config.cache.path)?;
    let client = HttpGeoClient::new(config.lookup.client_config())?;
    let classifier = BotClassifier::new(&config.bot.version, &config.bot.patterns);
    let resolver = Resolver::new(
        cache.clone(),
        Arc::new(client),
        classifier,
        ResolverConfig {
            concurrency: config.lookup.concurrency,
            retry_cached_failures: config.cache.retry_cached_failures,
        },
    );

    let pipeline = Pipeline::new(
        LineParser::new(config.input.delimiter),
        Cleaner::new(&config.clean.drop_user_agents),
        resolver,
        Aggregator::new(config.aggregate.time_bucket, &config.aggregate.dimensions),
        writer,
        cache,
    );

    let summary = pipeline.run(&source).await?;
    info!(
        run_id = summary.run_id,
        cleaned = summary.cleaned_rows,
        bots = summary.bot_rows,
        errors = summary.error_rows,
        aggregations = summary.aggregation_rows,
        "Run finished"
    );

    Ok(())
}
