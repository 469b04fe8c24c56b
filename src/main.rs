//! flatten-xml - Flatten extracted XML filing shards into one CSV table
//!
//! Entry point for the CLI application.

use anyhow::Context;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use flatten_xml::{
    CancelFlag, Cli, Config, FlattenEngine, Header, Output, PipelineConfig, VerbosityLevel,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    cli.validate().map_err(|e| anyhow::anyhow!(e))?;
    let config = Config::from_cli(&cli);

    setup_logging(config.verbosity());

    let header = match &config.schema_path {
        Some(path) => Header::from_json_file(path)
            .with_context(|| format!("failed to load header schema {}", path.display()))?,
        None => Header::canonical(),
    };

    let engine = FlattenEngine::new(
        header,
        PipelineConfig {
            max_concurrent_shards: config.workers,
            multi_value_delimiter: config.multi_value_delimiter.clone(),
            ..PipelineConfig::default()
        },
    );

    // Ctrl-C drains in-flight shards instead of killing the sink mid-row.
    let cancel = CancelFlag::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, draining in-flight shards");
            signal_cancel.cancel();
        }
    });

    let summary = engine
        .run_with_cancel(&config.root, &config.output, cancel)
        .await
        .with_context(|| format!("run failed for {}", config.root.display()))?;

    print!(
        "{}",
        Output::new(config.verbosity()).format_summary(&summary)
    );

    Ok(())
}

fn setup_logging(verbosity: VerbosityLevel) {
    let filter = match verbosity {
        VerbosityLevel::Quiet => EnvFilter::new("flatten_xml=error"),
        VerbosityLevel::Normal => EnvFilter::new("flatten_xml=info"),
        VerbosityLevel::Verbose => EnvFilter::new("flatten_xml=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
