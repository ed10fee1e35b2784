use log::{debug, error, info, warn};
use std::process::ExitCode;

use schemadoc::{
    database, Config, DescriptionGenerator, DictionaryPipeline, DictionaryWorkbook, ProviderRegistry,
};

mod logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    if let Err(e) = logging::init(&logging::LogSettings::from_env()) {
        eprintln!("failed to initialize logging: {e}");
    }

    info!("Starting data dictionary generation process.");
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> schemadoc::Result<()> {
    let config = Config::from_env()?;
    debug!("Loaded configuration: {config:?}");

    let client = ProviderRegistry::with_defaults().select(&config.llm)?;
    info!("Using LLM model {}:{}", client.provider(), client.model());
    let generator = DescriptionGenerator::new(client, config.domain_name.as_str());

    let source = database::introspector(&config.database)?;
    source.check_connection().await?;

    let mut workbook = DictionaryWorkbook::new(config.extra_columns.clone());
    let summary = DictionaryPipeline::new(source.as_ref(), &generator)
        .run(&config.schema_name, &config.tables, &mut workbook)
        .await;

    if !summary.is_success() {
        warn!("No table of schema {} could be documented; no workbook written", config.schema_name);
        return Ok(());
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let path = config.output_file();
    workbook.save(&path)?;
    info!("Data dictionary saved to {} ({} sheet(s))", path.display(), workbook.sheet_count());
    Ok(())
}
