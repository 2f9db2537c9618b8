use clap::Parser;
use keyword_etl::core::inputs::{read_countries, read_phrases};
use keyword_etl::core::RunOutputs;
use keyword_etl::utils::{logger, validation::Validate};
use keyword_etl::{
    EtlEngine, LocalDownloadDir, LocalStorage, OfflinePipeline, Result, ScoringStage, TomlConfig,
};
use std::path::Path;

#[derive(Parser)]
#[command(name = "offline-score")]
#[command(about = "Rebuilds the measurement table from downloaded exports and scores it")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "keyword-etl.toml")]
    config: String,

    #[arg(long)]
    volume_weight: Option<f64>,

    #[arg(long)]
    difficulty_weight: Option<f64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    monitor: bool,

    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting offline scoring");

    match run(&args).await {
        Ok(Some(outputs)) => {
            tracing::info!("✅ Offline scoring completed successfully!");
            println!("✅ Offline scoring completed successfully!");
            println!("📁 Measurements: {}", outputs.measurements);
            println!("📁 Scores: {}", outputs.scored);
            println!("📁 Group pivot: {}", outputs.pivot);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ Offline scoring failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(args: &Args) -> Result<Option<RunOutputs>> {
    let mut config = TomlConfig::from_file(&args.config)?;
    config.apply_overrides(None, args.volume_weight, args.difficulty_weight);
    config.validate()?;

    let countries = read_countries(Path::new(&config.input.countries_file))?;
    let phrases = read_phrases(Path::new(&config.input.phrases_file))?;

    let downloads = LocalDownloadDir::new(config.download_dir());
    if downloads.is_empty().await? {
        println!("📭 No exports in {}, nothing to score", downloads.root().display());
        return Ok(None);
    }

    let stage = ScoringStage::new(&config, countries, phrases);
    let pipeline = OfflinePipeline::new(downloads, LocalStorage::new("."), stage)
        .with_country_codes(config.country_codes.clone());
    if !pipeline.has_exports().await? {
        println!("📭 Only unfinished downloads in {}, nothing to score", config.output.download_dir);
        return Ok(None);
    }

    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor);
    engine.run().await.map(Some)
}
