use clap::Parser;
use keyword_etl::adapters::keyword_explorer::{ExplorerSettings, KeywordExplorer};
use keyword_etl::adapters::webdriver::{SessionOptions, WebDriverClient};
use keyword_etl::core::acquisition::AcquisitionPipeline;
use keyword_etl::core::export::ExportCoordinator;
use keyword_etl::core::inputs::{read_countries, read_phrases};
use keyword_etl::core::{ConfigProvider, RunOutputs};
use keyword_etl::utils::{logger, validation::Validate};
use keyword_etl::{
    CliConfig, Credentials, EtlEngine, EtlError, LocalDownloadDir, LocalStorage, OnlinePipeline,
    Result, ScoringStage, TomlConfig,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting keyword-etl");
    tracing::debug!("CLI config: {:?}", cli);

    match run(&cli).await {
        Ok(outputs) => {
            tracing::info!("✅ Keyword run completed successfully!");
            println!("✅ Keyword run completed successfully!");
            println!("📁 Measurements: {}", outputs.measurements);
            println!("📁 Scores: {}", outputs.scored);
            println!("📁 Group pivot: {}", outputs.pivot);
        }
        Err(e) => {
            tracing::error!(
                "❌ Keyword run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

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

async fn run(cli: &CliConfig) -> Result<RunOutputs> {
    tracing::info!("📁 Loading configuration from: {}", cli.config);
    let mut config = TomlConfig::from_file(&cli.config)?;
    config.apply_overrides(cli.row_cap, cli.volume_weight, cli.difficulty_weight);
    config.validate()?;

    let countries = read_countries(Path::new(&config.input.countries_file))?;
    let phrases = read_phrases(Path::new(&config.input.phrases_file))?;
    tracing::info!(
        "📋 {} countries, {} phrases loaded",
        countries.len(),
        phrases.len()
    );

    let credentials = Credentials::from_file(config.credentials_file()?)?;
    let browser = config.browser()?.clone();
    let selectors = config.selectors()?.clone();

    let downloads = LocalDownloadDir::new(config.download_dir());
    if !downloads.is_empty().await? && !cli.force && !cli.resume {
        return Err(EtlError::ConfigValidationError {
            field: "output.download_dir".to_string(),
            message: format!(
                "{} is not empty; pass --force to wipe it or --resume to continue",
                downloads.root().display()
            ),
        });
    }
    downloads.prepare(cli.force).await?;
    let download_dir = std::path::absolute(downloads.root())?;

    let driver = WebDriverClient::connect(
        &browser.webdriver_url,
        &SessionOptions {
            download_dir,
            headless: browser.headless,
        },
    )
    .await
    .map_err(|e| EtlError::ApiFailure {
        cause: e.to_string(),
        diagnostic: None,
    })?;
    tracing::info!("🌐 Browser session {} started", driver.session_id());

    let settings = ExplorerSettings {
        base_url: credentials
            .base_url()
            .unwrap_or(browser.base_url.as_str())
            .to_string(),
        login_url: browser.login_url.clone(),
        element_timeout: Duration::from_secs(browser.element_timeout_seconds),
        auth_settle: Duration::from_secs(browser.auth_settle_seconds),
        manual_login_timeout: Duration::from_secs(browser.manual_login_timeout_seconds),
        diagnostics_dir: PathBuf::from(&browser.diagnostics_dir),
        batch_file: PathBuf::from(&browser.batch_file),
    };
    let explorer = KeywordExplorer::new(driver, selectors, settings);

    if let Err(e) = explorer.login(&credentials).await {
        explorer.close().await;
        return Err(e);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let coordinator = ExportCoordinator::new(explorer, downloads, config.acquisition_settings());
    let acquisition = AcquisitionPipeline::new(
        coordinator,
        LocalStorage::new("."),
        config.measurements_path(),
    )
    .with_resume(cli.resume)
    .with_pause(config.pause_between_countries());
    let stage = ScoringStage::new(&config, countries, phrases);

    let engine = EtlEngine::new_with_monitoring(OnlinePipeline::new(acquisition, stage), cli.monitor);
    let outcome = engine.run().await;

    engine
        .pipeline()
        .acquisition()
        .coordinator()
        .automation()
        .close()
        .await;

    outcome
}
