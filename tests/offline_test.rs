use keyword_etl::core::inputs::{read_countries, read_phrases};
use keyword_etl::utils::validation::Validate;
use keyword_etl::{
    EtlEngine, EtlError, LocalDownloadDir, LocalStorage, OfflinePipeline, ScoringStage, TomlConfig,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn config_for(root: &Path) -> TomlConfig {
    let toml = format!(
        r#"
[input]
countries_file = "{root}/countries.csv"
phrases_file = "{root}/phrases.csv"

[output]
measurements_file = "{root}/out/output.csv"
download_dir = "{root}/temp"

[country_codes]
us = "United States"
de = "Germany"
"#,
        root = root.display()
    );
    TomlConfig::from_toml_str(&toml).unwrap()
}

#[tokio::test]
async fn test_offline_run_writes_scored_tables() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();

    write(&root.join("countries.csv"), "Country;Coefficient\nUnited States;1\nGermany;0,5\n");
    write(
        &root.join("phrases.csv"),
        "Query;Group\nrunning shoes;shoes\ntrail shoes;shoes\nrain jacket;jackets\n",
    );
    write(
        &root.join("temp/a_us.csv"),
        "#,Keyword,Country,Difficulty,Volume\n\
         1,running shoes,us,40,1000\n\
         2,trail shoes,us,,500\n\
         3,running shoes,us,90,1\n",
    );
    write(
        &root.join("temp/b_de.csv"),
        "#,Keyword,Country,Difficulty,Volume\n\
         1,running shoes,de,20,200\n\
         2,rain jacket,de,10,5\n",
    );
    write(&root.join("temp/c.csv.crdownload"), "partial");

    let config = config_for(root);
    config.validate()?;

    let countries = read_countries(Path::new(&config.input.countries_file))?;
    let phrases = read_phrases(Path::new(&config.input.phrases_file))?;
    let stage = ScoringStage::new(&config, countries, phrases);
    let pipeline = OfflinePipeline::new(
        LocalDownloadDir::new(config.download_dir()),
        LocalStorage::new("."),
        stage,
    )
    .with_country_codes(config.country_codes.clone());
    assert!(pipeline.has_exports().await?);

    let outputs = EtlEngine::new(pipeline).run().await?;

    let measurements = fs::read_to_string(&outputs.measurements)?;
    assert_eq!(
        measurements,
        "Keyword;Country;Difficulty;Volume\n\
         running shoes;United States;40;1000\n\
         trail shoes;United States;;500\n\
         running shoes;Germany;20;200\n\
         rain jacket;Germany;10;5\n"
    );

    let scored = fs::read_to_string(&outputs.scored)?;
    let lines: Vec<&str> = scored.lines().collect();
    assert_eq!(
        lines[0],
        "Query;Volume_United States;Volume_Germany;Difficulty_United States;Difficulty_Germany;\
         Score_United States;Score_Germany;Total_Score"
    );
    assert_eq!(lines.len(), 4);
    // no difficulty known anywhere for trail shoes
    assert!(lines[2].starts_with("trail shoes;500;0;0;0;"));
    // volume 5 compresses to 1; the US borrows the Germany difficulty
    assert!(lines[3].starts_with("rain jacket;0;1;10;10;"));

    let pivot = fs::read_to_string(&outputs.pivot)?;
    let pivot_lines: Vec<&str> = pivot.lines().collect();
    assert_eq!(pivot_lines.len(), 3);
    assert!(pivot_lines[1].starts_with("shoes;1500;200;40;20;"));
    assert!(pivot_lines[2].starts_with("jackets;0;1;10;10;"));

    assert!(outputs.scored.ends_with("output_processed.csv"));
    assert!(outputs.pivot.ends_with("output_pivot.csv"));
    Ok(())
}

#[tokio::test]
async fn test_empty_phrase_table_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("phrases.csv"), "Query;Group\n");

    let err = read_phrases(&dir.path().join("phrases.csv")).unwrap_err();
    assert!(matches!(err, EtlError::InputFileEmpty { .. }));
    assert_eq!(err.exit_code(), 1);
}
