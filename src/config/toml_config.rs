use crate::adapters::keyword_explorer::Selectors;
use crate::core::export::AcquisitionSettings;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    pub browser: Option<BrowserConfig>,
    pub selectors: Option<Selectors>,
    /// Export country codes -> country names, used when rebuilding from exports.
    #[serde(default)]
    pub country_codes: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub countries_file: String,
    pub phrases_file: String,
    pub credentials_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_measurements_file")]
    pub measurements_file: String,
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub row_cap: usize,
    pub download_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub pause_between_countries_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            row_cap: 5000,
            download_timeout_seconds: 300,
            poll_interval_ms: 500,
            pause_between_countries_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub volume_weight: f64,
    pub difficulty_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            volume_weight: 1.0,
            difficulty_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    pub base_url: String,
    pub login_url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_element_timeout")]
    pub element_timeout_seconds: u64,
    #[serde(default = "default_auth_settle")]
    pub auth_settle_seconds: u64,
    #[serde(default = "default_manual_login_timeout")]
    pub manual_login_timeout_seconds: u64,
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: String,
    #[serde(default = "default_batch_file")]
    pub batch_file: String,
}

fn default_measurements_file() -> String {
    "output.csv".to_string()
}

fn default_download_dir() -> String {
    "temp".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_element_timeout() -> u64 {
    30
}

fn default_auth_settle() -> u64 {
    5
}

fn default_manual_login_timeout() -> u64 {
    600
}

fn default_diagnostics_dir() -> String {
    "diagnostics".to_string()
}

fn default_batch_file() -> String {
    "phrases_batch.txt".to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LOGIN_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input.countries_file", &self.input.countries_file)?;
        validation::validate_path("input.phrases_file", &self.input.phrases_file)?;
        validation::validate_file_extensions(
            "input",
            &[self.input.countries_file.as_str(), self.input.phrases_file.as_str()],
            &["csv", "txt"],
        )?;
        validation::validate_path("output.measurements_file", &self.output.measurements_file)?;
        validation::validate_path("output.download_dir", &self.output.download_dir)?;

        validation::validate_positive_number("acquisition.row_cap", self.acquisition.row_cap, 1)?;
        validation::validate_positive_number(
            "acquisition.poll_interval_ms",
            self.acquisition.poll_interval_ms as usize,
            1,
        )?;
        validation::validate_range("scoring.volume_weight", self.scoring.volume_weight, 0.0, 1e6)?;
        validation::validate_range(
            "scoring.difficulty_weight",
            self.scoring.difficulty_weight,
            0.0,
            1e6,
        )?;

        if let Some(browser) = &self.browser {
            validation::validate_url("browser.webdriver_url", &browser.webdriver_url)?;
            validation::validate_url("browser.base_url", &browser.base_url)?;
            validation::validate_url("browser.login_url", &browser.login_url)?;
            validation::validate_path("browser.batch_file", &browser.batch_file)?;
        }

        for (code, name) in &self.country_codes {
            validation::validate_non_empty_string(&format!("country_codes.{}", code), name)?;
        }

        Ok(())
    }

    /// Settings the online run cannot do without.
    pub fn browser(&self) -> Result<&BrowserConfig> {
        self.browser.as_ref().ok_or_else(|| EtlError::MissingConfigError {
            field: "browser".to_string(),
        })
    }

    pub fn selectors(&self) -> Result<&Selectors> {
        self.selectors.as_ref().ok_or_else(|| EtlError::MissingConfigError {
            field: "selectors".to_string(),
        })
    }

    pub fn credentials_file(&self) -> Result<&str> {
        self.input
            .credentials_file
            .as_deref()
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "input.credentials_file".to_string(),
            })
    }

    pub fn acquisition_settings(&self) -> AcquisitionSettings {
        AcquisitionSettings {
            row_cap: self.acquisition.row_cap,
            download_timeout: Duration::from_secs(self.acquisition.download_timeout_seconds),
            poll_interval: Duration::from_millis(self.acquisition.poll_interval_ms),
        }
    }

    pub fn pause_between_countries(&self) -> Duration {
        Duration::from_millis(self.acquisition.pause_between_countries_ms)
    }

    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(&self.output.download_dir)
    }

    pub fn apply_overrides(
        &mut self,
        row_cap: Option<usize>,
        volume_weight: Option<f64>,
        difficulty_weight: Option<f64>,
    ) {
        if let Some(row_cap) = row_cap {
            tracing::info!("🔧 Row cap overridden to: {}", row_cap);
            self.acquisition.row_cap = row_cap;
        }
        if let Some(weight) = volume_weight {
            tracing::info!("🔧 Volume weight overridden to: {}", weight);
            self.scoring.volume_weight = weight;
        }
        if let Some(weight) = difficulty_weight {
            tracing::info!("🔧 Difficulty weight overridden to: {}", weight);
            self.scoring.difficulty_weight = weight;
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn measurements_path(&self) -> &str {
        &self.output.measurements_file
    }

    fn volume_weight(&self) -> f64 {
        self.scoring.volume_weight
    }

    fn difficulty_weight(&self) -> f64 {
        self.scoring.difficulty_weight
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[input]
countries_file = "countries.csv"
phrases_file = "phrases.csv"

[output]
measurements_file = "out/output.csv"
"#;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.acquisition.row_cap, 5000);
        assert_eq!(config.volume_weight(), 1.0);
        assert_eq!(config.download_dir(), PathBuf::from("temp"));
        assert_eq!(config.measurements_path(), "out/output.csv");
        assert!(config.browser().is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KEYWORD_ETL_TEST_BASE", "https://tool.example.com");

        let toml_content = format!(
            "{}\n[browser]\nbase_url = \"${{KEYWORD_ETL_TEST_BASE}}\"\nlogin_url = \"${{KEYWORD_ETL_TEST_BASE}}/login\"\n",
            MINIMAL
        );

        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        let browser = config.browser().unwrap();
        assert_eq!(browser.base_url, "https://tool.example.com");
        assert_eq!(browser.login_url, "https://tool.example.com/login");
        assert_eq!(browser.webdriver_url, "http://localhost:9515");

        std::env::remove_var("KEYWORD_ETL_TEST_BASE");
    }

    #[test]
    fn test_config_validation() {
        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.acquisition.row_cap = 0;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.input.phrases_file = "phrases.xlsx".to_string();
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.scoring.difficulty_weight = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_and_country_codes() {
        let toml_content = format!("{}\n[country_codes]\nus = \"United States\"\n", MINIMAL);
        let mut config = TomlConfig::from_toml_str(&toml_content).unwrap();

        config.apply_overrides(Some(100), None, Some(0.5));

        assert_eq!(config.acquisition.row_cap, 100);
        assert_eq!(config.volume_weight(), 1.0);
        assert_eq!(config.difficulty_weight(), 0.5);
        assert_eq!(config.country_codes["us"], "United States");
    }

    #[test]
    fn test_example_config_parses() {
        let config =
            TomlConfig::from_toml_str(include_str!("../../keyword-etl.example.toml")).unwrap();

        assert!(config.selectors().unwrap().row_options.contains("export-number-of-rows"));
        assert_eq!(config.browser().unwrap().element_timeout_seconds, 30);
        assert_eq!(config.credentials_file().unwrap(), "credentials.txt");
        assert_eq!(config.acquisition_settings().row_cap, 5000);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.input.countries_file, "countries.csv");
    }
}
