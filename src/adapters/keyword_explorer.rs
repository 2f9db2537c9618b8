//! Drives the analytics tool's keyword-explorer page through WebDriver.

use crate::adapters::webdriver::{ElementRef, WebDriverClient};
use crate::config::credentials::Credentials;
use crate::core::{AutomationError, AutomationResult, ExportAutomation};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// XPath locators for the page, kept in configuration since the markup changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    pub login_field: String,
    pub password_field: String,
    pub login_submit: String,
    pub country_dropdown: String,
    pub country_search: String,
    pub country_option: String,
    pub country_option_selected: String,
    pub phrases_upload: String,
    pub search_button: String,
    pub row_count: String,
    pub export_button: String,
    pub encoding_options: String,
    pub row_options: String,
    pub download_button: String,
}

#[derive(Debug, Clone)]
pub struct ExplorerSettings {
    pub base_url: String,
    pub login_url: String,
    pub element_timeout: Duration,
    pub auth_settle: Duration,
    pub manual_login_timeout: Duration,
    pub diagnostics_dir: PathBuf,
    /// Where the phrase batch is written before upload.
    pub batch_file: PathBuf,
}

/// `"12,345 keywords"` -> `12345`.
pub fn parse_row_count(text: &str) -> Option<usize> {
    static LEADING_NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = LEADING_NUMBER
        .get_or_init(|| Regex::new(r"^\s*([\d,]+)").ok())
        .as_ref()?;
    let digits = re.captures(text)?.get(1)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// The row-count options of the export dialog signal truncation when there
/// are three of them and the middle one carries a parenthesised count.
pub fn signals_export_cap(option_count: usize, middle_label: &str) -> bool {
    option_count == 3 && middle_label.contains('(') && middle_label.contains(')')
}

pub struct KeywordExplorer {
    driver: WebDriverClient,
    selectors: Selectors,
    settings: ExplorerSettings,
}

impl KeywordExplorer {
    pub fn new(driver: WebDriverClient, selectors: Selectors, settings: ExplorerSettings) -> Self {
        Self {
            driver,
            selectors,
            settings,
        }
    }

    /// Ends the browser session; failures are only logged.
    pub async fn close(&self) {
        if let Err(e) = self.driver.quit().await {
            tracing::warn!("Could not close the browser session: {}", e);
        }
    }

    fn explorer_url(&self) -> String {
        format!("{}/keywords-explorer", self.settings.base_url.trim_end_matches('/'))
    }

    async fn wait(&self, xpath: &str, what: &str) -> AutomationResult<ElementRef> {
        self.driver
            .wait_for_element(xpath, what, self.settings.element_timeout)
            .await
    }

    async fn wait_all(&self, xpath: &str, what: &str) -> AutomationResult<Vec<ElementRef>> {
        self.driver
            .wait_for_elements(xpath, what, self.settings.element_timeout)
            .await
    }

    /// Signs in to the tool; manual credentials wait for the operator instead.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        match credentials {
            Credentials::Password { login, password } => {
                self.password_login(login, password).await?;
                tokio::time::sleep(self.settings.auth_settle).await;
                if self.on_login_page().await? {
                    tracing::warn!("Still on the login page, retrying once");
                    self.password_login(login, password).await?;
                    tokio::time::sleep(self.settings.auth_settle).await;
                    if self.on_login_page().await? {
                        return Err(EtlError::AuthorizationFailed {
                            cause: "still on the login page after two attempts".to_string(),
                        });
                    }
                }
            }
            Credentials::Manual { login_url, .. } => {
                self.manual_login(login_url).await?;
            }
        }
        tracing::info!("🔑 Logged in");
        Ok(())
    }

    async fn on_login_page(&self) -> Result<bool> {
        let current = self.driver.current_url().await.map_err(|e| EtlError::AuthorizationFailed {
            cause: e.to_string(),
        })?;
        Ok(current == self.settings.login_url)
    }

    async fn password_login(&self, login: &str, password: &str) -> Result<()> {
        let auth_err = |cause: String| EtlError::AuthorizationFailed { cause };

        self.driver
            .navigate(&self.settings.login_url)
            .await
            .map_err(|e| auth_err(e.to_string()))?;

        let fields = [
            (&self.selectors.login_field, "login", login),
            (&self.selectors.password_field, "password", password),
        ];
        for (xpath, label, value) in fields {
            let field = self
                .wait(xpath, label)
                .await
                .map_err(|_| auth_err(format!("could not find the {} field", label)))?;
            self.driver
                .send_keys(&field, value, label)
                .await
                .map_err(|e| auth_err(format!("could not type the {}: {}", label, e)))?;
        }

        let submit = self
            .wait(&self.selectors.login_submit, "login button")
            .await
            .map_err(|e| auth_err(format!("could not find the login button: {}", e)))?;
        self.driver
            .click(&submit, "login button")
            .await
            .map_err(|e| auth_err(format!("could not press the login button: {}", e)))
    }

    async fn manual_login(&self, login_url: &str) -> Result<()> {
        self.driver
            .navigate(login_url)
            .await
            .map_err(|e| EtlError::AuthorizationFailed { cause: e.to_string() })?;
        tracing::info!("⏳ Waiting for the operator to log in at {}", login_url);

        let deadline = tokio::time::Instant::now() + self.settings.manual_login_timeout;
        loop {
            let current = self
                .driver
                .current_url()
                .await
                .map_err(|e| EtlError::AuthorizationFailed { cause: e.to_string() })?;
            if current != login_url {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EtlError::AuthorizationFailed {
                    cause: format!(
                        "nobody logged in within {:?}",
                        self.settings.manual_login_timeout
                    ),
                });
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn select_country(&self, country: &str) -> AutomationResult<()> {
        let dropdown = self.wait(&self.selectors.country_dropdown, "country dropdown").await?;
        self.driver.click(&dropdown, "country dropdown").await?;

        let search = self.wait(&self.selectors.country_search, "country search field").await?;
        self.driver
            .send_keys(&search, &country.to_lowercase(), "country search field")
            .await?;

        let what = format!("country '{}' in the dropdown", country);
        let option = match self.wait(&self.selectors.country_option, &what).await {
            Ok(option) => option,
            // the country may already be the selected one
            Err(AutomationError::WaitTimeout(_)) => {
                self.wait(&self.selectors.country_option_selected, &what).await?
            }
            Err(e) => return Err(e),
        };

        let label = self.driver.text(&option, &what).await?;
        if label.trim().to_lowercase() != country.to_lowercase() {
            return Err(AutomationError::ElementNotFound(format!(
                "{} (dropdown offered '{}')",
                what,
                label.trim()
            )));
        }
        self.driver.click(&option, &what).await
    }

    async fn upload_phrases(&self, phrases: &[String]) -> AutomationResult<()> {
        let batch_file = &self.settings.batch_file;
        tokio::fs::write(batch_file, phrases.join("\n"))
            .await
            .map_err(|e| AutomationError::Session(format!("writing {}: {}", batch_file.display(), e)))?;
        let absolute = std::path::absolute(batch_file)
            .map_err(|e| AutomationError::Session(format!("resolving {}: {}", batch_file.display(), e)))?;

        let upload = self.wait(&self.selectors.phrases_upload, "phrase upload field").await?;
        self.driver
            .send_keys(&upload, &absolute.to_string_lossy(), "phrase upload field")
            .await
    }
}

#[async_trait]
impl ExportAutomation for KeywordExplorer {
    async fn submit(&self, country: &str, phrases: &[String]) -> AutomationResult<()> {
        self.driver.navigate(&self.explorer_url()).await?;
        self.select_country(country).await?;
        self.upload_phrases(phrases).await?;

        let search = self.wait(&self.selectors.search_button, "search button").await?;
        self.driver.click(&search, "search button").await
    }

    async fn reported_row_count(&self) -> AutomationResult<usize> {
        let block = self.wait(&self.selectors.row_count, "row count").await?;
        let text = self.driver.text(&block, "row count").await?;
        parse_row_count(&text)
            .ok_or_else(|| AutomationError::ElementNotFound(format!("a row count in '{}'", text.trim())))
    }

    async fn trigger_export(&self) -> AutomationResult<()> {
        let export = self.wait(&self.selectors.export_button, "export button").await?;
        self.driver.move_pointer_by(10, 20).await?;
        self.driver
            .click_until_accepted(&export, "export button", self.settings.element_timeout)
            .await?;

        let encodings = self
            .wait_all(&self.selectors.encoding_options, "export encoding options")
            .await?;
        if let Some(last) = encodings.last() {
            self.driver.click(last, "export encoding option").await?;
        }
        Ok(())
    }

    async fn export_cap_indicator(&self) -> AutomationResult<bool> {
        let options = self
            .wait_all(&self.selectors.row_options, "export row options")
            .await?;
        if options.len() != 3 {
            return Ok(false);
        }

        let label = self.driver.text(&options[1], "export row option").await?;
        self.driver.click(&options[1], "export row option").await?;
        Ok(signals_export_cap(options.len(), &label))
    }

    async fn confirm_export(&self) -> AutomationResult<()> {
        let download = self.wait(&self.selectors.download_button, "download button").await?;
        self.driver.click(&download, "download button").await
    }

    async fn capture_diagnostic(&self, label: &str) -> Option<PathBuf> {
        let png = match self.driver.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!("Could not take a diagnostic screenshot: {}", e);
                return None;
            }
        };

        let slug: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let file_name = format!("{}_{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S"), slug);
        let path = self.settings.diagnostics_dir.join(file_name);

        let written = async {
            tokio::fs::create_dir_all(&self.settings.diagnostics_dir).await?;
            tokio::fs::write(&path, png).await
        };
        match written.await {
            Ok(()) => {
                tracing::info!("📸 Diagnostic screenshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not save {}: {}", path.display(), e);
                None
            }
        }
    }
}
