//! Minimal W3C WebDriver client: the handful of commands the keyword
//! explorer needs, spoken over HTTP to chromedriver or a compatible server.

use crate::core::{AutomationError, AutomationResult};
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const WAIT_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub download_dir: PathBuf,
    pub headless: bool,
}

impl SessionOptions {
    fn capabilities(&self) -> Value {
        let mut args = vec!["--log-level=3".to_string()];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "prefs": {
                            "download.default_directory": self.download_dir.to_string_lossy(),
                            "download.prompt_for_download": false
                        }
                    }
                }
            }
        })
    }
}

/// Maps a WebDriver error code onto the automation error kinds.
fn classify(code: &str, message: &str, what: &str) -> AutomationError {
    match code {
        "no such element" | "stale element reference" => {
            AutomationError::ElementNotFound(what.to_string())
        }
        "element click intercepted" | "element not interactable" => {
            AutomationError::ClickIntercepted(what.to_string())
        }
        "timeout" | "script timeout" => AutomationError::WaitTimeout(what.to_string()),
        _ => AutomationError::Session(format!("{} ({}): {}", what, code, message)),
    }
}

fn element_ref(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
}

pub struct WebDriverClient {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverClient {
    /// Opens a new browser session.
    pub async fn connect(webdriver_url: &str, options: &SessionOptions) -> AutomationResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AutomationError::Session(format!("HTTP client: {}", e)))?;
        let base_url = webdriver_url.trim_end_matches('/').to_string();

        let value = send(
            &client,
            Method::POST,
            &format!("{}/session", base_url),
            Some(options.capabilities()),
            "new session",
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AutomationError::Session("new session: no sessionId in response".into()))?
            .to_string();
        tracing::debug!("WebDriver session {} opened", session_id);

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        what: &str,
    ) -> AutomationResult<Value> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body, what).await
    }

    pub async fn navigate(&self, url: &str) -> AutomationResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })), url)
            .await
            .map(drop)
    }

    pub async fn current_url(&self) -> AutomationResult<String> {
        let value = self.command(Method::GET, "/url", None, "current url").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn find_elements(&self, xpath: &str, what: &str) -> AutomationResult<Vec<ElementRef>> {
        let body = json!({ "using": "xpath", "value": xpath });
        let value = self.command(Method::POST, "/elements", Some(body), what).await?;
        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(element_ref).collect())
            .unwrap_or_default())
    }

    pub async fn find_element(&self, xpath: &str, what: &str) -> AutomationResult<ElementRef> {
        let body = json!({ "using": "xpath", "value": xpath });
        let value = self.command(Method::POST, "/element", Some(body), what).await?;
        element_ref(&value).ok_or_else(|| AutomationError::ElementNotFound(what.to_string()))
    }

    /// Polls until at least one element matches.
    pub async fn wait_for_elements(
        &self,
        xpath: &str,
        what: &str,
        timeout: Duration,
    ) -> AutomationResult<Vec<ElementRef>> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.find_elements(xpath, what).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::WaitTimeout(what.to_string()));
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    pub async fn wait_for_element(
        &self,
        xpath: &str,
        what: &str,
        timeout: Duration,
    ) -> AutomationResult<ElementRef> {
        let mut found = self.wait_for_elements(xpath, what, timeout).await?;
        Ok(found.swap_remove(0))
    }

    pub async fn click(&self, element: &ElementRef, what: &str) -> AutomationResult<()> {
        let path = format!("/element/{}/click", element.id());
        self.command(Method::POST, &path, Some(json!({})), what)
            .await
            .map(drop)
    }

    /// Keeps clicking while an overlay intercepts the click.
    pub async fn click_until_accepted(
        &self,
        element: &ElementRef,
        what: &str,
        timeout: Duration,
    ) -> AutomationResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.click(element, what).await {
                Err(AutomationError::ClickIntercepted(_)) if Instant::now() < deadline => {
                    tokio::time::sleep(WAIT_POLL).await;
                }
                other => return other,
            }
        }
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str, what: &str) -> AutomationResult<()> {
        let path = format!("/element/{}/value", element.id());
        self.command(Method::POST, &path, Some(json!({ "text": text })), what)
            .await
            .map(drop)
    }

    pub async fn text(&self, element: &ElementRef, what: &str) -> AutomationResult<String> {
        let path = format!("/element/{}/text", element.id());
        let value = self.command(Method::GET, &path, None, what).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Nudges the mouse away from whatever tooltip is covering the page.
    pub async fn move_pointer_by(&self, x: i64, y: i64) -> AutomationResult<()> {
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [
                    { "type": "pointerMove", "duration": 0, "origin": "pointer", "x": x, "y": y }
                ]
            }]
        });
        self.command(Method::POST, "/actions", Some(body), "pointer move")
            .await
            .map(drop)
    }

    /// PNG bytes of the current viewport.
    pub async fn screenshot(&self) -> AutomationResult<Vec<u8>> {
        let value = self.command(Method::GET, "/screenshot", None, "screenshot").await?;
        let encoded = value.as_str().unwrap_or_default();
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AutomationError::Session(format!("screenshot: {}", e)))
    }

    pub async fn quit(&self) -> AutomationResult<()> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        send(&self.client, Method::DELETE, &url, None, "close session")
            .await
            .map(drop)
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
    what: &str,
) -> AutomationResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AutomationError::Session(format!("{}: {}", what, e)))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| AutomationError::Session(format!("{}: unreadable response ({}): {}", what, status, e)))?;

    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        return Err(classify(code, message, what));
    }
    if !status.is_success() {
        return Err(AutomationError::Session(format!("{}: HTTP {}", what, status)));
    }
    Ok(value)
}
