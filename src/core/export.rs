use crate::core::export_file::{count_data_rows, is_partial_download, parse_export, row_count_acceptable};
use crate::core::{AutomationError, AutomationResult, DownloadArea, ExportAutomation, Measurement};
use crate::utils::error::{EtlError, Result};
use std::collections::{HashMap, HashSet};
use std::io;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSettings {
    /// Rows the tool exports per request before it truncates.
    pub row_cap: usize,
    pub download_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            row_cap: 5000,
            download_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// One accepted export and whether the tool cut it at the cap.
struct Page {
    measurements: Vec<Measurement>,
    truncated: bool,
}

struct AcceptedExport {
    name: String,
    bytes: Vec<u8>,
    rows: usize,
}

/// Drives the export of one country's phrase batch.
pub struct ExportCoordinator<A: ExportAutomation, D: DownloadArea> {
    automation: A,
    downloads: D,
    settings: AcquisitionSettings,
}

/// Locked or vanishing files show up while the browser is still writing.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::ResourceBusy
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::NotFound
    )
}

impl<A: ExportAutomation, D: DownloadArea> ExportCoordinator<A, D> {
    pub fn new(automation: A, downloads: D, settings: AcquisitionSettings) -> Self {
        Self {
            automation,
            downloads,
            settings,
        }
    }

    pub fn settings(&self) -> &AcquisitionSettings {
        &self.settings
    }

    pub fn automation(&self) -> &A {
        &self.automation
    }

    /// Retrieves every measurement for `phrases` in `country`.
    ///
    /// While the tool reports the export cap, the phrases past the first
    /// `row_cap` are submitted again. Later pages come first in the result:
    /// the last page leads, the first page closes it.
    pub async fn acquire(&self, country: &str, phrases: &[String]) -> Result<Vec<Measurement>> {
        let mut remaining = phrases;
        let mut pages: Vec<Vec<Measurement>> = Vec::new();
        let mut page_no = 1;

        while !remaining.is_empty() {
            let page = self.acquire_page(country, remaining).await?;
            tracing::info!(
                "📄 {} page {}: {} rows for {} phrases{}",
                country,
                page_no,
                page.measurements.len(),
                remaining.len(),
                if page.truncated { " (export cap reached)" } else { "" }
            );
            pages.push(page.measurements);

            if !page.truncated {
                break;
            }
            let covered = self.settings.row_cap.min(remaining.len());
            remaining = &remaining[covered..];
            page_no += 1;
        }

        Ok(pages.into_iter().rev().flatten().collect())
    }

    async fn acquire_page(&self, country: &str, phrases: &[String]) -> Result<Page> {
        let submitted = self.automation.submit(country, phrases).await;
        self.step(&format!("submit phrases for {}", country), submitted)
            .await?;

        let reported = self.automation.reported_row_count().await;
        let mut expected = self.step("read the reported row count", reported).await?;

        let opened = self.automation.trigger_export().await;
        self.step("open the export dialog", opened).await?;

        let capped = self.automation.export_cap_indicator().await;
        let truncated = self.step("read the export options", capped).await?;
        if truncated {
            tracing::debug!(
                "Export capped at {} rows (tool reported {})",
                self.settings.row_cap,
                expected
            );
            expected = self.settings.row_cap;
        }

        let baseline: HashSet<String> = self.downloads.list().await?.into_iter().collect();

        let confirmed = self.automation.confirm_export().await;
        self.step("start the download", confirmed).await?;

        let export = self.wait_for_download(&baseline, expected).await?;
        let location = self.downloads.location(&export.name);
        tracing::debug!("Accepted {} with {} rows", location.display(), export.rows);

        let mut measurements = parse_export(&export.bytes, &location)?;
        for m in &mut measurements {
            m.country = country.to_string();
        }

        Ok(Page {
            measurements,
            truncated,
        })
    }

    /// Polls the download area until a new, settled file with an acceptable
    /// row count shows up, or the download timeout runs out.
    async fn wait_for_download(
        &self,
        baseline: &HashSet<String>,
        expected: usize,
    ) -> Result<AcceptedExport> {
        let deadline = Instant::now() + self.settings.download_timeout;
        let mut last_sizes: HashMap<String, u64> = HashMap::new();

        loop {
            match self.poll_downloads(baseline, expected, &mut last_sizes).await {
                Ok(Some(export)) => return Ok(export),
                Ok(None) => {}
                Err(e) if is_transient(&e) => {
                    tracing::debug!("Download not ready yet: {}", e);
                }
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                let diagnostic = self.automation.capture_diagnostic("download").await;
                return Err(EtlError::AcquisitionTimeout {
                    cause: format!(
                        "no complete export of {} rows appeared within {:?}",
                        expected, self.settings.download_timeout
                    ),
                    diagnostic,
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn poll_downloads(
        &self,
        baseline: &HashSet<String>,
        expected: usize,
        last_sizes: &mut HashMap<String, u64>,
    ) -> io::Result<Option<AcceptedExport>> {
        let mut names = self.downloads.list().await?;
        names.sort();

        for name in names
            .into_iter()
            .filter(|n| !baseline.contains(n) && !is_partial_download(n))
        {
            let size = match self.downloads.size(&name).await {
                Ok(size) => size,
                Err(e) if is_transient(&e) => {
                    tracing::debug!("Skipping {} this round: {}", name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let previous = last_sizes.insert(name.clone(), size);
            if size == 0 || previous != Some(size) {
                // still growing, check again next round
                continue;
            }

            let bytes = match self.downloads.read(&name).await {
                Ok(bytes) => bytes,
                Err(e) if is_transient(&e) => {
                    tracing::debug!("Skipping {} this round: {}", name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let rows = count_data_rows(&bytes);
            if row_count_acceptable(expected, rows) {
                return Ok(Some(AcceptedExport { name, bytes, rows }));
            }
            tracing::debug!("{} has {} rows, expected {}", name, rows, expected);
        }

        Ok(None)
    }

    async fn step<T>(&self, action: &str, result: AutomationResult<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(self.escalate(action, err).await),
        }
    }

    /// Captures a diagnostic and turns an automation failure into an acquisition error.
    async fn escalate(&self, action: &str, err: AutomationError) -> EtlError {
        let diagnostic = self.automation.capture_diagnostic(action).await;
        let cause = format!("could not {}: {}", action, err);
        tracing::error!("❌ {}", cause);

        match err {
            AutomationError::ElementNotFound(_)
            | AutomationError::ClickIntercepted(_)
            | AutomationError::WaitTimeout(_) => EtlError::AcquisitionTimeout { cause, diagnostic },
            AutomationError::Session(_) => EtlError::ApiFailure { cause, diagnostic },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Scripted page: each confirmed export drops the queued file into `area`.
    #[derive(Clone, Default)]
    struct ScriptedAutomation {
        reported: usize,
        truncated: bool,
        fail_submit: Option<AutomationError>,
        exports: Arc<Mutex<Vec<Vec<u8>>>>,
        area: FakeArea,
        submitted: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl ExportAutomation for ScriptedAutomation {
        async fn submit(&self, _country: &str, phrases: &[String]) -> AutomationResult<()> {
            if let Some(err) = &self.fail_submit {
                return Err(err.clone());
            }
            self.submitted.lock().unwrap().push(phrases.to_vec());
            Ok(())
        }

        async fn reported_row_count(&self) -> AutomationResult<usize> {
            Ok(self.reported)
        }

        async fn trigger_export(&self) -> AutomationResult<()> {
            Ok(())
        }

        async fn export_cap_indicator(&self) -> AutomationResult<bool> {
            Ok(self.truncated)
        }

        async fn confirm_export(&self) -> AutomationResult<()> {
            let mut exports = self.exports.lock().unwrap();
            if !exports.is_empty() {
                let bytes = exports.remove(0);
                self.area.add(&format!("export-{}.csv", exports.len()), bytes);
            }
            *self.area.armed.lock().unwrap() = true;
            Ok(())
        }

        async fn capture_diagnostic(&self, label: &str) -> Option<PathBuf> {
            Some(PathBuf::from(format!("diag/{}.png", label.replace(' ', "_"))))
        }
    }

    #[derive(Clone, Default)]
    struct FakeArea {
        files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        busy_reads: Arc<Mutex<usize>>,
        /// Writes applied one per listing once armed, like a browser filling a file.
        pending_writes: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        armed: Arc<Mutex<bool>>,
        locked: Arc<Mutex<Vec<String>>>,
        reads: Arc<Mutex<Vec<String>>>,
    }

    impl FakeArea {
        fn add(&self, name: &str, bytes: Vec<u8>) {
            let mut files = self.files.lock().unwrap();
            match files.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = bytes,
                None => files.push((name.to_string(), bytes)),
            }
        }

        fn schedule(&self, name: &str, bytes: Vec<u8>) {
            self.pending_writes.lock().unwrap().push((name.to_string(), bytes));
        }
    }

    #[async_trait]
    impl DownloadArea for FakeArea {
        async fn list(&self) -> io::Result<Vec<String>> {
            if *self.armed.lock().unwrap() {
                let mut pending = self.pending_writes.lock().unwrap();
                if !pending.is_empty() {
                    let (name, bytes) = pending.remove(0);
                    self.add(&name, bytes);
                }
            }
            Ok(self.files.lock().unwrap().iter().map(|(n, _)| n.clone()).collect())
        }

        async fn size(&self, name: &str) -> io::Result<u64> {
            if self.locked.lock().unwrap().iter().any(|n| n == name) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.files
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, b)| b.len() as u64)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        async fn read(&self, name: &str) -> io::Result<Vec<u8>> {
            let mut busy = self.busy_reads.lock().unwrap();
            if *busy > 0 {
                *busy -= 1;
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.reads.lock().unwrap().push(name.to_string());
            self.files
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, b)| b.clone())
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn location(&self, name: &str) -> PathBuf {
            PathBuf::from("downloads").join(name)
        }
    }

    fn settings(row_cap: usize) -> AcquisitionSettings {
        AcquisitionSettings {
            row_cap,
            download_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn export_bytes(keywords: &[&str]) -> Vec<u8> {
        let mut out = String::from("Keyword,Country,Difficulty,Volume\n");
        for k in keywords {
            out.push_str(&format!("{},us,10,100\n", k));
        }
        out.into_bytes()
    }

    #[tokio::test]
    async fn test_acquire_single_page_sets_country() {
        let automation = ScriptedAutomation {
            reported: 2,
            ..Default::default()
        };
        automation
            .exports
            .lock()
            .unwrap()
            .push(export_bytes(&["a", "b"]));
        let area = automation.area.clone();
        let coordinator = ExportCoordinator::new(automation, area, settings(100));

        let rows = coordinator
            .acquire("United States", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.country == "United States"));
    }

    #[tokio::test]
    async fn test_busy_file_is_retried() {
        let automation = ScriptedAutomation {
            reported: 1,
            ..Default::default()
        };
        automation.exports.lock().unwrap().push(export_bytes(&["a"]));
        *automation.area.busy_reads.lock().unwrap() = 3;
        let area = automation.area.clone();
        let coordinator = ExportCoordinator::new(automation, area, settings(100));

        let rows = coordinator.acquire("us", &["a".to_string()]).await.unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_short_file_times_out_with_diagnostic() {
        let automation = ScriptedAutomation {
            reported: 1000,
            ..Default::default()
        };
        let keywords: Vec<String> = (0..989).map(|i| format!("k{}", i)).collect();
        let refs: Vec<&str> = keywords.iter().map(String::as_str).collect();
        automation.exports.lock().unwrap().push(export_bytes(&refs));
        let area = automation.area.clone();
        let coordinator = ExportCoordinator::new(automation, area, settings(5000));

        let err = coordinator.acquire("us", &keywords).await.unwrap_err();

        match err {
            EtlError::AcquisitionTimeout { diagnostic, .. } => {
                assert_eq!(diagnostic, Some(PathBuf::from("diag/download.png")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_automation_failures_are_translated() {
        let automation = ScriptedAutomation {
            fail_submit: Some(AutomationError::WaitTimeout("country dropdown".into())),
            ..Default::default()
        };
        let area = automation.area.clone();
        let coordinator = ExportCoordinator::new(automation, area, settings(10));

        let err = coordinator.acquire("us", &["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, EtlError::AcquisitionTimeout { .. }));
        assert!(err.to_string().contains("country dropdown"));

        let automation = ScriptedAutomation {
            fail_submit: Some(AutomationError::Session("connection refused".into())),
            ..Default::default()
        };
        let area = automation.area.clone();
        let coordinator = ExportCoordinator::new(automation, area, settings(10));

        let err = coordinator.acquire("us", &["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, EtlError::ApiFailure { diagnostic: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_partial_download_is_ignored_until_renamed() {
        let automation = ScriptedAutomation {
            reported: 2,
            ..Default::default()
        };
        let area = automation.area.clone();
        let complete = export_bytes(&["a", "b"]);
        area.schedule("export.csv.crdownload", complete.clone());
        area.schedule("export.csv.crdownload", complete.clone());
        area.schedule("export.tmp", complete.clone());
        area.schedule("export.csv", complete);
        let coordinator = ExportCoordinator::new(automation, area.clone(), settings(100));

        let rows = coordinator
            .acquire("us", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(*area.reads.lock().unwrap(), vec!["export.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_growing_file_is_read_once_settled() {
        let automation = ScriptedAutomation {
            reported: 3,
            ..Default::default()
        };
        let area = automation.area.clone();
        let full = export_bytes(&["a", "b", "c"]);
        area.schedule("export.csv", full[..20].to_vec());
        area.schedule("export.csv", full[..40].to_vec());
        area.schedule("export.csv", full);
        let coordinator = ExportCoordinator::new(automation, area.clone(), settings(100));
        let batch: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let rows = coordinator.acquire("us", &batch).await.unwrap();

        assert_eq!(rows.len(), 3);
        // only read after two polls saw the same size
        assert_eq!(*area.reads.lock().unwrap(), vec!["export.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_locked_stray_file_does_not_hide_the_export() {
        let automation = ScriptedAutomation {
            reported: 1,
            ..Default::default()
        };
        let area = automation.area.clone();
        area.locked.lock().unwrap().push("another.csv".to_string());
        area.schedule("another.csv", b"locked by someone else".to_vec());
        area.schedule("export.csv", export_bytes(&["a"]));
        let coordinator = ExportCoordinator::new(automation, area.clone(), settings(100));

        let rows = coordinator.acquire("us", &["a".to_string()]).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(*area.reads.lock().unwrap(), vec!["export.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_batch_submits_nothing() {
        let automation = ScriptedAutomation::default();
        let submitted = automation.submitted.clone();
        let area = automation.area.clone();
        let coordinator = ExportCoordinator::new(automation, area, settings(10));

        let rows = coordinator.acquire("us", &[]).await.unwrap();

        assert!(rows.is_empty());
        assert!(submitted.lock().unwrap().is_empty());
    }
}
