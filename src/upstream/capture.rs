//! Web page screenshots through a headless Chromium child process.
//!
//! The browser is scoped to a single capture. `kill_on_drop` reaps it when
//! the deadline fires or the request is cancelled, and the scratch file is a
//! `TempPath` removed on every exit path.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::process::Command;
use url::Url;

use crate::analysis::{UpstreamError, UpstreamKind};
use crate::config::CaptureConfig;
use crate::resilience::with_deadline;

/// Renders a page to PNG bytes.
#[async_trait]
pub trait PageCapture: Send + Sync {
    async fn capture(&self, url: &Url) -> Result<Vec<u8>, UpstreamError>;
}

pub struct ChromeCapture {
    config: CaptureConfig,
}

impl ChromeCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    fn scratch_file() -> Result<TempPath, UpstreamError> {
        tempfile::Builder::new()
            .prefix("audito-capture-")
            .suffix(".png")
            .tempfile()
            .map(|file| file.into_temp_path())
            .map_err(|e| {
                UpstreamError::new(UpstreamKind::Generic, format!("scratch file: {e}"))
            })
    }

    fn command(&self, url: &Url, output: &Path) -> Command {
        let mut command = Command::new(&self.config.browser_path);
        command
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--no-first-run",
                "--hide-scrollbars",
                "--disable-dev-shm-usage",
            ])
            .arg(format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ))
            .arg(format!("--user-agent={}", self.config.user_agent))
            .arg(format!("--virtual-time-budget={}", self.config.settle_ms))
            .arg(format!("--screenshot={}", output.display()))
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl PageCapture for ChromeCapture {
    async fn capture(&self, url: &Url) -> Result<Vec<u8>, UpstreamError> {
        if !self.config.enabled {
            return Err(UpstreamError::new(
                UpstreamKind::Generic,
                "page capture is disabled in configuration",
            ));
        }

        let scratch = Self::scratch_file()?;
        let child = self.command(url, &scratch).spawn().map_err(|e| {
            UpstreamError::new(
                UpstreamKind::Generic,
                format!("failed to launch {}: {e}", self.config.browser_path),
            )
        })?;

        tracing::debug!(url = %url, "Capturing page screenshot");
        let deadline = Duration::from_secs(self.config.timeout_secs);
        let output = with_deadline(deadline, "page capture", async {
            child.wait_with_output().await.map_err(|e| {
                UpstreamError::new(UpstreamKind::Generic, format!("browser process: {e}"))
            })
        })
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.chars().take(300).collect();
            return Err(UpstreamError::classified(format!(
                "browser exited with {}: {snippet}",
                output.status
            )));
        }

        let png = tokio::fs::read(&scratch).await.map_err(|e| {
            UpstreamError::new(UpstreamKind::Generic, format!("reading screenshot: {e}"))
        })?;
        if png.is_empty() {
            return Err(UpstreamError::new(
                UpstreamKind::Generic,
                "browser produced no screenshot",
            ));
        }
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_capture_fails_fast() {
        let capture = ChromeCapture::new(CaptureConfig {
            enabled: false,
            ..CaptureConfig::default()
        });
        let err = capture
            .capture(&Url::parse("https://example.com").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Generic);
    }

    #[tokio::test]
    async fn test_missing_browser_is_upstream_failure() {
        let capture = ChromeCapture::new(CaptureConfig {
            browser_path: "/nonexistent/audito-browser".into(),
            ..CaptureConfig::default()
        });
        let err = capture
            .capture(&Url::parse("https://example.com").unwrap())
            .await
            .unwrap_err();
        assert!(err.detail.contains("failed to launch"));
    }

    #[test]
    fn test_scratch_file_is_png_and_removed_on_drop() {
        let scratch = ChromeCapture::scratch_file().unwrap();
        let path = scratch.to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("audito-capture-") && name.ends_with(".png"));
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_command_arguments() {
        let capture = ChromeCapture::new(CaptureConfig::default());
        let command = capture.command(
            &Url::parse("https://example.com/").unwrap(),
            Path::new("/tmp/out.png"),
        );
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--screenshot=/tmp/out.png".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/"));
    }
}
