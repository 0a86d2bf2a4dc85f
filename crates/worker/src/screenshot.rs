//! Headless-browser screenshots.
//!
//! Each capture writes the page to a scratch directory and runs the
//! browser once against it with `--headless --screenshot`. The scratch
//! directory is removed when the capture returns.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::WorkerConfig;
use crate::error::ScreenshotError;

/// Turns a page of HTML into PNG bytes.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    async fn capture(&self, html: &str) -> Result<Vec<u8>, ScreenshotError>;
}

/// Screenshots pages with a Chromium-compatible browser binary.
#[derive(Debug, Clone)]
pub struct BrowserScreenshotter {
    bin: String,
    window_size: (u32, u32),
    timeout: Duration,
}

impl BrowserScreenshotter {
    pub fn new(bin: impl Into<String>, window_size: (u32, u32), timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            window_size,
            timeout,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            config.browser_bin.clone(),
            config.window_size,
            config.screenshot_timeout(),
        )
    }
}

/// Command-line arguments for one browser run.
pub fn browser_args(page: &Path, output: &Path, (width, height): (u32, u32)) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--disable-gpu".to_string(),
        "--hide-scrollbars".to_string(),
        format!("--screenshot={}", output.display()),
        format!("--window-size={width},{height}"),
        format!("file://{}", page.display()),
    ]
}

#[async_trait]
impl Screenshotter for BrowserScreenshotter {
    async fn capture(&self, html: &str) -> Result<Vec<u8>, ScreenshotError> {
        let scratch = tempfile::tempdir()?;
        let page = scratch.path().join("page.html");
        let output = scratch.path().join("screenshot.png");
        tokio::fs::write(&page, html).await?;

        let run = Command::new(&self.bin)
            .args(browser_args(&page, &output, self.window_size))
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| ScreenshotError::Timeout(self.timeout))?
            .map_err(ScreenshotError::Spawn)?;

        if !result.status.success() {
            return Err(ScreenshotError::Failed {
                status: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        match tokio::fs::read(&output).await {
            Ok(png) if !png.is_empty() => Ok(png),
            Ok(_) => Err(ScreenshotError::Missing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScreenshotError::Missing),
            Err(e) => Err(ScreenshotError::Io(e)),
        }
    }
}
