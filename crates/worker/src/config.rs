use std::time::Duration;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Server worker endpoint, e.g. `ws://host:8000/api/v1/worker`.
    pub ws_url: String,
    /// Server API prefix used to fetch rendered HTML, e.g. `http://host:8000/api/v1`.
    pub http_url: String,
    /// Headless browser executable (default: `chromium`).
    pub browser_bin: String,
    /// Browser viewport as `(width, height)` (default: `1280,720`).
    pub window_size: (u32, u32),
    /// Browser runs per job before giving up (default: `3`).
    pub screenshot_attempts: u32,
    /// Limit for a single browser run in seconds (default: `30`).
    pub screenshot_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `MASTER_WS_URL`           | required   |
    /// | `MASTER_HTTP_URL`         | required   |
    /// | `BROWSER_BIN`             | `chromium` |
    /// | `WINDOW_SIZE`             | `1280,720` |
    /// | `SCREENSHOT_ATTEMPTS`     | `3`        |
    /// | `SCREENSHOT_TIMEOUT_SECS` | `30`       |
    pub fn from_env() -> Self {
        let ws_url = std::env::var("MASTER_WS_URL").expect("MASTER_WS_URL must be set");
        let http_url = std::env::var("MASTER_HTTP_URL").expect("MASTER_HTTP_URL must be set");

        let browser_bin = std::env::var("BROWSER_BIN").unwrap_or_else(|_| "chromium".into());

        let window_size = parse_window_size(
            &std::env::var("WINDOW_SIZE").unwrap_or_else(|_| "1280,720".into()),
        )
        .expect("WINDOW_SIZE must be formatted as WIDTH,HEIGHT");

        let screenshot_attempts: u32 = std::env::var("SCREENSHOT_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("SCREENSHOT_ATTEMPTS must be a valid u32");

        let screenshot_timeout_secs: u64 = std::env::var("SCREENSHOT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SCREENSHOT_TIMEOUT_SECS must be a valid u64");

        Self {
            ws_url,
            http_url,
            browser_bin,
            window_size,
            screenshot_attempts: screenshot_attempts.max(1),
            screenshot_timeout_secs,
        }
    }

    pub fn screenshot_timeout(&self) -> Duration {
        Duration::from_secs(self.screenshot_timeout_secs)
    }
}

/// Parse `WIDTH,HEIGHT` (also accepts `WIDTHxHEIGHT`).
pub fn parse_window_size(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.split_once(',').or_else(|| raw.split_once('x'))?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}
