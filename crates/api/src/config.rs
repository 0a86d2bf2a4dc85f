use std::path::PathBuf;
use std::time::Duration;

use autorender_dispatch::{DispatcherConfig, SessionConfig};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Per-job wait for a worker reply in seconds; `0` waits forever (default: `60`).
    pub job_timeout_secs: u64,
    /// Outbound queue depth per worker session (default: `8`).
    pub worker_queue_capacity: usize,
    /// WebSocket ping interval in seconds; `0` disables (default: `30`).
    pub worker_heartbeat_secs: u64,
    /// Directory for stored artifacts. Artifact storage is off when unset.
    pub artifact_dir: Option<PathBuf>,
    /// Public URL prefix under which `artifact_dir` is served.
    pub artifact_base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                           |
    /// |-------------------------|-----------------------------------|
    /// | `HOST`                  | `0.0.0.0`                         |
    /// | `PORT`                  | `8000`                            |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`           |
    /// | `REQUEST_TIMEOUT_SECS`  | `120`                             |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                              |
    /// | `JOB_TIMEOUT_SECS`      | `60`                              |
    /// | `WORKER_QUEUE_CAPACITY` | `8`                               |
    /// | `WORKER_HEARTBEAT_SECS` | `30`                              |
    /// | `ARTIFACT_DIR`          | unset                             |
    /// | `ARTIFACT_BASE_URL`     | `http://localhost:8000/artifacts` |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let job_timeout_secs: u64 = std::env::var("JOB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("JOB_TIMEOUT_SECS must be a valid u64");

        let worker_queue_capacity: usize = std::env::var("WORKER_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("WORKER_QUEUE_CAPACITY must be a valid usize");

        let worker_heartbeat_secs: u64 = std::env::var("WORKER_HEARTBEAT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("WORKER_HEARTBEAT_SECS must be a valid u64");

        let artifact_dir = std::env::var("ARTIFACT_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let artifact_base_url = std::env::var("ARTIFACT_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/artifacts".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            job_timeout_secs,
            worker_queue_capacity,
            worker_heartbeat_secs,
            artifact_dir,
            artifact_base_url,
        }
    }

    /// Settings applied to every accepted worker session.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            queue_capacity: self.worker_queue_capacity,
            heartbeat_interval: Some(Duration::from_secs(self.worker_heartbeat_secs)),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            job_timeout: (self.job_timeout_secs > 0)
                .then(|| Duration::from_secs(self.job_timeout_secs)),
        }
    }
}
