#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use autorender_core::protocol::{parse_reply, JobAnnouncement, RenderReply};
use autorender_core::types::JobId;
use autorender_worker::client::run_session;
use autorender_worker::error::{FetchError, ScreenshotError, WorkerError};
use autorender_worker::fetch::HtmlSource;
use autorender_worker::job::JobRunner;
use autorender_worker::screenshot::Screenshotter;

/// Serves HTML for the jobs it has been told about.
#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<HashMap<JobId, String>>,
}

impl FakeSource {
    pub fn add(&self, html: &str) -> JobId {
        let id = JobId::new();
        self.pages.lock().unwrap().insert(id, html.to_string());
        id
    }
}

#[async_trait]
impl HtmlSource for FakeSource {
    async fn fetch(&self, job_id: JobId) -> Result<String, FetchError> {
        self.pages
            .lock()
            .unwrap()
            .get(&job_id)
            .cloned()
            .ok_or(FetchError::NotFound(job_id))
    }
}

/// "Screenshots" a page as `png:<html>`, failing a set number of times first.
#[derive(Default)]
pub struct FakeScreenshotter {
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FakeScreenshotter {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Screenshotter for FakeScreenshotter {
    async fn capture(&self, html: &str) -> Result<Vec<u8>, ScreenshotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ScreenshotError::Missing);
        }
        Ok(format!("png:{html}").into_bytes())
    }
}

pub fn runner(
    source: &Arc<FakeSource>,
    screenshotter: &Arc<FakeScreenshotter>,
    attempts: u32,
) -> JobRunner {
    JobRunner::new(
        Arc::clone(source) as Arc<dyn HtmlSource>,
        Arc::clone(screenshotter) as Arc<dyn Screenshotter>,
        attempts,
    )
}

/// A `run_session` task driven over in-memory channels.
pub struct Harness {
    pub to_worker: mpsc::UnboundedSender<Result<Message, tungstenite::Error>>,
    pub from_worker: mpsc::UnboundedReceiver<Message>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<Result<(), WorkerError>>,
}

impl Harness {
    pub fn spawn(runner: JobRunner) -> Self {
        let (to_worker, mut inbound) = mpsc::unbounded();
        let (mut outbound, from_worker) = mpsc::unbounded();
        let cancel = CancellationToken::new();

        let session_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            run_session(&mut outbound, &mut inbound, &runner, &session_cancel).await
        });

        Self {
            to_worker,
            from_worker,
            cancel,
            task,
        }
    }

    pub fn announce(&self, id: JobId) {
        let text = serde_json::to_string(&JobAnnouncement { id }).unwrap();
        self.send(Message::Text(text));
    }

    pub fn send(&self, message: Message) {
        self.to_worker.unbounded_send(Ok(message)).unwrap();
    }

    /// Next reply from the worker, or `None` if nothing arrives in time.
    pub async fn next_reply(&mut self, within: Duration) -> Option<RenderReply> {
        match tokio::time::timeout(within, self.from_worker.next()).await {
            Ok(Some(Message::Text(text))) => Some(parse_reply(&text).unwrap()),
            Ok(Some(other)) => panic!("unexpected frame from worker: {other:?}"),
            Ok(None) | Err(_) => None,
        }
    }

    pub async fn reply(&mut self) -> RenderReply {
        self.next_reply(Duration::from_secs(2))
            .await
            .expect("worker did not reply")
    }

    pub async fn finish(self) -> Result<(), WorkerError> {
        tokio::time::timeout(Duration::from_secs(2), self.task)
            .await
            .expect("session did not end")
            .unwrap()
    }
}

pub fn png_payload(html: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(format!("png:{html}"))
}
