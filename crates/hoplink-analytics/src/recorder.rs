use crate::classify::UaClassifier;
use crate::request::RequestMetadata;
use jiff::Timestamp;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use hoplink_core::{ClickEvent, LinkStore, ShortCode};

/// Default depth of the click queue. Clicks arriving while the queue is
/// full are dropped, which bounds both memory and analytics staleness
/// under load.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

struct ClickJob {
    code: ShortCode,
    meta: RequestMetadata,
}

struct ClickWriter {
    store: Arc<dyn LinkStore>,
    classifier: Arc<dyn UaClassifier>,
}

impl ClickWriter {
    fn build_event(&self, meta: &RequestMetadata) -> ClickEvent {
        let user_agent = meta.user_agent_or_unknown();
        let profile = self.classifier.classify(&user_agent);

        ClickEvent {
            timestamp: Timestamp::now(),
            ip: meta.client_ip(),
            user_agent,
            referrer: meta.referrer_or_direct(),
            device: profile.device,
            browser: profile.browser,
            os: profile.os,
            country: None,
        }
    }

    /// Applies one click: bump the counter, append the event. Failures
    /// are logged and dropped; there is no retry and no caller to
    /// propagate to.
    async fn write(&self, code: &ShortCode, meta: &RequestMetadata) {
        let event = self.build_event(meta);

        if let Err(e) = self.store.increment_clicks(code).await {
            warn!(code = %code, error = %e, "failed to increment click count");
            return;
        }
        if let Err(e) = self.store.append_click_event(code, event).await {
            warn!(code = %code, error = %e, "failed to append click event");
        }
    }
}

/// Records clicks without ever blocking the redirect that produced them.
///
/// `dispatch` pushes onto a bounded queue drained by a single worker
/// task; `record_now` takes the same write path inline for callers that
/// want the click durable before responding (the cold-cache resolve
/// path). Cloning the recorder shares the queue and worker.
#[derive(Clone)]
pub struct ClickRecorder {
    tx: mpsc::Sender<ClickJob>,
    writer: Arc<ClickWriter>,
}

impl ClickRecorder {
    /// Spawns the worker task and returns a handle to it.
    pub fn spawn(store: Arc<dyn LinkStore>, classifier: Arc<dyn UaClassifier>) -> Self {
        Self::with_queue_depth(store, classifier, DEFAULT_QUEUE_DEPTH)
    }

    pub fn with_queue_depth(
        store: Arc<dyn LinkStore>,
        classifier: Arc<dyn UaClassifier>,
        queue_depth: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<ClickJob>(queue_depth);
        let writer = Arc::new(ClickWriter { store, classifier });

        let worker = Arc::clone(&writer);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                worker.write(&job.code, &job.meta).await;
            }
            debug!("click recorder worker stopped");
        });

        Self { tx, writer }
    }

    /// Enqueues a click for background recording. Returns immediately;
    /// a full or closed queue drops the event with a log line.
    pub fn dispatch(&self, code: ShortCode, meta: RequestMetadata) {
        if let Err(e) = self.tx.try_send(ClickJob { code, meta }) {
            warn!(error = %e, "click queue rejected event, dropping");
        }
    }

    /// Records a click inline. Errors are already absorbed by the write
    /// path, so this cannot fail — it can only take a moment.
    pub async fn record_now(&self, code: &ShortCode, meta: &RequestMetadata) {
        self.writer.write(code, meta).await;
    }
}
