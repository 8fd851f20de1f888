use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::pingback::{DirectoryPingResult, DirectoryPinger, ExternalUrlsPinger, PingOutcome};
use crate::repositories::ContentRepository;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Everything sent for one published item.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PingReport {
    pub content_id: i64,
    pub pingbacks: Vec<PingOutcome>,
    pub directories: Vec<(String, DirectoryPingResult)>,
}

/// Runs the outbound pingers for one item at a time.
#[derive(Clone)]
pub struct PingWorker {
    repository: Arc<dyn ContentRepository>,
    external: ExternalUrlsPinger,
    directories: Vec<DirectoryPinger>,
}

impl PingWorker {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        external: ExternalUrlsPinger,
        directories: Vec<DirectoryPinger>,
    ) -> Self {
        Self {
            repository,
            external,
            directories,
        }
    }

    /// Ping for `content_id`; `None` when it is unknown or not published.
    pub async fn process(&self, content_id: i64) -> Option<PingReport> {
        let item = match self.repository.get_content(content_id).await {
            Ok(Some(item)) if item.is_published() => item,
            Ok(_) => {
                info!(content_id, "content missing or unpublished, nothing to ping");
                return None;
            }
            Err(e) => {
                error!(content_id, error = %e, "failed to load content");
                return None;
            }
        };

        let pingbacks = self.external.ping_item(&item).await;
        for outcome in &pingbacks {
            if outcome.is_error {
                warn!(target = %outcome.target, message = %outcome.message, "pingback failed");
            }
        }

        let mut directories = Vec::with_capacity(self.directories.len());
        for pinger in &self.directories {
            let result = pinger.ping_item(&item).await;
            directories.push((pinger.directory().to_string(), result));
        }

        info!(
            content_id,
            pingbacks = pingbacks.len(),
            directories = directories.len(),
            "outbound pings done"
        );
        Some(PingReport {
            content_id,
            pingbacks,
            directories,
        })
    }
}

/// Handle for queueing outbound pings without waiting for them.
#[derive(Clone)]
pub struct PingDispatcher {
    sender: mpsc::Sender<i64>,
}

impl PingDispatcher {
    /// Start the background task; it stops when `shutdown_token` is cancelled
    /// or every handle is dropped.
    pub fn spawn(
        worker: PingWorker,
        capacity: usize,
        shutdown_token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(
            Self::run(worker, receiver, shutdown_token).instrument(info_span!("dispatcher")),
        );
        (Self { sender }, handle)
    }

    /// Queue `content_id`; returns `false` when the request was dropped.
    pub fn notify_published(&self, content_id: i64) -> bool {
        match self.sender.try_send(content_id) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(content_id, "ping queue full, dropping request");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(content_id, "ping dispatcher stopped, dropping request");
                false
            }
        }
    }

    async fn run(
        worker: PingWorker,
        mut receiver: mpsc::Receiver<i64>,
        shutdown_token: CancellationToken,
    ) {
        info!("ping dispatcher started");
        while let Some(content_id) = tokio::select! {
            _ = shutdown_token.cancelled() => None,
            next = receiver.recv() => next,
        } {
            worker
                .process(content_id)
                .instrument(info_span!("ping_batch", content_id))
                .await;
        }
        info!("ping dispatcher shutting down");
    }
}
