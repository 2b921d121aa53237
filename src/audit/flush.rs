//! Periodic hand-off of queued audit events to a persistence sink
//!
//! The sink is an external collaborator (database, log pipeline). A failed
//! flush re-queues its batch so the next tick can retry it.

use super::queue::{AuditEvent, AuditQueue};
use crate::config::AuditConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Destination for batches of audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist a batch. An error leaves the batch queued for retry.
    async fn persist(&self, events: &[AuditEvent]) -> Result<()>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}

/// Sink that emits each event as a structured `tracing` record.
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    async fn persist(&self, events: &[AuditEvent]) -> Result<()> {
        for event in events {
            tracing::info!(
                target: "veil::audit",
                id = %event.id,
                user_id = event.user_id.as_deref().unwrap_or("-"),
                request_id = event.request_id.as_deref().unwrap_or("-"),
                endpoint = event.endpoint.as_deref().unwrap_or("-"),
                tool = event.tool_name.as_deref().unwrap_or("-"),
                mode = %event.masking_mode,
                total = event.total_masked,
                "PII masked"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Drain the queue into `sink` once. Returns the number of events persisted.
pub async fn flush_once(queue: &AuditQueue, sink: &dyn AuditSink) -> Result<usize> {
    let batch = queue.drain();
    if batch.is_empty() {
        return Ok(0);
    }

    match sink.persist(&batch).await {
        Ok(()) => {
            tracing::debug!(sink = sink.name(), count = batch.len(), "Flushed audit events");
            Ok(batch.len())
        }
        Err(e) => {
            let count = batch.len();
            queue.requeue(batch);
            tracing::warn!(sink = sink.name(), count, error = %e, "Audit flush failed; events re-queued");
            Err(e)
        }
    }
}

/// Spawn a background task that flushes `queue` into `sink` every
/// `interval`. Abort the returned handle to stop it.
pub fn spawn_flusher(
    queue: Arc<AuditQueue>,
    sink: Arc<dyn AuditSink>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // errors are already logged and the batch re-queued
            let _ = flush_once(&queue, sink.as_ref()).await;
        }
    })
}

/// Spawn a flusher at the configured interval. Returns `None` when auditing
/// is disabled in configuration.
pub fn spawn_configured_flusher(
    config: &AuditConfig,
    queue: Arc<AuditQueue>,
    sink: Arc<dyn AuditSink>,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        return None;
    }
    tracing::debug!(
        sink = sink.name(),
        interval_secs = config.flush_interval().as_secs(),
        "Starting audit flusher"
    );
    Some(spawn_flusher(queue, sink, config.flush_interval()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditMetadata;
    use crate::error::Error;
    use crate::masking::{MaskingStats, PiiCategory};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for MemorySink {
        async fn persist(&self, events: &[AuditEvent]) -> Result<()> {
            self.events.lock().await.extend_from_slice(events);
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn persist(&self, _events: &[AuditEvent]) -> Result<()> {
            Err(Error::Audit("database unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn queue_with(n: usize) -> AuditQueue {
        let queue = AuditQueue::new(100);
        let mut stats = MaskingStats::new();
        stats.add(PiiCategory::Email);
        for _ in 0..n {
            queue.log_masking_event(&stats, AuditMetadata::default());
        }
        queue
    }

    #[tokio::test]
    async fn test_flush_once() {
        let queue = queue_with(3);
        let sink = MemorySink::default();

        let flushed = flush_once(&queue, &sink).await.unwrap();
        assert_eq!(flushed, 3);
        assert!(queue.is_empty());
        assert_eq!(sink.events.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_flush_empty_queue() {
        let queue = AuditQueue::new(10);
        let sink = MemorySink::default();
        assert_eq!(flush_once(&queue, &sink).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_flush_requeues() {
        let queue = queue_with(2);
        let result = flush_once(&queue, &FailingSink).await;
        assert!(result.is_err());
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let queue = queue_with(1);
        assert_eq!(flush_once(&queue, &TracingSink).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_configured_flusher_respects_enabled() {
        let queue = Arc::new(queue_with(1));
        let sink: Arc<dyn AuditSink> = Arc::new(MemorySink::default());

        let disabled = AuditConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(spawn_configured_flusher(&disabled, queue.clone(), sink.clone()).is_none());

        let handle = spawn_configured_flusher(&AuditConfig::default(), queue.clone(), sink)
            .expect("flusher should start when enabled");
        // the first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_flusher() {
        let queue = Arc::new(queue_with(2));
        let sink = Arc::new(MemorySink::default());

        let handle = spawn_flusher(queue.clone(), sink.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(queue.is_empty());
        assert_eq!(sink.events.lock().await.len(), 2);
    }
}
