//! In-memory audit queue for masking events
//!
//! Events carry counts and request metadata only, never raw values or
//! placeholder-to-value mappings. The queue is bounded: once full, the
//! oldest event is dropped and counted.

use crate::config::AuditConfig;
use crate::masking::{MaskingMode, MaskingStats, MessageRole, PiiCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Request metadata attached to a masking event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub endpoint: Option<String>,
    pub tool_name: Option<String>,
    pub masking_mode: MaskingMode,
    pub message_role: Option<MessageRole>,
}

/// A recorded masking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub endpoint: Option<String>,
    pub tool_name: Option<String>,
    pub masking_mode: MaskingMode,
    pub message_role: Option<MessageRole>,
    pub total_masked: usize,
    pub per_category_counts: BTreeMap<PiiCategory, usize>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(stats: &MaskingStats, metadata: AuditMetadata) -> Self {
        Self {
            id: format!("mask-{}", uuid::Uuid::new_v4()),
            user_id: metadata.user_id,
            request_id: metadata.request_id,
            endpoint: metadata.endpoint,
            tool_name: metadata.tool_name,
            masking_mode: metadata.masking_mode,
            message_role: metadata.message_role,
            total_masked: stats.total,
            per_category_counts: stats.counts.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded buffer of masking events awaiting an external flush.
pub struct AuditQueue {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
    enabled: AtomicBool,
    total_recorded: AtomicU64,
    dropped: AtomicU64,
}

impl AuditQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            enabled: AtomicBool::new(true),
            total_recorded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        let queue = Self::new(config.capacity);
        if !config.enabled {
            queue.disable();
        }
        queue
    }

    /// Enqueue an event for `stats`. Returns whether an event was queued:
    /// nothing is recorded when no values were masked or the queue is
    /// disabled.
    pub fn log_masking_event(&self, stats: &MaskingStats, metadata: AuditMetadata) -> bool {
        if stats.total == 0 || !self.is_enabled() {
            return false;
        }
        self.push(AuditEvent::new(stats, metadata));
        true
    }

    /// Suspend all future enqueuing. Masking is unaffected.
    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::SeqCst) {
            tracing::info!("Masking audit queue disabled");
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Take every buffered event, oldest first.
    pub fn drain(&self) -> Vec<AuditEvent> {
        self.lock().drain(..).collect()
    }

    /// Put events back at the front after a failed flush, keeping order.
    /// Events that no longer fit are dropped.
    pub fn requeue(&self, events: Vec<AuditEvent>) {
        let mut queue = self.lock();
        let room = self.capacity.saturating_sub(queue.len());
        let overflow = events.len().saturating_sub(room);
        if overflow > 0 {
            self.dropped.fetch_add(overflow as u64, Ordering::Relaxed);
            tracing::warn!(dropped = overflow, "Audit queue full; dropping re-queued events");
        }
        // keep the newest of the returned events
        for event in events.into_iter().skip(overflow).rev() {
            queue.push_front(event);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events ever accepted, including ones since drained or dropped.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded.load(Ordering::Relaxed)
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn push(&self, event: AuditEvent) {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(dropped, capacity = self.capacity, "Audit queue full; dropping oldest event");
        }
        queue.push_back(event);
        self.total_recorded.fetch_add(1, Ordering::Relaxed);
    }

    // A panic while holding the lock leaves plain event data behind,
    // which is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AuditQueue {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
