//! Execution instrumentation for concurrency assertions.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use jiff::Timestamp;
use serde::Serialize;

/// One recorded execution interval.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSpan {
    /// Node display name.
    pub node: String,
    /// When the node's work started.
    pub started_at: Timestamp,
    /// When the node's work finished.
    pub finished_at: Timestamp,
}

impl ProbeSpan {
    /// Returns whether two spans overlap in time.
    pub fn overlaps(&self, other: &ProbeSpan) -> bool {
        self.started_at < other.finished_at && other.started_at < self.finished_at
    }
}

/// Shared probe recording execution intervals and peak concurrency.
///
/// Mock nodes call [`RunProbe::begin`] when their work unit starts and
/// [`RunProbe::end`] when it finishes; tests then assert on the observed
/// peak and on per-node interval overlaps.
#[derive(Debug, Default)]
pub struct RunProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
    spans: Mutex<Vec<ProbeSpan>>,
    open: Mutex<Vec<(String, Timestamp)>>,
}

impl RunProbe {
    /// Creates an empty probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a node's work.
    pub fn begin(&self, node: &str) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Ok(mut open) = self.open.lock() {
            open.push((node.to_owned(), Timestamp::now()));
        }
    }

    /// Records the end of a node's work.
    pub fn end(&self, node: &str) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        let started_at = self.open.lock().ok().and_then(|mut open| {
            open.iter()
                .rposition(|(name, _)| name == node)
                .map(|i| open.remove(i).1)
        });
        if let (Some(started_at), Ok(mut spans)) = (started_at, self.spans.lock()) {
            spans.push(ProbeSpan {
                node: node.to_owned(),
                started_at,
                finished_at: Timestamp::now(),
            });
        }
    }

    /// Returns the highest number of simultaneously running nodes seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Returns all recorded spans.
    pub fn spans(&self) -> Vec<ProbeSpan> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Returns the recorded span for a node, if any.
    pub fn span_of(&self, node: &str) -> Option<ProbeSpan> {
        self.spans().into_iter().find(|s| s.node == node)
    }

    /// Returns whether the recorded spans of two nodes overlap.
    pub fn overlapped(&self, a: &str, b: &str) -> bool {
        match (self.span_of(a), self.span_of(b)) {
            (Some(a), Some(b)) => a.overlaps(&b),
            _ => false,
        }
    }

    /// Returns node names in the order their work finished.
    pub fn finish_order(&self) -> Vec<String> {
        let mut spans = self.spans();
        spans.sort_by_key(|s| s.finished_at);
        spans.into_iter().map(|s| s.node).collect()
    }
}
