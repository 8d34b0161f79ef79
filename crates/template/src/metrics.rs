use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Counters for the render path.
///
/// All updates use `Ordering::Relaxed`; a snapshot may tear slightly across
/// fields, which is fine for observability.
#[derive(Debug, Default)]
pub struct RenderMetrics {
    renders: AtomicU64,
    failures: AtomicU64,
    bytes_rendered: AtomicU64,
    sql_escapes: AtomicU64,
    sql_emergency_escapes: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderMetricsSnapshot {
    pub renders: u64,
    pub failures: u64,
    pub bytes_rendered: u64,
    pub sql_escapes: u64,
    pub sql_emergency_escapes: u64,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_render(&self, bytes: usize) {
        self.renders.fetch_add(1, Ordering::Relaxed);
        self.bytes_rendered.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sql_escape(&self, degraded: bool) {
        self.sql_escapes.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.sql_emergency_escapes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> RenderMetricsSnapshot {
        RenderMetricsSnapshot {
            renders: self.renders.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes_rendered: self.bytes_rendered.load(Ordering::Relaxed),
            sql_escapes: self.sql_escapes.load(Ordering::Relaxed),
            sql_emergency_escapes: self.sql_emergency_escapes.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.renders.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.bytes_rendered.store(0, Ordering::Relaxed);
        self.sql_escapes.store(0, Ordering::Relaxed);
        self.sql_emergency_escapes.store(0, Ordering::Relaxed);
    }
}
