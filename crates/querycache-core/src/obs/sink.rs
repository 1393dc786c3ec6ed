//! Metrics sink boundary.
//!
//! Cache logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the global metrics state.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// TargetOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetOp {
    Add,
    Update,
    Remove,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    Target {
        op: TargetOp,
    },
    TargetsSwept {
        removed: u64,
    },
    MembershipDelta {
        inserts: u64,
        removes: u64,
    },
    RowsScanned {
        table: &'static str,
        rows_scanned: u64,
    },
    OrphansReported {
        count: u64,
    },
    SentinelDelta {
        writes: u64,
        removes: u64,
    },
    MetadataWrite,
    Corruption {
        table: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::Target { op } => metrics::with_state_mut(|m| match op {
                TargetOp::Add => m.ops.target_adds = m.ops.target_adds.saturating_add(1),
                TargetOp::Update => {
                    m.ops.target_updates = m.ops.target_updates.saturating_add(1);
                }
                TargetOp::Remove => {
                    m.ops.target_removes = m.ops.target_removes.saturating_add(1);
                }
            }),

            MetricsEvent::TargetsSwept { removed } => {
                metrics::with_state_mut(|m| {
                    m.ops.targets_swept = m.ops.targets_swept.saturating_add(removed);
                });
            }

            MetricsEvent::MembershipDelta { inserts, removes } => {
                metrics::with_state_mut(|m| {
                    m.ops.membership_inserts = m.ops.membership_inserts.saturating_add(inserts);
                    m.ops.membership_removes = m.ops.membership_removes.saturating_add(removes);
                });
            }

            MetricsEvent::RowsScanned {
                table,
                rows_scanned,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.scans = entry.scans.saturating_add(1);
                    entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
                });
            }

            MetricsEvent::OrphansReported { count } => {
                metrics::with_state_mut(|m| {
                    m.ops.orphans_reported = m.ops.orphans_reported.saturating_add(count);
                });
            }

            MetricsEvent::SentinelDelta { writes, removes } => {
                metrics::with_state_mut(|m| {
                    m.ops.sentinel_writes = m.ops.sentinel_writes.saturating_add(writes);
                    m.ops.sentinel_removes = m.ops.sentinel_removes.saturating_add(removes);
                });
            }

            MetricsEvent::MetadataWrite => {
                metrics::with_state_mut(|m| {
                    m.ops.metadata_writes = m.ops.metadata_writes.saturating_add(1);
                });
            }

            MetricsEvent::Corruption { table } => {
                metrics::with_state_mut(|m| {
                    m.ops.corruption_detected = m.ops.corruption_detected.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.corruption_detected = entry.corruption_detected.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` restores the previous pointer on every exit,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized, matching the borrow used
        //   to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics counters on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
