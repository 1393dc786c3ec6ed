use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for query cache operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub tables: BTreeMap<String, TableCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Target lifecycle
    pub target_adds: u64,
    pub target_updates: u64,
    pub target_removes: u64,
    pub targets_swept: u64,

    // Membership maintenance
    pub membership_inserts: u64,
    pub membership_removes: u64,

    // Scans
    pub rows_scanned: u64,
    pub orphans_reported: u64,

    // Sentinels
    pub sentinel_writes: u64,
    pub sentinel_removes: u64,

    pub metadata_writes: u64,
    pub corruption_detected: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub scans: u64,
    pub rows_scanned: u64,
    pub corruption_detected: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
/// Counter report for host endpoints and tests.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since the last reset.
    pub counters: Option<EventState>,
    /// Per-table counters, busiest table first.
    pub table_counters: Vec<TableSummary>,
}

///
/// TableSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub scans: u64,
    pub rows_scanned: u64,
    pub avg_rows_per_scan: f64,
    pub corruption_detected: u64,
}

/// Build a metrics report by inspecting in-memory counters only.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);
    let mut table_counters: Vec<TableSummary> = snap
        .tables
        .iter()
        .map(|(table, c)| TableSummary {
            table: table.clone(),
            scans: c.scans,
            rows_scanned: c.rows_scanned,
            avg_rows_per_scan: if c.scans > 0 {
                c.rows_scanned as f64 / c.scans as f64
            } else {
                0.0
            },
            corruption_detected: c.corruption_detected,
        })
        .collect();

    table_counters.sort_by(|a, b| {
        b.rows_scanned
            .cmp(&a.rows_scanned)
            .then_with(|| a.table.cmp(&b.table))
    });

    EventReport {
        counters: Some(snap),
        table_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.target_adds = 3;
            m.ops.membership_inserts = 2;
            m.tables.insert(
                "target".to_string(),
                TableCounters {
                    scans: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.target_adds, 0);
            assert_eq!(m.ops.membership_inserts, 0);
            assert!(m.tables.is_empty());
        });
        assert!(report().table_counters.is_empty());
    }

    #[test]
    fn report_sorts_tables_by_rows_scanned() {
        reset_all();
        with_state_mut(|m| {
            m.tables.insert(
                "document_target".to_string(),
                TableCounters {
                    scans: 2,
                    rows_scanned: 9,
                    ..Default::default()
                },
            );
            m.tables.insert(
                "target".to_string(),
                TableCounters {
                    scans: 1,
                    rows_scanned: 2,
                    ..Default::default()
                },
            );
            m.tables.insert(
                "query_target".to_string(),
                TableCounters {
                    scans: 3,
                    rows_scanned: 9,
                    ..Default::default()
                },
            );
        });

        let report = report();
        let tables: Vec<_> = report
            .table_counters
            .iter()
            .map(|t| t.table.as_str())
            .collect();

        assert_eq!(tables, ["document_target", "query_target", "target"]);
        assert_eq!(report.table_counters[0].avg_rows_per_scan, 4.5);
        assert_eq!(report.table_counters[1].avg_rows_per_scan, 3.0);
    }
}
