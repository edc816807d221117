//! Summary statistics over a recording's event log.
//!
//! Pure aggregation: counts per kind plus a handful of headline counters
//! (console output, script errors, DOM churn, clicks, masked events).
//! Deterministic for a given log, so repeated analysis of the same
//! stopped session always agrees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{kind, RecordedEvent};
use crate::query::counts_by_type;

/// Summary of one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_events: usize,
    pub counts_by_event_type: BTreeMap<String, usize>,
    pub console_logs: usize,
    pub js_errors: usize,
    /// Events whose kind names a DOM mutation (`dom_`-prefixed).
    pub dom_mutations: usize,
    pub clicks: usize,
    /// Events the masking filter redacted.
    pub masked_events: usize,
}

/// Computes the summary for an event log.
pub fn analyze(events: &[RecordedEvent]) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        total_events: events.len(),
        counts_by_event_type: counts_by_type(events),
        console_logs: 0,
        js_errors: 0,
        dom_mutations: 0,
        clicks: 0,
        masked_events: 0,
    };

    for event in events {
        match event.kind.as_str() {
            kind::CONSOLE_LOG => summary.console_logs += 1,
            kind::JS_ERROR => summary.js_errors += 1,
            kind::CLICK => summary.clicks += 1,
            other if other.starts_with("dom_") => summary.dom_mutations += 1,
            _ => {}
        }
        if event.masked {
            summary.masked_events += 1;
        }
    }

    summary
}
