// Throttling for one noisy, recurring warning
//
// counting (0-3 matches) -> suppressing (600 s window) -> counting, forever.

use super::event::{Level, LogEvent};
use chrono::{DateTime, Duration, Local};
use std::sync::Mutex;

/// Matches allowed through before suppression starts
pub const PASS_THROUGH_COUNT: u32 = 3;

/// Length of a suppression window
pub const SUPPRESSION_WINDOW_SECS: i64 = 600;

/// Minimum spacing between summaries while suppressing
pub const SUMMARY_INTERVAL_SECS: i64 = 3600;

/// Default source whose heartbeat warnings get throttled
pub const DEFAULT_SOURCE: &str = "discord";

/// Default pattern of the throttled warning
pub const DEFAULT_PATTERN: &str = "heartbeat blocked for more than";

#[derive(Debug, Default)]
struct SuppressionState {
    count: u32,
    last_match: Option<DateTime<Local>>,
    last_summary: Option<DateTime<Local>>,
    suppressing: bool,
    suppression_start: Option<DateTime<Local>>,
    dropped_since_summary: u64,
}

/// Filter that lets a recurring warning through a few times, then mostly
/// drops it for a while
#[derive(Debug)]
pub struct SuppressionFilter {
    source: String,
    pattern: String,
    state: Mutex<SuppressionState>,
}

impl Default for SuppressionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE, DEFAULT_PATTERN)
    }
}

impl SuppressionFilter {
    pub fn new(source: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pattern: pattern.into(),
            state: Mutex::new(SuppressionState::default()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the filter is currently dropping matches
    pub fn is_suppressing(&self) -> bool {
        self.state.lock().map(|s| s.suppressing).unwrap_or(false)
    }

    /// Time of the most recent matching event
    pub fn last_match(&self) -> Option<DateTime<Local>> {
        self.state.lock().ok().and_then(|s| s.last_match)
    }

    fn matches(&self, event: &LogEvent) -> bool {
        event.level == Level::Warning
            && event.component == self.source
            && event.message.contains(&self.pattern)
    }

    /// Pass, rewrite or drop an event
    ///
    /// Returns `None` when the event is dropped.
    pub fn filter(&self, event: LogEvent, now: DateTime<Local>) -> Option<LogEvent> {
        if !self.matches(&event) {
            return Some(event);
        }

        let Ok(mut state) = self.state.lock() else {
            return Some(event);
        };
        state.last_match = Some(now);

        if state.suppressing {
            let started = state.suppression_start.unwrap_or(now);
            if now.signed_duration_since(started) > Duration::seconds(SUPPRESSION_WINDOW_SECS) {
                state.suppressing = false;
                state.suppression_start = None;
                state.count = 0;
                return Some(event);
            }

            state.count += 1;
            state.dropped_since_summary += 1;

            let summary_due = state
                .last_summary
                .map(|at| now.signed_duration_since(at) >= Duration::seconds(SUMMARY_INTERVAL_SECS))
                .unwrap_or(false);
            if summary_due {
                let dropped = state.dropped_since_summary;
                state.dropped_since_summary = 0;
                state.last_summary = Some(now);
                return Some(event.rewritten(format!(
                    "{} warnings suppressed in the last hour ({})",
                    dropped, self.pattern
                )));
            }
            return None;
        }

        state.count += 1;
        if state.count <= PASS_THROUGH_COUNT {
            return Some(event);
        }

        state.suppressing = true;
        state.suppression_start = Some(now);
        if state.last_summary.is_none() {
            state.last_summary = Some(now);
        }
        Some(event.rewritten(format!(
            "Suppressing repeated warnings ({}) after {} occurrences: {}",
            self.pattern, state.count, event.message
        )))
    }
}
