use serde::Serialize;

/// Structured trace events emitted across the o5 crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ScheduleBuilt {
        shape: String,
        timezone: String,
        intervals: usize,
        components: usize,
        exception_dates: usize,
    },
    FragmentPartIgnored {
        shape: String,
        part: String,
        entries: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "o5_event");
    }
}
