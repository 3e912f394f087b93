use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Schedule resolution configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tuning for how daily periods are coalesced into continuous spans.
///
/// The defaults reproduce the Open511 reference behaviour: two daily
/// periods separated by at most one minute are merged, and a span stops
/// absorbing further days once it is 60 days long. The cap keeps work
/// bounded for recurring schedules without an end date, so long events
/// are reported as several consecutive spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone used when a caller does not supply one.
    #[serde(default = "d_default_timezone")]
    pub default_timezone: String,

    /// Largest gap (in seconds) between two periods that still counts
    /// as continuous.
    #[serde(default = "d_merge_gap_seconds")]
    pub merge_gap_seconds: u64,

    /// Span length (in days) after which no further periods are merged.
    #[serde(default = "d_max_continuous_days")]
    pub max_continuous_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_timezone: d_default_timezone(),
            merge_gap_seconds: d_merge_gap_seconds(),
            max_continuous_days: d_max_continuous_days(),
        }
    }
}

fn d_default_timezone() -> String {
    "UTC".into()
}

fn d_merge_gap_seconds() -> u64 {
    60
}

fn d_max_continuous_days() -> u32 {
    60
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
