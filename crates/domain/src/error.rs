/// Shared error type used across the o5 crates.
///
/// Every variant is a construction-time failure. Queries against a
/// constructed schedule never return an error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid date: '{0}'")]
    InvalidDate(String),

    #[error("invalid time of day: '{0}'")]
    InvalidTime(String),

    #[error("invalid interval '{value}': {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("inverted range: {0}")]
    InvertedRange(String),

    #[error("exception on {date}: window {window} ends before it starts")]
    InvertedWindow { date: String, window: String },

    #[error("invalid weekday {0}: expected 1 (Monday) through 7 (Sunday)")]
    InvalidWeekday(i64),

    #[error("invalid day '{0}': expected a number from 1 (Monday) to 7 (Sunday)")]
    InvalidDayText(String),

    #[error("recurring schedule has an empty day list")]
    EmptyWeekdays,

    #[error("unsupported schedule shape: {0}")]
    UnsupportedShape(String),

    #[error("invalid timezone: '{0}'")]
    InvalidTimezone(String),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
