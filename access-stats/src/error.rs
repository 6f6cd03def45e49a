use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("insufficient data: the log contains no parsable records")]
    InsufficientData,

    #[error("six months before {0} is outside the supported date range")]
    OutOfRange(DateTime<FixedOffset>),
}
