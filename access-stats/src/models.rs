use std::fmt;

use chrono::{DateTime, FixedOffset};
use derive_getters::Getters;

use crate::invariants::{Hostname, StatusCode};

/// `strftime` layout of the bracketed timestamp, e.g. `01/Jun/1995:00:00:59 -0600`.
pub const APACHE_TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Stands in for an unknown identity or response size.
pub const PLACEHOLDER: &str = "-";

/// One access log line that matched the Combined Log grammar.
///
/// Only the parser builds these; everything else reads them through the getters.
/// An identity of `-` is stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct LogRecord {
    pub(crate) host: Hostname,
    pub(crate) identity: Option<String>,
    pub(crate) user_id: String,
    pub(crate) timestamp: DateTime<FixedOffset>,
    pub(crate) request: String,
    pub(crate) status: StatusCode,
    pub(crate) response_size: Option<u64>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}] \"{}\" {} ",
            self.host,
            self.identity.as_deref().unwrap_or(PLACEHOLDER),
            self.user_id,
            self.timestamp.format(APACHE_TIMESTAMP_FORMAT),
            self.request,
            self.status
        )?;
        match self.response_size {
            Some(size) => write!(f, "{size}"),
            None => f.write_str(PLACEHOLDER),
        }
    }
}
