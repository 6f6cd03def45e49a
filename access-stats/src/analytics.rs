use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, Months, NaiveDate};
use serde::Serialize;

use crate::{
    error::AnalysisError,
    invariants::{IsoWeekKey, MonthKey, StatusClass},
    models::LogRecord,
};

const RECENT_WINDOW: Months = Months::new(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub first: DateTime<FixedOffset>,
    pub last: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub redirects: usize,
    pub redirect_fraction: f64,
    pub client_errors: usize,
    pub client_error_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestFrequency {
    pub request: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestExtremes {
    pub most: RequestFrequency,
    pub least: RequestFrequency,
}

/// Records from `cutoff` onwards; always a suffix of the time-sorted records.
#[derive(Debug, Clone, Copy)]
pub struct RecentWindow<'a> {
    pub cutoff: DateTime<FixedOffset>,
    pub records: &'a [LogRecord],
}

/// Aggregate statistics over one parsed access log.
#[derive(Debug)]
pub struct Analytics {
    // sorted by timestamp; equal instants keep their input order
    records: Vec<LogRecord>,
    // request line counts in order of first appearance in the input
    requests: Vec<(String, usize)>,
}

impl Analytics {
    pub fn new(mut records: Vec<LogRecord>) -> Self {
        let requests = request_frequencies(&records);
        records.sort_by_key(|r| *r.timestamp());
        Self { records, requests }
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn per_day(&self) -> BTreeMap<NaiveDate, usize> {
        self.count_by(|ts| ts.date_naive())
    }

    pub fn per_week(&self) -> BTreeMap<IsoWeekKey, usize> {
        self.count_by(IsoWeekKey::of)
    }

    pub fn per_month(&self) -> BTreeMap<MonthKey, usize> {
        self.count_by(MonthKey::of)
    }

    pub fn status_summary(&self) -> Result<StatusSummary, AnalysisError> {
        let total = self.records.len();
        if total == 0 {
            return Err(AnalysisError::InsufficientData);
        }
        let (mut redirects, mut client_errors) = (0, 0);
        for record in &self.records {
            match record.status().class() {
                StatusClass::Redirect => redirects += 1,
                StatusClass::ClientError => client_errors += 1,
                _ => {}
            }
        }
        Ok(StatusSummary {
            total,
            redirects,
            redirect_fraction: redirects as f64 / total as f64,
            client_errors,
            client_error_fraction: client_errors as f64 / total as f64,
        })
    }

    /// Most and least requested request lines. Ties go to the line seen first.
    pub fn request_extremes(&self) -> Result<RequestExtremes, AnalysisError> {
        let most = self
            .requests
            .iter()
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best });
        let least = self
            .requests
            .iter()
            .reduce(|best, candidate| if candidate.1 < best.1 { candidate } else { best });
        match (most, least) {
            (Some(most), Some(least)) => Ok(RequestExtremes {
                most: most.into(),
                least: least.into(),
            }),
            _ => Err(AnalysisError::InsufficientData),
        }
    }

    pub fn date_range(&self) -> Result<DateRange, AnalysisError> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => Ok(DateRange {
                first: *first.timestamp(),
                last: *last.timestamp(),
            }),
            _ => Err(AnalysisError::InsufficientData),
        }
    }

    /// Records no earlier than six calendar months before the last one.
    ///
    /// The cutoff keeps the last record's time of day and offset. When the
    /// target month is shorter, the day is clamped to its last day, so
    /// 31 August yields 28 (or 29) February.
    pub fn last_six_months(&self) -> Result<RecentWindow<'_>, AnalysisError> {
        let last = self.date_range()?.last;
        let cutoff = last
            .checked_sub_months(RECENT_WINDOW)
            .ok_or(AnalysisError::OutOfRange(last))?;
        let start = self.records.partition_point(|r| *r.timestamp() < cutoff);
        Ok(RecentWindow {
            cutoff,
            records: &self.records[start..],
        })
    }

    fn count_by<K: Ord>(&self, key: impl Fn(&DateTime<FixedOffset>) -> K) -> BTreeMap<K, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(key(record.timestamp())).or_default() += 1;
        }
        counts
    }
}

impl From<&(String, usize)> for RequestFrequency {
    fn from((request, count): &(String, usize)) -> Self {
        Self {
            request: request.clone(),
            count: *count,
        }
    }
}

fn request_frequencies(records: &[LogRecord]) -> Vec<(String, usize)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        let slot = *slots.entry(record.request().as_str()).or_insert_with(|| {
            counts.push((record.request().clone(), 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }
    counts
}
