use std::{
    collections::BTreeMap,
    fmt, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, NaiveDate};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::{
    analytics::{Analytics, DateRange, RequestExtremes, StatusSummary},
    error::AnalysisError,
    invariants::{IsoWeekKey, MonthKey},
    models::LogRecord,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything the aggregator knows about one log, ready for rendering.
#[derive(Debug, Serialize)]
pub struct Report {
    pub range: DateRange,
    pub total_requests: usize,
    pub six_month_cutoff: DateTime<FixedOffset>,
    pub last_six_months: usize,
    pub status: StatusSummary,
    pub requests: RequestExtremes,
    pub per_day: BTreeMap<NaiveDate, usize>,
    pub per_week: BTreeMap<IsoWeekKey, usize>,
    pub per_month: BTreeMap<MonthKey, usize>,
}

impl Report {
    pub fn build(analytics: &Analytics) -> Result<Self, AnalysisError> {
        let window = analytics.last_six_months()?;
        Ok(Self {
            range: analytics.date_range()?,
            total_requests: analytics.records().len(),
            six_month_cutoff: window.cutoff,
            last_six_months: window.records.len(),
            status: analytics.status_summary()?,
            requests: analytics.request_extremes()?,
            per_day: analytics.per_day(),
            per_week: analytics.per_week(),
            per_month: analytics.per_month(),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.range.first.format(DATE_FORMAT);
        let last = self.range.last.format(DATE_FORMAT);
        writeln!(
            f,
            "Between {first} and {last}, there were {} requests made to the website",
            thousands(self.total_requests)
        )?;
        writeln!(
            f,
            "In the last six months ({} - {last}), there were {} requests",
            self.six_month_cutoff.format(DATE_FORMAT),
            thousands(self.last_six_months)
        )?;
        writeln!(
            f,
            "Redirects: {} ({:.1}%)",
            thousands(self.status.redirects),
            self.status.redirect_fraction * 100.0
        )?;
        writeln!(
            f,
            "Client errors: {} ({:.1}%)",
            thousands(self.status.client_errors),
            self.status.client_error_fraction * 100.0
        )?;
        writeln!(
            f,
            "Most requested: \"{}\" ({} requests)",
            self.requests.most.request,
            thousands(self.requests.most.count)
        )?;
        writeln!(
            f,
            "Least requested: \"{}\" ({} requests)",
            self.requests.least.request,
            thousands(self.requests.least.count)
        )?;
        writeln!(f)?;
        writeln!(f, "Requests per month:")?;
        for (month, count) in &self.per_month {
            writeln!(f, "  {month}  {:>12}", thousands(*count))?;
        }
        Ok(())
    }
}

fn thousands(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Writes `records` into `dir/YYYY-MM.log`, one file per calendar month,
/// keeping the order they are given in. Existing files are replaced.
pub async fn write_monthly_logs(dir: &Path, records: &[LogRecord]) -> io::Result<Vec<PathBuf>> {
    let mut months: BTreeMap<MonthKey, String> = BTreeMap::new();
    for record in records {
        let lines = months.entry(MonthKey::of(record.timestamp())).or_default();
        lines.push_str(&record.to_string());
        lines.push('\n');
    }

    fs::create_dir_all(dir).await?;
    let mut written = Vec::with_capacity(months.len());
    for (month, lines) in months {
        let path = dir.join(format!("{month}.log"));
        fs::write(&path, lines).await?;
        info!(path = %path.display(), "wrote monthly log");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_log;
    use asserting::prelude::*;

    const LOG: &str = concat!(
        "a - - [15/Jan/2021:08:00:00 +0000] \"GET /index.html HTTP/1.0\" 200 1000\n",
        "b - - [03/Feb/2021:09:00:00 +0000] \"GET /old HTTP/1.0\" 301 -\n",
        "broken line\n",
        "c x y [20/Jan/2021:10:00:00 +0000] \"GET /index.html HTTP/1.0\" 404 12\n",
        "d - - [15/Jul/2021:11:00:00 +0000] \"GET /index.html HTTP/1.0\" 200 2500\n",
    );

    #[test]
    fn report_collects_every_statistic() {
        let report = Report::build(&Analytics::new(parse_log(LOG))).unwrap();
        assert_eq!(report.total_requests, 4);
        assert_eq!(report.last_six_months, 3);
        assert_eq!(report.status.redirects, 1);
        assert_eq!(report.status.client_errors, 1);
        assert_eq!(report.requests.most.request, "GET /index.html HTTP/1.0");
        assert_eq!(report.requests.least.request, "GET /old HTTP/1.0");
        assert_eq!(report.per_month.len(), 3);
        assert_eq!(report.per_day.len(), 4);
    }

    #[test]
    fn text_report_reads_like_a_summary() {
        let report = Report::build(&Analytics::new(parse_log(LOG))).unwrap();
        let text = report.to_string();
        assert_that!(text.as_str())
            .contains("Between 2021-01-15 and 2021-07-15, there were 4 requests");
        assert_that!(text.as_str()).contains("(2021-01-15 - 2021-07-15), there were 3 requests");
        assert_that!(text.as_str()).contains("Redirects: 1 (25.0%)");
        assert_that!(text.as_str()).contains("Client errors: 1 (25.0%)");
        assert_that!(text.as_str()).contains("Most requested: \"GET /index.html HTTP/1.0\" (3 requests)");
        assert_that!(text.as_str()).contains("  2021-02");
    }

    #[test]
    fn json_report_uses_readable_bucket_keys() {
        let report = Report::build(&Analytics::new(parse_log(LOG))).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_requests"], 4);
        assert_eq!(json["per_month"]["2021-01"], 2);
        assert_eq!(json["per_week"]["2021-W02"], 1);
        assert_eq!(json["per_day"]["2021-07-15"], 1);
        assert_eq!(json["requests"]["most"]["count"], 3);
        assert_eq!(json["range"]["first"], "2021-01-15T08:00:00Z");
        assert_eq!(json["six_month_cutoff"], "2021-01-15T11:00:00Z");
    }

    #[test]
    fn json_timestamps_keep_the_logged_offset() {
        let log = concat!(
            "local - - [24/Oct/1994:13:41:41 -0600] \"GET index.html HTTP/1.0\" 200 150\n",
            "local - - [11/Oct/1995:14:15:59 -0600] \"GET 1.gif HTTP/1.0\" 200 1210\n",
        );
        let report = Report::build(&Analytics::new(parse_log(log))).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["range"]["first"], "1994-10-24T13:41:41-06:00");
        assert_eq!(json["range"]["last"], "1995-10-11T14:15:59-06:00");
        assert_eq!(json["six_month_cutoff"], "1995-04-11T14:15:59-06:00");
    }

    #[test]
    fn thousands_are_separated() {
        assert_eq!(thousands(726_736), "726,736");
        assert_eq!(thousands(12), "12");
    }

    #[tokio::test]
    async fn monthly_logs_hold_each_months_lines() {
        let dir = tempfile::tempdir().unwrap();
        let analytics = Analytics::new(parse_log(LOG));

        let written = write_monthly_logs(dir.path(), analytics.records()).await.unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["2021-01.log", "2021-02.log", "2021-07.log"]);

        let january = std::fs::read_to_string(dir.path().join("2021-01.log")).unwrap();
        assert_eq!(
            january,
            concat!(
                "a - - [15/Jan/2021:08:00:00 +0000] \"GET /index.html HTTP/1.0\" 200 1000\n",
                "c x y [20/Jan/2021:10:00:00 +0000] \"GET /index.html HTTP/1.0\" 404 12\n",
            )
        );
        assert_eq!(parse_log(&january).len(), 2);
    }
}
