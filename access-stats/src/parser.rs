use std::sync::LazyLock;

use chrono::{DateTime, Timelike};
use futures_util::future::try_join_all;
use regex::Regex;
use tokio::task::{self, JoinError};
use tracing::debug;

use crate::models::{APACHE_TIMESTAMP_FORMAT, LogRecord, PLACEHOLDER};

// host( identity)? user [dd/Mon/yyyy:HH:MM:SS +hhmm] "request" status size
static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([A-Za-z0-9_.-]+)(?: ([A-Za-z0-9_.-]+))? ([A-Za-z0-9_.-]+) ",
        r"\[([0-9]{2}/[A-Za-z]{3}/[0-9]{4}:[0-9]{2}:[0-9]{2}:[0-9]{2} [+-][0-9]{4})\] ",
        r#""([^"]*)" ([0-9]{3}) ([0-9]+|-)$"#,
    ))
    .expect("valid log line pattern")
});

/// Parses every line of `text` that matches the Combined Log grammar, in order.
///
/// Lines that do not match, including ones with impossible dates or status
/// codes, are dropped without being reported.
pub fn parse_log(text: &str) -> Vec<LogRecord> {
    let mut lines = 0usize;
    let records: Vec<_> = text
        .split('\n')
        .filter(|l| !l.is_empty())
        .inspect(|_| lines += 1)
        .filter_map(parse_log_line)
        .collect();
    debug!(
        lines,
        records = records.len(),
        dropped = lines - records.len(),
        "parsed log chunk"
    );
    records
}

/// Same result as [`parse_log`], computed over `workers` line-aligned chunks
/// on the blocking pool.
pub async fn parse_log_parallel(text: &str, workers: usize) -> Result<Vec<LogRecord>, JoinError> {
    if workers <= 1 {
        return Ok(parse_log(text));
    }
    let handles = line_aligned_chunks(text, workers).into_iter().map(|chunk| {
        let chunk = chunk.to_owned();
        task::spawn_blocking(move || parse_log(&chunk))
    });
    let parsed = try_join_all(handles).await?;
    Ok(parsed.into_iter().flatten().collect())
}

pub fn parse_log_line(line: &str) -> Option<LogRecord> {
    let caps = LINE_PATTERN.captures(line)?;
    let timestamp = DateTime::parse_from_str(&caps[4], APACHE_TIMESTAMP_FORMAT).ok()?;
    // chrono reads :60 as a leap second
    if timestamp.nanosecond() >= 1_000_000_000 {
        return None;
    }
    let response_size = match &caps[7] {
        PLACEHOLDER => None,
        digits => Some(digits.parse().ok()?),
    };
    Some(LogRecord {
        host: caps[1].parse().ok()?,
        identity: caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|identity| *identity != PLACEHOLDER)
            .map(str::to_owned),
        user_id: caps[3].to_owned(),
        timestamp,
        request: caps[5].to_owned(),
        status: caps[6].parse().ok()?,
        response_size,
    })
}

// Every chunk but the last ends right after a '\n'.
fn line_aligned_chunks(text: &str, parts: usize) -> Vec<&str> {
    let target = text.len().div_ceil(parts.max(1)).max(1);
    let mut chunks = Vec::with_capacity(parts);
    let mut rest = text;
    while !rest.is_empty() {
        if rest.len() <= target {
            chunks.push(rest);
            break;
        }
        let cut = rest.as_bytes()[target..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(rest.len(), |i| target + i + 1);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}
