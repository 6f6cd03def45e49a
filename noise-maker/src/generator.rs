use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use rand::{Rng, seq::IndexedRandom};

const HOSTS: [(&str, u8); 6] = [
    ("local", 20),
    ("remote", 20),
    ("192.168.0.7", 5),
    ("proxy.example.com", 5),
    ("wpbfl2-45.gate.net", 2),
    ("140.112.68.165", 2),
];
// identity and user id
const CALLERS: [(&str, u8); 4] = [("- -", 40), ("- frank", 3), ("ident frank", 1), ("frank", 1)];
const METHODS: [(&str, u8); 4] = [("GET", 30), ("POST", 2), ("HEAD", 2), ("PUT", 1)];
const PATHS: [(&str, u8); 7] = [
    ("index.html", 30),
    ("1.gif", 20),
    ("/api", 10),
    ("/login", 10),
    ("/splash", 5),
    ("gallery", 5),
    ("/~scottp/publish.html", 1),
];
const STATUS: [(u16, u8); 8] = [
    (200, 60),
    (206, 2),
    (302, 10),
    (304, 8),
    (401, 2),
    (403, 2),
    (404, 10),
    (500, 1),
];
const OFFSETS_HOURS: [(i32, u8); 3] = [(-6, 10), (0, 2), (2, 1)];

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, weighted: &'a [(T, u8)]) -> &'a T {
    &weighted
        .choose_weighted(rng, |(_, w)| *w)
        .expect("non-empty weights")
        .0
}

/// Timestamp of line `index` out of `total`, spread evenly over `days` days
/// from `start` with a few seconds of jitter.
pub fn timestamp_for<R: Rng + ?Sized>(
    rng: &mut R,
    start: NaiveDate,
    days: u32,
    index: usize,
    total: usize,
) -> DateTime<FixedOffset> {
    let span = i64::from(days.max(1)) * 86_400;
    let offset =
        FixedOffset::east_opt(pick(rng, &OFFSETS_HOURS) * 3600).expect("offset within a day");
    let seconds = span * index as i64 / total.max(1) as i64 + rng.random_range(0..30);
    let midnight = offset
        .from_local_datetime(&start.and_hms_opt(0, 0, 0).expect("midnight exists"))
        .single()
        .expect("fixed offsets are unambiguous");
    midnight + Duration::seconds(seconds)
}

pub fn generate_apache_log<R: Rng + ?Sized>(
    rng: &mut R,
    timestamp: DateTime<FixedOffset>,
) -> String {
    let host = pick(rng, &HOSTS);
    let caller = pick(rng, &CALLERS);
    let method = pick(rng, &METHODS);
    let path = pick(rng, &PATHS);
    let status = pick(rng, &STATUS);
    let size = if *status == 304 || rng.random_bool(0.05) {
        "-".to_string()
    } else {
        rng.random_range(100..20_000).to_string()
    };
    let timestamp = timestamp.format("%d/%b/%Y:%H:%M:%S %z");

    format!("{host} {caller} [{timestamp}] \"{method} {path} HTTP/1.0\" {status} {size}")
}

/// Ways a generated line is broken so that it no longer fits the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    NonNumericStatus,
    MissingBracket,
    Truncated,
    ImpossibleDay,
    TrailingField,
}

impl Corruption {
    pub const ALL: [Corruption; 5] = [
        Self::NonNumericStatus,
        Self::MissingBracket,
        Self::Truncated,
        Self::ImpossibleDay,
        Self::TrailingField,
    ];

    pub fn apply(self, valid: &str) -> String {
        match self {
            Self::NonNumericStatus => valid.replacen("HTTP/1.0\" ", "HTTP/1.0\" abc ", 1),
            Self::MissingBracket => valid.replacen('[', "", 1),
            Self::Truncated => {
                let cut = valid.find('"').unwrap_or(valid.len());
                format!("{}\"", &valid[..cut])
            }
            Self::ImpossibleDay => match valid.find('[') {
                Some(open) => format!("{}32{}", &valid[..=open], &valid[open + 3..]),
                None => format!("[32{valid}"),
            },
            Self::TrailingField => format!("{valid} trailing"),
        }
    }
}

/// A line that looks like a log entry but breaks the grammar in one place.
pub fn generate_malformed_log<R: Rng + ?Sized>(
    rng: &mut R,
    timestamp: DateTime<FixedOffset>,
) -> String {
    let valid = generate_apache_log(rng, timestamp);
    let corruption = *Corruption::ALL.choose(rng).expect("non-empty corruptions");
    corruption.apply(&valid)
}
