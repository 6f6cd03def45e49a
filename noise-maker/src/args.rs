use chrono::NaiveDate;
use clap::Parser;
use derive_getters::Getters;

#[derive(Parser, Debug, Getters)]
#[command(name = "noise-maker")]
#[command(about = "Generate synthetic Apache access logs for testing", long_about = None)]
pub struct CliArgs {
    /// File to write, or - for stdout
    #[arg(long, default_value = "-")]
    output: String,

    #[arg(long, default_value_t = 10_000)]
    lines: usize,

    /// First day covered by the log
    #[arg(long, default_value = "1995-01-01")]
    start: NaiveDate,

    #[arg(long, default_value_t = 365)]
    days: u32,

    /// Share of lines that are deliberately broken, between 0 and 1
    #[arg(long, default_value_t = 0.01, value_parser = parse_ratio)]
    malformed_ratio: f64,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{ratio} is not between 0 and 1"))
    }
}
