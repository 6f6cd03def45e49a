use std::path::PathBuf;

use access_stats::{
    analytics::Analytics,
    ingest::load_or_fetch,
    parser::parse_log_parallel,
    report::{Report, write_monthly_logs},
};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Local copy of the access log, downloaded from --url when missing
    #[arg(long, default_value = "http_access_log")]
    log_file: PathBuf,

    #[arg(long)]
    url: Option<String>,

    /// Number of chunks to parse in parallel
    #[arg(long, default_value_t = 1)]
    workers: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Also write the records into one YYYY-MM.log file per month here
    #[arg(long)]
    split_dir: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let text = load_or_fetch(&args.log_file, args.url.as_deref()).await?;
    let records = parse_log_parallel(&text, args.workers).await?;
    info!(records = records.len(), "parsed access log");

    let analytics = Analytics::new(records);
    let report = Report::build(&analytics)?;
    match args.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(dir) = &args.split_dir {
        let written = write_monthly_logs(dir, analytics.records())
            .await
            .with_context(|| format!("failed to write monthly logs to {}", dir.display()))?;
        info!(files = written.len(), "split access log by month");
    }
    Ok(())
}
