mod args;
mod generator;
mod output;

use args::CliArgs;
use clap::Parser;
use output::write_log;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = CliArgs::parse();
    let written = write_log(&args).await?;
    eprintln!(
        "Wrote {written} log lines covering {} days from {}",
        args.days(),
        args.start()
    );
    Ok(())
}
