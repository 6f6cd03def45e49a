use std::io;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
};

use crate::args::CliArgs;
use crate::generator::{generate_apache_log, generate_malformed_log, timestamp_for};

const FLUSH_EVERY_LINES: usize = 10_000;

/// Writes the log described by `args` and returns how many lines were written.
pub async fn write_log(args: &CliArgs) -> io::Result<usize> {
    let sink: Box<dyn AsyncWrite + Unpin> = match args.output().as_str() {
        "-" => Box::new(tokio::io::stdout()),
        path => Box::new(File::create(path).await?),
    };
    let mut rng = match args.seed() {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_os_rng(),
    };
    write_lines(args, &mut rng, BufWriter::new(sink)).await
}

async fn write_lines<R: Rng, W: AsyncWrite + Unpin>(
    args: &CliArgs,
    rng: &mut R,
    mut out: BufWriter<W>,
) -> io::Result<usize> {
    let total = *args.lines();
    let mut buffer = String::with_capacity(FLUSH_EVERY_LINES.min(total) * 128);
    for index in 0..total {
        let timestamp = timestamp_for(rng, *args.start(), *args.days(), index, total);
        let line = if rng.random_bool(*args.malformed_ratio()) {
            generate_malformed_log(rng, timestamp)
        } else {
            generate_apache_log(rng, timestamp)
        };
        buffer.push_str(&line);
        buffer.push('\n');
        if (index + 1) % FLUSH_EVERY_LINES == 0 {
            out.write_all(buffer.as_bytes()).await?;
            buffer.clear();
        }
    }
    out.write_all(buffer.as_bytes()).await?;
    out.flush().await?;
    Ok(total)
}
