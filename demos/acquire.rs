// Waveform acquisition example
//
// Transfers the on-screen trace of one channel, prints a summary and
// optionally writes it to CSV.

mod connection;

use clap::Parser;
use connection::ConnectionArgs;
use polars::prelude::*;
use siglent_scope::{AcquisitionConfig, Channel, OffsetSign, SiglentScope};
use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "acquire")]
#[command(about = "Transfer the visible waveform of a channel")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Channel to transfer
    #[arg(short, long, default_value = "1", value_parser = ["1", "2", "C1", "C2"])]
    channel: String,

    /// Write the trace to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read timeout for the transfer in milliseconds
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// Add the channel offset instead of subtracting it
    #[arg(long, help = "Use volts = code/25 * vdiv + offset (some firmware revisions)")]
    add_offset: bool,

    /// Leave the scope echoing command headers during the transfer
    #[arg(long)]
    echo: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cli.connection.init_logging();

    let channel: Channel = cli.channel.parse()?;
    let mut config =
        AcquisitionConfig::default().with_read_timeout(Duration::from_millis(cli.timeout_ms));
    if cli.add_offset {
        config = config.with_offset_sign(OffsetSign::Add);
    }

    let mut scope = SiglentScope::with_config(cli.connection.open()?, config)?;
    if cli.echo {
        scope.set_echo_mode(true)?;
    }

    let start = Instant::now();
    let wave = scope.get_wave(channel)?;
    println!(
        "Transferred {} samples from {} in {:.1?}",
        wave.len(),
        channel,
        start.elapsed()
    );
    println!("Echo mode after transfer: {:?}", scope.echo_mode());

    let mut df = wave.to_dataframe()?;
    print_data_summary(&df)?;

    if let Some(path) = cli.output {
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file).finish(&mut df)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn print_data_summary(df: &DataFrame) -> Result<(), Box<dyn std::error::Error>> {
    let stats = df
        .clone()
        .lazy()
        .select([
            col("Volts (V)").min().alias("min"),
            col("Volts (V)").max().alias("max"),
            col("Volts (V)").mean().alias("mean"),
            col("Time (s)").first().alias("t_first"),
            col("Time (s)").last().alias("t_last"),
        ])
        .collect()?;

    println!("{}", stats);
    Ok(())
}
