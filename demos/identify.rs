// Connect to a scope and print what it reports about itself
//
// Shows the identification handshake and the typed scale queries.

mod connection;

use clap::Parser;
use connection::ConnectionArgs;
use siglent_scope::{Channel, SiglentScope};

#[derive(Parser)]
#[command(name = "identify")]
#[command(about = "Identify a Siglent oscilloscope and print its scale settings")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cli.connection.init_logging();

    let mut scope = SiglentScope::new(cli.connection.open()?)?;

    let identity = scope.identity().clone();
    println!("Siglent Oscilloscope");
    println!("====================");
    println!("Model:     {}", identity.model);
    println!("S/N:       {}", identity.serial_number);
    println!("Firmware:  {}", identity.firmware);
    println!();

    println!("Time/div:      {}", scope.get_time_per_div()?);
    println!("Trigger delay: {}", scope.get_trigger_delay()?);
    println!("Sample rate:   {}", scope.get_sample_rate()?);

    for channel in [Channel::C1, Channel::C2] {
        println!();
        println!("{}", channel);
        println!("  Volts/div: {}", scope.get_volts_per_div(channel)?);
        println!("  Offset:    {}", scope.get_offset(channel)?);
        println!("  Samples:   {}", scope.get_sample_length(channel)?);
    }

    Ok(())
}
