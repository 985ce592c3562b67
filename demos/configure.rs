// Front-end configuration example
//
// Applies vertical, horizontal and trigger settings in one go. Every value
// is validated before anything is sent to the instrument.

mod connection;

use clap::Parser;
use connection::ConnectionArgs;
use siglent_scope::{
    Channel, Coupling, SiglentScope, TimeUnit, TriggerCoupling, TriggerMode, TriggerSlope,
    VoltUnit,
};

#[derive(Parser)]
#[command(name = "configure")]
#[command(about = "Configure coupling, scales and trigger of a Siglent oscilloscope")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Channel to configure (1 or 2)
    #[arg(short, long, default_value = "1")]
    channel: String,

    /// Input coupling
    #[arg(long, default_value = "DC")]
    coupling: String,

    /// Volts per division, in --volt-unit
    #[arg(long, default_value_t = 0.5)]
    volts_per_div: f64,

    /// Offset, in --volt-unit
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    #[arg(long, default_value = "V", value_parser = ["V", "mV", "uV"])]
    volt_unit: String,

    /// Time per division: 1, 2.5, 5, 10, 25, 50, 100, 250 or 500
    #[arg(long, default_value_t = 500.0)]
    time_per_div: f64,

    /// Unit for --time-per-div: ns, us, ms or s
    #[arg(long, default_value = "us")]
    time_unit: String,

    /// Trigger source: 1, 2 or EX
    #[arg(long, default_value = "1")]
    trigger_source: String,

    /// Trigger level in volts
    #[arg(long, default_value_t = 0.0)]
    trigger_level: f64,

    #[arg(long, default_value = "POS", value_parser = ["NEG", "POS", "WINDOW"])]
    trigger_slope: String,

    #[arg(long, default_value = "DC", value_parser = ["AC", "DC", "HFREJ", "LFREJ"])]
    trigger_coupling: String,

    #[arg(long, default_value = "AUTO", value_parser = ["AUTO", "NORM", "SINGLE"])]
    trigger_mode: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cli.connection.init_logging();

    let channel: Channel = cli.channel.parse()?;
    let coupling: Coupling = cli.coupling.parse()?;
    let volt_unit: VoltUnit = cli.volt_unit.parse()?;
    let time_unit = TimeUnit::parse_any_case(&cli.time_unit)?;
    let trigger_source: Channel = cli.trigger_source.parse()?;
    let trigger_slope: TriggerSlope = cli.trigger_slope.parse()?;
    let trigger_coupling: TriggerCoupling = cli.trigger_coupling.parse()?;
    let trigger_mode: TriggerMode = cli.trigger_mode.parse()?;

    let mut scope = SiglentScope::new(cli.connection.open()?)?;

    scope.set_coupling(channel, coupling)?;
    scope.set_volts_per_div(channel, cli.volts_per_div, volt_unit)?;
    scope.set_offset(channel, cli.offset, volt_unit)?;
    scope.set_time_per_div(cli.time_per_div, time_unit)?;

    scope.set_trigger_coupling(trigger_source, trigger_coupling)?;
    scope.set_trigger_level(trigger_source, cli.trigger_level, VoltUnit::V)?;
    scope.set_trigger_slope(trigger_source, trigger_slope)?;
    scope.set_trigger_mode(trigger_mode)?;

    println!("Configured {}:", channel);
    println!("  Volts/div: {}", scope.get_volts_per_div(channel)?);
    println!("  Offset:    {}", scope.get_offset(channel)?);
    println!("  Time/div:  {}", scope.get_time_per_div()?);

    Ok(())
}
