use std::time::Duration;

use clap::{Args, Subcommand};
use spinel_codec::PropertyTable;
use spinel_ncp::{open_with_config, Connection, NcpConfig};

use crate::exit::{ncp_error, transport_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod get;
pub mod info;
pub mod listen;
pub mod reset;
pub mod set;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query identity and network state of an NCP.
    Info(DeviceArgs),
    /// Read one property.
    Get(GetArgs),
    /// Write one property and report whether the NCP echoed it back.
    Set(SetArgs),
    /// Send a reset command.
    Reset(DeviceArgs),
    /// Print unsolicited packets as they arrive.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every command that talks to an NCP.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub format: OutputFormat,
    pub timeout: Duration,
}

pub fn run(command: Command, session: Session) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, session),
        Command::Get(args) => get::run(args, session),
        Command::Set(args) => set::run(args, session),
        Command::Reset(args) => reset::run(args, session),
        Command::Listen(args) => listen::run(args, session),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// NCP address: unix:<path>, tcp:<host:port>, or a socket path.
    #[arg(env = "SPINEL_DEVICE")]
    pub device: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Property name (e.g. NET_NETWORK_NAME) or numeric id.
    pub property: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Property name (e.g. PHY_CHAN) or numeric id.
    pub property: String,
    /// Value; hex for byte strings and EUIs, comma-separated for
    /// arrays and multi-field values.
    pub value: String,
    /// Do not wait for the NCP's echo.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Exit after printing N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print packets for these properties (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub properties: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn connect(args: &DeviceArgs, session: Session) -> CliResult<Connection> {
    let transport =
        spinel_ncp::from_uri(&args.device).map_err(|err| transport_error("bad device", err))?;
    let config = NcpConfig {
        response_timeout: session.timeout,
        ..NcpConfig::default()
    };
    tracing::debug!(device = %transport.describe(), timeout = ?session.timeout, "connecting");
    open_with_config(transport.as_ref(), config).map_err(|err| ncp_error("connect failed", err))
}

/// Resolve a property given by name or by decimal/hex id.
pub fn resolve_property(table: &PropertyTable, input: &str) -> CliResult<u32> {
    let input = input.trim();
    if let Some(entry) = table.find_by_name(input) {
        return Ok(entry.info.id);
    }
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::usage(format!("unknown property: {input}")))
}

/// Longest `--timeout` accepted.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    };
    if duration > MAX_TIMEOUT {
        return Err(CliError::usage(format!(
            "duration {input} exceeds the {}s maximum",
            MAX_TIMEOUT.as_secs()
        )));
    }
    Ok(duration)
}
