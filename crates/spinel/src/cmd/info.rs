use serde::Serialize;
use spinel_ncp::NcpError;

use crate::cmd::{connect, DeviceArgs, Session};
use crate::exit::{ncp_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    device: String,
    protocol_version: String,
    ncp_version: String,
    interface_type: Option<u32>,
    vendor_id: Option<u32>,
    caps: Vec<u32>,
    hardware_address: Option<String>,
    net_role: Option<String>,
    network_name: Option<String>,
    channel: Option<u8>,
    pan_id: Option<u16>,
    interface_up: Option<bool>,
    stack_up: Option<bool>,
}

pub fn run(args: DeviceArgs, session: Session) -> CliResult<i32> {
    let connection = connect(&args, session)?;

    let (major, minor) = connection
        .protocol_version()
        .map_err(|err| ncp_error("protocol version query failed", err))?;
    let ncp_version = connection
        .ncp_version()
        .map_err(|err| ncp_error("NCP version query failed", err))?;

    let out = InfoOutput {
        device: args.device.clone(),
        protocol_version: format!("{major}.{minor}"),
        ncp_version,
        interface_type: optional("interface type", connection.interface_type()),
        vendor_id: optional("vendor id", connection.vendor_id()),
        caps: optional("capabilities", connection.caps()).unwrap_or_default(),
        hardware_address: optional("hardware address", connection.hardware_address())
            .map(hex::encode),
        net_role: optional("role", connection.net_role()).map(|role| format!("{role:?}")),
        network_name: optional("network name", connection.network_name()),
        channel: optional("channel", connection.channel()),
        pan_id: optional("PAN id", connection.pan_id()),
        interface_up: optional("interface state", connection.interface_up()),
        stack_up: optional("stack state", connection.stack_up()),
    };

    print_info(&out, session.format);
    connection
        .close()
        .map_err(|err| ncp_error("close failed", err))?;
    Ok(SUCCESS)
}

fn optional<T>(what: &str, result: Result<T, NcpError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(%err, "{what} unavailable");
            None
        }
    }
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            let unavailable = || "unavailable".to_string();
            println!("NCP Info:");
            println!("  Device:           {}", out.device);
            println!("  Protocol:         spinel {}", out.protocol_version);
            println!("  Firmware:         {}", out.ncp_version);
            println!(
                "  Interface type:   {}",
                out.interface_type.map_or_else(unavailable, |v| v.to_string())
            );
            println!(
                "  Vendor id:        {}",
                out.vendor_id.map_or_else(unavailable, |v| v.to_string())
            );
            let caps = out
                .caps
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!("  Capabilities:     {caps}");
            println!(
                "  Hardware address: {}",
                out.hardware_address.clone().unwrap_or_else(unavailable)
            );
            println!(
                "  Role:             {}",
                out.net_role.clone().unwrap_or_else(unavailable)
            );
            println!(
                "  Network name:     {}",
                out.network_name.clone().unwrap_or_else(unavailable)
            );
            println!(
                "  Channel:          {}",
                out.channel.map_or_else(unavailable, |v| v.to_string())
            );
            println!(
                "  PAN id:           {}",
                out.pan_id.map_or_else(unavailable, |v| format!("{v:#06x}"))
            );
            println!(
                "  Interface/stack:  {}/{}",
                out.interface_up.map_or_else(unavailable, |v| v.to_string()),
                out.stack_up.map_or_else(unavailable, |v| v.to_string())
            );
        }
    }
}
