use serde_json::json;

use crate::cmd::{connect, DeviceArgs, Session};
use crate::exit::{ncp_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

pub fn run(args: DeviceArgs, session: Session) -> CliResult<i32> {
    let connection = connect(&args, session)?;
    connection
        .reset()
        .map_err(|err| ncp_error("reset failed", err))?;
    tracing::info!(device = %args.device, "reset sent");

    match session.format {
        OutputFormat::Json => print_json(&json!({ "device": args.device, "reset": true })),
        OutputFormat::Table | OutputFormat::Pretty => println!("reset sent to {}", args.device),
    }

    connection
        .close()
        .map_err(|err| ncp_error("close failed", err))?;
    Ok(SUCCESS)
}
