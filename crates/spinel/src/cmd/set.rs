use std::net::Ipv6Addr;

use spinel_codec::{Descriptor, Value};
use spinel_ncp::is_accepted;

use crate::cmd::{connect, resolve_property, SetArgs, Session};
use crate::exit::{ncp_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_property, PropertyOutput};

pub fn run(args: SetArgs, session: Session) -> CliResult<i32> {
    let connection = connect(&args.device, session)?;
    let property = resolve_property(connection.table(), &args.property)?;
    let descriptor = connection
        .table()
        .descriptor(property)
        .ok_or_else(|| CliError::usage(format!("property {property:#x} has no known format")))?;
    let value = parse_value(&args.value, descriptor)?;

    let echoed = connection
        .set_property(property, &value, !args.no_wait)
        .map_err(|err| ncp_error("set failed", err))?;

    // A bare acknowledgement carries no value to show.
    let shown = echoed
        .as_ref()
        .filter(|echoed| **echoed != Value::Void)
        .unwrap_or(&value);
    let mut out = PropertyOutput::new(connection.table(), property, shown);
    out.matched = echoed.as_ref().map(|echoed| is_accepted(&value, echoed));
    print_property(&out, session.format);

    connection
        .close()
        .map_err(|err| ncp_error("close failed", err))?;
    match out.matched {
        Some(false) => Ok(FAILURE),
        _ => Ok(SUCCESS),
    }
}

/// Parse command-line text into a value shaped by `descriptor`.
///
/// Byte strings and EUIs are hex. Arrays and multi-field values are
/// comma-separated and may only contain scalars.
pub fn parse_value(input: &str, descriptor: &Descriptor) -> CliResult<Value> {
    match descriptor {
        Descriptor::Tuple(fields) | Descriptor::Struct(fields) => {
            let parts: Vec<&str> = input.split(',').collect();
            if parts.len() != fields.len() {
                return Err(CliError::usage(format!(
                    "expected {} comma-separated fields for '{descriptor}', got {}",
                    fields.len(),
                    parts.len()
                )));
            }
            parts
                .into_iter()
                .zip(fields)
                .map(|(part, field)| parse_scalar(part.trim(), field))
                .collect::<CliResult<Vec<_>>>()
                .map(Value::Tuple)
        }
        Descriptor::Array(element) => {
            if input.trim().is_empty() {
                return Ok(Value::Array(Vec::new()));
            }
            input
                .split(',')
                .map(|part| parse_scalar(part.trim(), element))
                .collect::<CliResult<Vec<_>>>()
                .map(Value::Array)
        }
        scalar => parse_scalar(input, scalar),
    }
}

fn parse_scalar(input: &str, descriptor: &Descriptor) -> CliResult<Value> {
    let invalid = || CliError::usage(format!("invalid value '{input}' for '{descriptor}'"));
    let value = match descriptor {
        Descriptor::Bool => match input.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Value::Bool(true),
            "false" | "0" | "off" | "no" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        Descriptor::U8
        | Descriptor::U16
        | Descriptor::U32
        | Descriptor::U64
        | Descriptor::Packed => Value::Uint(parse_uint(input).ok_or_else(invalid)?),
        Descriptor::I8 | Descriptor::I16 | Descriptor::I32 | Descriptor::I64 => {
            Value::Int(input.parse().map_err(|_| invalid())?)
        }
        Descriptor::Ipv6 => Value::Ipv6(input.parse::<Ipv6Addr>().map_err(|_| invalid())?),
        Descriptor::Eui64 => Value::Eui64(parse_hex(input)?.try_into().map_err(|_| invalid())?),
        Descriptor::Eui48 => Value::Eui48(parse_hex(input)?.try_into().map_err(|_| invalid())?),
        Descriptor::Data | Descriptor::DataWithLen => Value::Data(parse_hex(input)?.into()),
        Descriptor::Utf8 => Value::Text(input.to_string()),
        Descriptor::Void => Value::Void,
        Descriptor::Struct(_) | Descriptor::Array(_) | Descriptor::Tuple(_) => {
            return Err(CliError::usage(format!(
                "nested value '{descriptor}' cannot be given on the command line"
            )))
        }
    };
    Ok(value)
}

fn parse_uint(input: &str) -> Option<u64> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => input.parse().ok(),
    }
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();
    hex::decode(&digits).map_err(|err| CliError::usage(format!("invalid hex '{input}': {err}")))
}
