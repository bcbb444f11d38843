use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;
use spinel_codec::protocol::command_name;
use spinel_codec::{PropertyTable, Value};
use spinel_ncp::DecodedPacket;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// JSON rendering of a decoded value. Byte strings and EUIs become hex.
pub fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => json!(b),
        Value::Uint(n) => json!(n),
        Value::Int(n) => json!(n),
        Value::Text(s) => json!(s),
        Value::Data(bytes) => json!(hex::encode(bytes)),
        Value::Ipv6(addr) => json!(addr.to_string()),
        Value::Eui64(eui) => json!(hex::encode(eui)),
        Value::Eui48(eui) => json!(hex::encode(eui)),
        Value::Array(items) | Value::Tuple(items) => {
            serde_json::Value::Array(items.iter().map(value_json).collect())
        }
        Value::Void => serde_json::Value::Null,
    }
}

pub fn property_name(table: &PropertyTable, property: u32) -> String {
    table
        .get(property)
        .map(|entry| entry.info.name.to_string())
        .unwrap_or_else(|| format!("{property:#x}"))
}

#[derive(Serialize)]
pub struct PropertyOutput {
    pub property: u32,
    pub name: String,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(skip)]
    pub display: String,
}

impl PropertyOutput {
    pub fn new(table: &PropertyTable, property: u32, value: &Value) -> Self {
        Self {
            property,
            name: property_name(table, property),
            value: value_json(value),
            matched: None,
            display: value.to_string(),
        }
    }
}

pub fn print_property(out: &PropertyOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut header = vec!["PROPERTY", "ID", "VALUE"];
            let mut row = vec![
                out.name.clone(),
                format!("{:#x}", out.property),
                out.display.clone(),
            ];
            if let Some(matched) = out.matched {
                header.push("ECHO MATCH");
                row.push(matched.to_string());
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header)
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => match out.matched {
            Some(matched) => println!("{} = {} (echo match: {matched})", out.name, out.display),
            None => println!("{} = {}", out.name, out.display),
        },
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    command: &'a str,
    tid: u8,
    property: Option<u32>,
    name: Option<String>,
    value: serde_json::Value,
    error: Option<String>,
    timestamp: String,
}

pub fn print_packet(packet: &DecodedPacket, table: &PropertyTable, format: OutputFormat) {
    let name = packet.property().map(|id| property_name(table, id));
    let (value, display) = match &packet.value {
        Ok(value) => (value_json(value), value.to_string()),
        Err(err) => (serde_json::Value::Null, format!("<{err}>")),
    };
    let command = command_name(packet.command());

    match format {
        OutputFormat::Json => print_json(&PacketOutput {
            command,
            tid: packet.packet.tid(),
            property: packet.property(),
            name,
            value,
            error: packet.value.as_ref().err().map(ToString::to_string),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut out = Table::new();
            out.load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "TID", "PROPERTY", "VALUE"])
                .add_row(vec![
                    command.to_string(),
                    packet.packet.tid().to_string(),
                    name.unwrap_or_default(),
                    display,
                ]);
            println!("{out}");
        }
        OutputFormat::Pretty => match name {
            Some(name) => println!("{command} tid={} {name} = {display}", packet.packet.tid()),
            None => println!("{command} tid={}", packet.packet.tid()),
        },
    }
}

pub fn print_json<T: Serialize>(out: &T) {
    println!(
        "{}",
        serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
