#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use spinel::codec::protocol::{
    CMD_PROP_VALUE_IS, PROP_LAST_STATUS, PROP_NCP_VERSION, PROP_NET_ROLE, PROP_PHY_CHAN,
    PROP_PROTOCOL_VERSION,
};
use spinel::codec::{build_property_packet, encode_str, parse_packet, Packet, Value};
use spinel::frame::{encode_frame, Deframer};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/spinelcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn send_packet(stream: &mut UnixStream, packet: &[u8]) {
    let mut wire = BytesMut::new();
    encode_frame(packet, &mut wire);
    let _ = stream.write_all(&wire);
}

/// Serve one host connection, answering each request with `respond`.
/// Returns when the host hangs up.
fn serve<F>(listener: UnixListener, mut respond: F) -> JoinHandle<()>
where
    F: FnMut(&Packet) -> Option<Bytes> + Send + 'static,
{
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("host should connect");
        let mut deframer = Deframer::default();
        let mut buf = [0u8; 1024];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            deframer.push(&buf[..n]);
            while let Ok(Some(frame)) = deframer.next_frame() {
                let request = parse_packet(frame).expect("host sent a malformed packet");
                if let Some(reply) = respond(&request) {
                    send_packet(&mut stream, &reply);
                }
            }
        }
    })
}

fn reply(request: &Packet, property: u32, value: &[u8]) -> Bytes {
    build_property_packet(CMD_PROP_VALUE_IS, request.tid(), property, value)
}

fn spinel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spinel"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("SPINEL_DEVICE")
        .output()
        .expect("spinel should run")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be json")
}

#[test]
fn get_prints_decoded_value() {
    let dir = unique_temp_dir("get");
    let sock = dir.join("ncp.sock");
    let device = serve(UnixListener::bind(&sock).unwrap(), |request| {
        let name = encode_str(&Value::from("OPENTHREAD/1.0"), "U").unwrap();
        Some(reply(request, PROP_NCP_VERSION, &name))
    });

    let addr = format!("unix:{}", sock.display());
    let output = spinel(&["--format", "json", "get", &addr, "NCP_VERSION"]);

    assert!(output.status.success(), "{output:?}");
    let payload = json_stdout(&output);
    assert_eq!(payload["name"], "NCP_VERSION");
    assert_eq!(payload["property"], PROP_NCP_VERSION);
    assert_eq!(payload["value"], "OPENTHREAD/1.0");

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn set_reports_echo_mismatch_with_failure() {
    let dir = unique_temp_dir("set");
    let sock = dir.join("ncp.sock");
    let device = serve(UnixListener::bind(&sock).unwrap(), |request| {
        assert_eq!(request.payload.as_ref(), &[15]);
        Some(reply(request, PROP_PHY_CHAN, &[11]))
    });

    let output = spinel(&[
        "--format",
        "json",
        "set",
        sock.to_str().unwrap(),
        "phy_chan",
        "15",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let payload = json_stdout(&output);
    assert_eq!(payload["value"], 11);
    assert_eq!(payload["matched"], false);

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn set_acknowledged_with_status_ok_succeeds() {
    let dir = unique_temp_dir("setack");
    let sock = dir.join("ncp.sock");
    let device = serve(UnixListener::bind(&sock).unwrap(), |request| {
        Some(reply(request, PROP_LAST_STATUS, &[0]))
    });

    let output = spinel(&[
        "--format",
        "json",
        "set",
        sock.to_str().unwrap(),
        "phy_chan",
        "15",
    ]);

    assert!(output.status.success(), "{output:?}");
    let payload = json_stdout(&output);
    assert_eq!(payload["value"], 15);
    assert_eq!(payload["matched"], true);

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn info_skips_rejected_properties() {
    let dir = unique_temp_dir("info");
    let sock = dir.join("ncp.sock");
    let device = serve(UnixListener::bind(&sock).unwrap(), |request| {
        Some(match request.property {
            Some(PROP_PROTOCOL_VERSION) => reply(request, PROP_PROTOCOL_VERSION, &[4, 3]),
            Some(PROP_NCP_VERSION) => {
                let name = encode_str(&Value::from("SIM/0.1"), "U").unwrap();
                reply(request, PROP_NCP_VERSION, &name)
            }
            Some(PROP_PHY_CHAN) => reply(request, PROP_PHY_CHAN, &[25]),
            _ => reply(request, PROP_LAST_STATUS, &[2]),
        })
    });

    let output = spinel(&["--format", "json", "info", sock.to_str().unwrap()]);

    assert!(output.status.success(), "{output:?}");
    let payload = json_stdout(&output);
    assert_eq!(payload["protocol_version"], "4.3");
    assert_eq!(payload["ncp_version"], "SIM/0.1");
    assert_eq!(payload["channel"], 25);
    assert!(payload["network_name"].is_null());

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn silent_ncp_times_out_with_124() {
    let dir = unique_temp_dir("timeout");
    let sock = dir.join("ncp.sock");
    let device = serve(UnixListener::bind(&sock).unwrap(), |_| None);

    let output = spinel(&["get", sock.to_str().unwrap(), "PHY_CHAN", "--timeout", "200ms"]);

    assert_eq!(output.status.code(), Some(124));
    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_device_is_transport_error() {
    let dir = unique_temp_dir("missing");
    let sock = dir.join("absent.sock");

    let output = spinel(&["get", sock.to_str().unwrap(), "PHY_CHAN"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_property_is_usage_error() {
    let dir = unique_temp_dir("unknown");
    let sock = dir.join("ncp.sock");
    let device = serve(UnixListener::bind(&sock).unwrap(), |_| None);

    let output = spinel(&["get", sock.to_str().unwrap(), "NOT_A_PROPERTY"]);

    assert_eq!(output.status.code(), Some(64));
    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn listen_prints_unsolicited_packets() {
    let dir = unique_temp_dir("listen");
    let sock = dir.join("ncp.sock");
    let listener = UnixListener::bind(&sock).unwrap();
    let device = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("host should connect");
        // Give the CLI time to subscribe.
        thread::sleep(Duration::from_millis(500));
        send_packet(
            &mut stream,
            &build_property_packet(CMD_PROP_VALUE_IS, 0, PROP_NET_ROLE, &[3]),
        );
        let mut buf = [0u8; 64];
        while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
    });

    let output = spinel(&[
        "--format",
        "json",
        "listen",
        sock.to_str().unwrap(),
        "--count",
        "1",
    ]);

    assert!(output.status.success(), "{output:?}");
    let payload = json_stdout(&output);
    assert_eq!(payload["command"], "PROP_VALUE_IS");
    assert_eq!(payload["name"], "NET_ROLE");
    assert_eq!(payload["value"], 3);

    device.join().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_reports_package_version() {
    let output = spinel(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("spinel {}", env!("CARGO_PKG_VERSION"))
    );
}
