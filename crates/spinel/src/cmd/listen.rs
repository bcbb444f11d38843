use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use crate::cmd::{connect, resolve_property, ListenArgs, Session};
use crate::exit::{ncp_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::print_packet;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, session: Session) -> CliResult<i32> {
    let connection = connect(&args.device, session)?;
    let filter = args
        .properties
        .as_deref()
        .map(|names| {
            names
                .iter()
                .map(|name| resolve_property(connection.table(), name))
                .collect::<CliResult<Vec<u32>>>()
        })
        .transpose()?;

    let events = connection.subscribe();
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let packet = match events.recv_timeout(POLL_INTERVAL) {
            Ok(packet) => packet,
            Err(RecvTimeoutError::Timeout) => {
                if !connection.is_receiving() {
                    return Err(CliError::new(FAILURE, "NCP closed the connection"));
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(filter) = &filter {
            if !packet.property().is_some_and(|id| filter.contains(&id)) {
                continue;
            }
        }

        print_packet(&packet, connection.table(), session.format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    connection
        .close()
        .map_err(|err| ncp_error("close failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
