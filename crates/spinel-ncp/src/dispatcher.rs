use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use spinel_codec::protocol::{
    command_name, CMD_PROP_VALUE_GET, CMD_PROP_VALUE_INSERTED, CMD_PROP_VALUE_REMOVED,
    CMD_PROP_VALUE_SET, CMD_RESET, HEADER_TID_MASK, PROP_LAST_STATUS, PROP_STREAM_NET,
    PROP_THREAD_CHILD_TABLE, STATUS_OK,
};
use spinel_codec::{
    build_packet, build_property_packet, decode, encode, parse_packet, CodecError, Descriptor,
    Packet, PropertyTable, Uid, Value,
};
use spinel_frame::{Deframer, FrameConfig, FrameWriter};

use crate::config::NcpConfig;
use crate::error::{NcpError, Result};

/// A received packet together with its decoded value.
///
/// The value is decoded once, in the receive path. A decode failure is kept
/// so a waiting caller can see it; subscribers never receive such packets.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    pub packet: Packet,
    pub value: std::result::Result<Value, CodecError>,
}

impl DecodedPacket {
    pub fn command(&self) -> u32 {
        self.packet.command
    }

    pub fn property(&self) -> Option<u32> {
        self.packet.property
    }

    pub fn uid(&self) -> Option<Uid> {
        self.packet.uid()
    }
}

#[derive(Debug, Default)]
struct Exchange {
    outstanding: Option<Uid>,
    queue: VecDeque<DecodedPacket>,
    signaled: bool,
    closed: Option<String>,
}

/// Transaction dispatcher for one NCP connection.
///
/// At most one synchronous exchange is in flight: callers serialize on the
/// transmit lock, which is held from transmit until the response (or
/// timeout). The receive path runs under its own lock, never blocks, and
/// hands packets over through the waiting queue. Packets that do not answer
/// the outstanding request go to subscribers in arrival order.
///
/// Lock order is deframer, then exchange, then subscribers.
pub struct Ncp<W> {
    writer: Mutex<FrameWriter<W>>,
    deframer: Mutex<Deframer>,
    exchange: Mutex<Exchange>,
    signal: Condvar,
    subscribers: Mutex<Vec<Sender<DecodedPacket>>>,
    table: PropertyTable,
    next_tid: AtomicU8,
    config: NcpConfig,
}

impl<W: Write + Send> Ncp<W> {
    /// Create a dispatcher writing frames to `writer`.
    pub fn new(writer: W, config: NcpConfig) -> Self {
        Self::with_table(writer, config, PropertyTable::new())
    }

    /// Create a dispatcher with an explicit property table.
    pub fn with_table(writer: W, config: NcpConfig, table: PropertyTable) -> Self {
        let frame_config = FrameConfig {
            max_frame_size: config.max_frame_size,
            ..FrameConfig::default()
        };
        Self::from_writer(FrameWriter::with_config(writer, frame_config), config, table)
    }

    /// Create a dispatcher around an already configured frame writer.
    pub fn from_writer(writer: FrameWriter<W>, config: NcpConfig, table: PropertyTable) -> Self {
        Self {
            writer: Mutex::new(writer),
            deframer: Mutex::new(Deframer::new(config.max_frame_size)),
            exchange: Mutex::new(Exchange::default()),
            signal: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
            table,
            next_tid: AtomicU8::new(0),
            config,
        }
    }

    /// Read a property value.
    pub fn get_property(&self, property: u32) -> Result<Value> {
        let response = self.transact(CMD_PROP_VALUE_GET, property, Bytes::new(), true)?;
        match response {
            Some(response) => response_value(property, response),
            None => Err(NcpError::MissingResponse {
                command: CMD_PROP_VALUE_GET,
                property,
            }),
        }
    }

    /// Write a property using its table descriptor.
    ///
    /// With `wait`, returns the value the NCP echoed back, or `Value::Void`
    /// when it acknowledged with `LAST_STATUS` OK instead.
    pub fn set_property(&self, property: u32, value: &Value, wait: bool) -> Result<Option<Value>> {
        let descriptor = self
            .table
            .descriptor(property)
            .ok_or(NcpError::NotImplemented(property))?;
        self.set_property_with(property, value, descriptor, wait)
    }

    /// Write a property using an explicit descriptor.
    pub fn set_property_with(
        &self,
        property: u32,
        value: &Value,
        descriptor: &Descriptor,
        wait: bool,
    ) -> Result<Option<Value>> {
        let payload = encode(value, descriptor).map_err(NcpError::format(property))?;
        let response = self.transact(CMD_PROP_VALUE_SET, property, payload, wait)?;
        response
            .map(|response| response_value(property, response))
            .transpose()
    }

    /// Send an outbound data-stream frame (`STREAM_NET`).
    pub fn send_raw(&self, frame: &[u8], wait: bool) -> Result<Option<Value>> {
        let value = Value::Tuple(vec![
            Value::Data(Bytes::copy_from_slice(frame)),
            Value::Data(Bytes::new()),
        ]);
        self.set_property(PROP_STREAM_NET, &value, wait)
    }

    /// Send a `RESET` command without waiting for the NCP to come back.
    pub fn reset(&self) -> Result<()> {
        let mut writer = lock(&self.writer);
        ensure_open(&lock(&self.exchange))?;
        let tid = self.allocate_tid();
        let packet = build_packet(CMD_RESET, tid, &[]);
        tracing::debug!(tid, "sending reset");
        writer.send(&packet)?;
        Ok(())
    }

    /// Register an asynchronous subscriber.
    ///
    /// Every decoded packet that is not the response to a synchronous
    /// exchange is delivered to each live subscriber, in arrival order.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<DecodedPacket> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Feed bytes read from the transport.
    ///
    /// Deframes and decodes every complete frame, queues the results and
    /// wakes a waiting caller. Corrupt frames are logged and dropped.
    pub fn receive(&self, bytes: &[u8]) {
        let mut decoded = Vec::new();
        // Held until the packets are queued, so concurrent callers cannot
        // reorder frames between deframing and delivery.
        let mut deframer = lock(&self.deframer);
        deframer.push(bytes);
        loop {
            match deframer.next_frame() {
                Ok(Some(frame)) => {
                    if let Some(packet) = self.decode_frame(frame) {
                        decoded.push(packet);
                    }
                }
                Ok(None) => break,
                Err(err) => tracing::warn!(%err, "dropping corrupt frame"),
            }
        }

        if decoded.is_empty() {
            return;
        }

        let mut exchange = lock(&self.exchange);
        exchange.queue.extend(decoded);
        exchange.signaled = true;
        self.signal.notify_all();
        if exchange.outstanding.is_none() {
            let ready: Vec<DecodedPacket> = exchange.queue.drain(..).collect();
            self.forward(&exchange, ready);
        }
    }

    /// Mark the receive side as finished.
    ///
    /// A caller waiting for a response and every later exchange fail with
    /// [`NcpError::Disconnected`]. The first reason given is kept.
    pub fn disconnect(&self, reason: impl Into<String>) {
        let mut exchange = lock(&self.exchange);
        if exchange.closed.is_none() {
            let reason = reason.into();
            tracing::debug!(%reason, "dispatcher disconnected");
            exchange.closed = Some(reason);
        }
        exchange.signaled = true;
        self.signal.notify_all();
    }

    /// True once [`disconnect`](Self::disconnect) has been called.
    pub fn is_disconnected(&self) -> bool {
        lock(&self.exchange).closed.is_some()
    }

    /// The exchange currently waiting for a response, if any.
    pub fn outstanding(&self) -> Option<Uid> {
        lock(&self.exchange).outstanding
    }

    pub fn table(&self) -> &PropertyTable {
        &self.table
    }

    pub fn config(&self) -> &NcpConfig {
        &self.config
    }

    fn allocate_tid(&self) -> u8 {
        // 1..=15; 0 marks unsolicited packets.
        let next = |tid: u8| tid % HEADER_TID_MASK + 1;
        let previous = self
            .next_tid
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |tid| Some(next(tid)))
            .unwrap_or_else(|tid| tid);
        next(previous)
    }

    fn transact(
        &self,
        command: u32,
        property: u32,
        payload: Bytes,
        wait: bool,
    ) -> Result<Option<DecodedPacket>> {
        let mut writer = lock(&self.writer);
        let tid = self.allocate_tid();
        let uid = Uid::new(property, tid);
        let packet = build_property_packet(command, tid, property, &payload);

        {
            let mut exchange = lock(&self.exchange);
            ensure_open(&exchange)?;
            exchange.outstanding = Some(uid);
            exchange.signaled = false;
        }
        let _outstanding = OutstandingGuard { ncp: self, uid };

        tracing::debug!(
            command = command_name(command),
            property = format_args!("{property:#x}"),
            tid,
            len = packet.len(),
            "sending request"
        );
        writer.send(&packet)?;

        if !wait {
            return Ok(None);
        }

        // A timeout too large to represent waits without a deadline.
        let deadline = Instant::now().checked_add(self.config.response_timeout);
        let mut exchange = lock(&self.exchange);
        loop {
            while !exchange.signaled {
                exchange = match deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            drop(exchange);
                            tracing::debug!(%uid, "request timed out");
                            return Err(NcpError::Timeout {
                                command,
                                property,
                                after: self.config.response_timeout,
                            });
                        }
                        self.signal
                            .wait_timeout(exchange, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0
                    }
                    None => self
                        .signal
                        .wait(exchange)
                        .unwrap_or_else(PoisonError::into_inner),
                };
            }
            exchange.signaled = false;

            let mut response = None;
            let mut unmatched = Vec::with_capacity(exchange.queue.len());
            for packet in exchange.queue.drain(..) {
                if response.is_none() && answers(&packet, uid) {
                    response = Some(packet);
                } else {
                    unmatched.push(packet);
                }
            }
            let drained_unrelated = !unmatched.is_empty();
            self.forward(&exchange, unmatched);

            if let Some(response) = response {
                tracing::debug!(%uid, command = command_name(response.command()), "response matched");
                return Ok(Some(response));
            }
            ensure_open(&exchange)?;
            if drained_unrelated && self.config.strict_matching {
                tracing::debug!(%uid, "drained queue without a matching response");
                return Err(NcpError::MissingResponse { command, property });
            }
        }
    }

    fn decode_frame(&self, frame: Bytes) -> Option<DecodedPacket> {
        tracing::trace!(len = frame.len(), "frame received");
        let packet = match parse_packet(frame) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::warn!(%err, "dropping malformed packet");
                return None;
            }
        };

        if packet.property == Some(PROP_THREAD_CHILD_TABLE)
            && matches!(
                packet.command,
                CMD_PROP_VALUE_INSERTED | CMD_PROP_VALUE_REMOVED
            )
        {
            tracing::trace!("ignoring child table update");
            return None;
        }

        let value = match packet.property {
            None => Ok(Value::Void),
            Some(property) => match self.table.descriptor(property) {
                Some(descriptor) => decode(&packet.payload, descriptor).map(|(value, _)| value),
                None => Ok(Value::Data(packet.payload.clone())),
            },
        };

        if let Err(err) = &value {
            tracing::warn!(
                property = packet.property,
                %err,
                "packet value does not match descriptor"
            );
        }

        Some(DecodedPacket { packet, value })
    }

    /// Deliver packets to subscribers.
    ///
    /// Called with the exchange lock held, so delivery order matches the
    /// order packets left the waiting queue.
    fn forward(&self, _exchange: &MutexGuard<'_, Exchange>, packets: Vec<DecodedPacket>) {
        if packets.is_empty() {
            return;
        }
        let mut subscribers = lock(&self.subscribers);
        for packet in packets {
            if packet.value.is_err() {
                continue;
            }
            tracing::trace!(
                command = command_name(packet.command()),
                property = packet.property(),
                "forwarding to subscribers"
            );
            subscribers.retain(|tx| tx.send(packet.clone()).is_ok());
        }
    }

    fn finish_exchange(&self, uid: Uid) {
        let mut exchange = lock(&self.exchange);
        if exchange.outstanding == Some(uid) {
            exchange.outstanding = None;
        }
        let leftover: Vec<DecodedPacket> = exchange.queue.drain(..).collect();
        self.forward(&exchange, leftover);
    }
}

impl<W> std::fmt::Debug for Ncp<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ncp")
            .field("outstanding", &lock(&self.exchange).outstanding)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Clears the outstanding slot however the exchange ends.
struct OutstandingGuard<'a, W: Write + Send> {
    ncp: &'a Ncp<W>,
    uid: Uid,
}

impl<W: Write + Send> Drop for OutstandingGuard<'_, W> {
    fn drop(&mut self) {
        self.ncp.finish_exchange(self.uid);
    }
}

fn answers(packet: &DecodedPacket, uid: Uid) -> bool {
    if packet.packet.tid() != uid.tid {
        return false;
    }
    match packet.property() {
        Some(property) => property == uid.property || property == PROP_LAST_STATUS,
        None => false,
    }
}

fn ensure_open(exchange: &Exchange) -> Result<()> {
    match &exchange.closed {
        Some(reason) => Err(NcpError::Disconnected(reason.clone())),
        None => Ok(()),
    }
}

/// Value of a response, where a `LAST_STATUS` reply to another property is
/// either an acknowledgement (`Void`) or a failure status.
fn response_value(property: u32, response: DecodedPacket) -> Result<Value> {
    let value = response.value.map_err(NcpError::format(property))?;
    if property != PROP_LAST_STATUS && response.packet.property == Some(PROP_LAST_STATUS) {
        let status = value
            .as_u32()
            .map_err(NcpError::format(PROP_LAST_STATUS))?;
        if status == STATUS_OK {
            return Ok(Value::Void);
        }
        return Err(NcpError::Status { property, status });
    }
    Ok(value)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
