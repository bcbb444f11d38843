//! Typed property accessors.
//!
//! Getters fail with `FormatViolation` when the NCP answers with a value of
//! the wrong shape. Setters return `Ok(true)` only when the NCP echoes back
//! exactly the value that was written; a different echo is `Ok(false)`.

use std::io::Write;
use std::net::Ipv6Addr;

use bytes::Bytes;
use spinel_codec::protocol::*;
use spinel_codec::{CodecError, Value};

use crate::dispatcher::Ncp;
use crate::error::{NcpError, Result};

/// Length of an extended PAN id.
pub const XPANID_LEN: usize = 8;
/// Length of a network key.
pub const NETWORK_KEY_LEN: usize = 16;
/// Length of a PSKc.
pub const PSKC_LEN: usize = 16;

/// Number of counters in `MSG_BUFFER_COUNTERS`.
pub const MSG_BUFFER_COUNTER_COUNT: usize = 16;

macro_rules! byte_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value),*
        }

        impl TryFrom<u8> for $name {
            type Error = CodecError;

            fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)*
                    other => Err(CodecError::OutOfRange {
                        value: other.into(),
                        symbol: 'C',
                    }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }
    };
}

byte_enum!(
    /// Thread device role (`NET_ROLE`).
    NetRole {
        Detached = 0,
        Child = 1,
        Router = 2,
        Leader = 3,
    }
);

byte_enum!(
    /// MCU power state (`MCU_POWER_STATE`).
    McuPowerState {
        On = 0,
        LowPower = 1,
        Off = 2,
    }
);

byte_enum!(
    /// MAC scan state (`MAC_SCAN_STATE`).
    ScanState {
        Idle = 0,
        Beacon = 1,
        Energy = 2,
        DiscoverScan = 3,
    }
);

/// One row of `IPV6_ADDRESS_TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6AddressEntry {
    pub address: Ipv6Addr,
    pub prefix_len: u8,
    pub valid_lifetime: u32,
    pub preferred_lifetime: u32,
}

impl Ipv6AddressEntry {
    pub fn from_value(value: &Value) -> std::result::Result<Self, CodecError> {
        Ok(Self {
            address: value.field(0)?.as_ipv6()?,
            prefix_len: value.field(1)?.as_u8()?,
            valid_lifetime: value.field(2)?.as_u32()?,
            preferred_lifetime: value.field(3)?.as_u32()?,
        })
    }
}

/// An unsolicited `MAC_SCAN_BEACON` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanBeacon {
    pub channel: u8,
    pub rssi: i8,
    pub ext_address: [u8; 8],
    pub short_address: u16,
    pub pan_id: u16,
    pub lqi: u8,
    pub protocol: u32,
    pub flags: u8,
    pub network_name: String,
    pub extended_pan_id: Bytes,
    pub steering_data: Bytes,
}

impl ScanBeacon {
    pub fn from_value(value: &Value) -> std::result::Result<Self, CodecError> {
        let mac = value.field(2)?;
        let net = value.field(3)?;
        Ok(Self {
            channel: value.field(0)?.as_u8()?,
            rssi: value.field(1)?.as_i8()?,
            ext_address: mac.field(0)?.as_eui64()?,
            short_address: mac.field(1)?.as_u16()?,
            pan_id: mac.field(2)?.as_u16()?,
            lqi: mac.field(3)?.as_u8()?,
            protocol: net.field(0)?.as_u32()?,
            flags: net.field(1)?.as_u8()?,
            network_name: net.field(2)?.as_str()?.to_owned(),
            extended_pan_id: net.field(3)?.as_data()?.clone(),
            steering_data: net.field(4)?.as_data()?.clone(),
        })
    }
}

/// An unsolicited `MAC_ENERGY_SCAN_RESULT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyScanResult {
    pub channel: u8,
    pub max_rssi: i8,
}

impl EnergyScanResult {
    pub fn from_value(value: &Value) -> std::result::Result<Self, CodecError> {
        Ok(Self {
            channel: value.field(0)?.as_u8()?,
            max_rssi: value.field(1)?.as_i8()?,
        })
    }
}

fn typed<T>(
    property: u32,
    value: &Value,
    convert: impl FnOnce(&Value) -> std::result::Result<T, CodecError>,
) -> Result<T> {
    convert(value).map_err(NcpError::format(property))
}

fn fixed_len(what: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(NcpError::InvalidArgument(format!(
            "{what} must be {expected} bytes, got {}",
            data.len()
        )));
    }
    Ok(())
}

/// True if `echoed`, the NCP's answer to a set, confirms `sent`.
///
/// `Value::Void` is what a `LAST_STATUS` OK acknowledgement decodes to.
pub fn is_accepted(sent: &Value, echoed: &Value) -> bool {
    echoed == sent || *echoed == Value::Void
}

impl<W: Write + Send> Ncp<W> {
    fn get_with<T>(
        &self,
        property: u32,
        convert: impl FnOnce(&Value) -> std::result::Result<T, CodecError>,
    ) -> Result<T> {
        let value = self.get_property(property)?;
        typed(property, &value, convert)
    }

    /// Write `value` and report whether the NCP accepted it, either by
    /// echoing it back unchanged or with a `LAST_STATUS` OK.
    pub fn set_checked(&self, property: u32, value: Value) -> Result<bool> {
        let echoed = self.set_property(property, &value, true)?;
        let accepted = echoed
            .as_ref()
            .is_some_and(|echoed| is_accepted(&value, echoed));
        if !accepted {
            tracing::debug!(property = format_args!("{property:#x}"), ?echoed, "set not echoed");
        }
        Ok(accepted)
    }

    pub fn last_status(&self) -> Result<u32> {
        self.get_with(PROP_LAST_STATUS, Value::as_u32)
    }

    /// `(major, minor)` protocol version.
    pub fn protocol_version(&self) -> Result<(u32, u32)> {
        self.get_with(PROP_PROTOCOL_VERSION, |value| {
            Ok((value.field(0)?.as_u32()?, value.field(1)?.as_u32()?))
        })
    }

    pub fn ncp_version(&self) -> Result<String> {
        self.get_with(PROP_NCP_VERSION, |value| value.as_str().map(str::to_owned))
    }

    pub fn interface_type(&self) -> Result<u32> {
        self.get_with(PROP_INTERFACE_TYPE, Value::as_u32)
    }

    pub fn vendor_id(&self) -> Result<u32> {
        self.get_with(PROP_VENDOR_ID, Value::as_u32)
    }

    pub fn caps(&self) -> Result<Vec<u32>> {
        self.get_with(PROP_CAPS, |value| {
            value.as_array()?.iter().map(Value::as_u32).collect()
        })
    }

    pub fn hardware_address(&self) -> Result<[u8; 8]> {
        self.get_with(PROP_HWADDR, Value::as_eui64)
    }

    pub fn mcu_power_state(&self) -> Result<McuPowerState> {
        self.get_with(PROP_MCU_POWER_STATE, |value| {
            McuPowerState::try_from(value.as_u8()?)
        })
    }

    pub fn set_mcu_power_state(&self, state: McuPowerState) -> Result<bool> {
        self.set_checked(PROP_MCU_POWER_STATE, u8::from(state).into())
    }

    pub fn channel(&self) -> Result<u8> {
        self.get_with(PROP_PHY_CHAN, Value::as_u8)
    }

    pub fn set_channel(&self, channel: u8) -> Result<bool> {
        self.set_checked(PROP_PHY_CHAN, channel.into())
    }

    pub fn supported_channels(&self) -> Result<Vec<u8>> {
        self.get_with(PROP_PHY_CHAN_SUPPORTED, byte_array)
    }

    pub fn scan_state(&self) -> Result<ScanState> {
        self.get_with(PROP_MAC_SCAN_STATE, |value| {
            ScanState::try_from(value.as_u8()?)
        })
    }

    /// Start (or stop, with `Idle`) a scan. Results arrive on subscribers.
    pub fn start_scan(&self, state: ScanState) -> Result<bool> {
        self.set_checked(PROP_MAC_SCAN_STATE, u8::from(state).into())
    }

    pub fn scan_mask(&self) -> Result<Vec<u8>> {
        self.get_with(PROP_MAC_SCAN_MASK, byte_array)
    }

    pub fn set_scan_mask(&self, channels: &[u8]) -> Result<bool> {
        let value = Value::Array(channels.iter().map(|&channel| channel.into()).collect());
        self.set_checked(PROP_MAC_SCAN_MASK, value)
    }

    /// Per-channel scan period in milliseconds.
    pub fn scan_period(&self) -> Result<u16> {
        self.get_with(PROP_MAC_SCAN_PERIOD, Value::as_u16)
    }

    pub fn set_scan_period(&self, period_ms: u16) -> Result<bool> {
        self.set_checked(PROP_MAC_SCAN_PERIOD, period_ms.into())
    }

    pub fn extended_address(&self) -> Result<[u8; 8]> {
        self.get_with(PROP_MAC_15_4_LADDR, Value::as_eui64)
    }

    pub fn pan_id(&self) -> Result<u16> {
        self.get_with(PROP_MAC_15_4_PANID, Value::as_u16)
    }

    pub fn set_pan_id(&self, pan_id: u16) -> Result<bool> {
        self.set_checked(PROP_MAC_15_4_PANID, pan_id.into())
    }

    pub fn net_saved(&self) -> Result<bool> {
        self.get_with(PROP_NET_SAVED, Value::as_bool)
    }

    pub fn interface_up(&self) -> Result<bool> {
        self.get_with(PROP_NET_IF_UP, Value::as_bool)
    }

    pub fn set_interface_up(&self, up: bool) -> Result<bool> {
        self.set_checked(PROP_NET_IF_UP, up.into())
    }

    pub fn stack_up(&self) -> Result<bool> {
        self.get_with(PROP_NET_STACK_UP, Value::as_bool)
    }

    pub fn set_stack_up(&self, up: bool) -> Result<bool> {
        self.set_checked(PROP_NET_STACK_UP, up.into())
    }

    pub fn net_role(&self) -> Result<NetRole> {
        self.get_with(PROP_NET_ROLE, |value| NetRole::try_from(value.as_u8()?))
    }

    pub fn set_net_role(&self, role: NetRole) -> Result<bool> {
        self.set_checked(PROP_NET_ROLE, u8::from(role).into())
    }

    pub fn network_name(&self) -> Result<String> {
        self.get_with(PROP_NET_NETWORK_NAME, |value| {
            value.as_str().map(str::to_owned)
        })
    }

    pub fn set_network_name(&self, name: &str) -> Result<bool> {
        self.set_checked(PROP_NET_NETWORK_NAME, name.into())
    }

    pub fn extended_pan_id(&self) -> Result<Bytes> {
        self.get_with(PROP_NET_XPANID, |value| value.as_data().cloned())
    }

    pub fn set_extended_pan_id(&self, xpanid: &[u8]) -> Result<bool> {
        fixed_len("extended PAN id", xpanid, XPANID_LEN)?;
        self.set_checked(PROP_NET_XPANID, Bytes::copy_from_slice(xpanid).into())
    }

    pub fn network_key(&self) -> Result<Bytes> {
        self.get_with(PROP_NET_NETWORK_KEY, |value| value.as_data().cloned())
    }

    pub fn set_network_key(&self, key: &[u8]) -> Result<bool> {
        fixed_len("network key", key, NETWORK_KEY_LEN)?;
        self.set_checked(PROP_NET_NETWORK_KEY, Bytes::copy_from_slice(key).into())
    }

    pub fn key_sequence_counter(&self) -> Result<u32> {
        self.get_with(PROP_NET_KEY_SEQUENCE_COUNTER, Value::as_u32)
    }

    pub fn set_key_sequence_counter(&self, counter: u32) -> Result<bool> {
        self.set_checked(PROP_NET_KEY_SEQUENCE_COUNTER, counter.into())
    }

    pub fn partition_id(&self) -> Result<u32> {
        self.get_with(PROP_NET_PARTITION_ID, Value::as_u32)
    }

    pub fn set_partition_id(&self, partition_id: u32) -> Result<bool> {
        self.set_checked(PROP_NET_PARTITION_ID, partition_id.into())
    }

    pub fn require_join_existing(&self) -> Result<bool> {
        self.get_with(PROP_NET_REQUIRE_JOIN_EXISTING, Value::as_bool)
    }

    pub fn set_require_join_existing(&self, required: bool) -> Result<bool> {
        self.set_checked(PROP_NET_REQUIRE_JOIN_EXISTING, required.into())
    }

    /// Key switch guard time in hours.
    pub fn key_switch_guardtime(&self) -> Result<u32> {
        self.get_with(PROP_NET_KEY_SWITCH_GUARDTIME, Value::as_u32)
    }

    pub fn set_key_switch_guardtime(&self, hours: u32) -> Result<bool> {
        self.set_checked(PROP_NET_KEY_SWITCH_GUARDTIME, hours.into())
    }

    pub fn pskc(&self) -> Result<Bytes> {
        self.get_with(PROP_NET_PSKC, |value| value.as_data().cloned())
    }

    pub fn set_pskc(&self, pskc: &[u8]) -> Result<bool> {
        fixed_len("PSKc", pskc, PSKC_LEN)?;
        self.set_checked(PROP_NET_PSKC, Bytes::copy_from_slice(pskc).into())
    }

    pub fn link_local_address(&self) -> Result<Ipv6Addr> {
        self.get_with(PROP_IPV6_LL_ADDR, Value::as_ipv6)
    }

    pub fn mesh_local_address(&self) -> Result<Ipv6Addr> {
        self.get_with(PROP_IPV6_ML_ADDR, Value::as_ipv6)
    }

    /// Mesh-local prefix and its length in bits.
    pub fn mesh_local_prefix(&self) -> Result<(Ipv6Addr, u8)> {
        self.get_with(PROP_IPV6_ML_PREFIX, |value| {
            Ok((value.field(0)?.as_ipv6()?, value.field(1)?.as_u8()?))
        })
    }

    pub fn ipv6_addresses(&self) -> Result<Vec<Ipv6AddressEntry>> {
        self.get_with(PROP_IPV6_ADDRESS_TABLE, |value| {
            value
                .as_array()?
                .iter()
                .map(Ipv6AddressEntry::from_value)
                .collect()
        })
    }

    /// Send an IPv6 packet on the data stream and wait for the NCP to
    /// acknowledge it.
    pub fn send_data(&self, packet: &[u8]) -> Result<()> {
        self.send_raw(packet, true).map(|_| ())
    }

    pub fn reset_counters(&self) -> Result<bool> {
        self.set_checked(PROP_CNTR_RESET, 1u8.into())
    }

    pub fn message_buffer_counters(&self) -> Result<[u16; MSG_BUFFER_COUNTER_COUNT]> {
        self.get_with(PROP_MSG_BUFFER_COUNTERS, |value| {
            let fields = value.as_tuple()?;
            let mut counters = [0u16; MSG_BUFFER_COUNTER_COUNT];
            if fields.len() != counters.len() {
                return Err(CodecError::ArityMismatch {
                    expected: counters.len(),
                    found: fields.len(),
                });
            }
            for (slot, field) in counters.iter_mut().zip(fields) {
                *slot = field.as_u16()?;
            }
            Ok(counters)
        })
    }
}

fn byte_array(value: &Value) -> std::result::Result<Vec<u8>, CodecError> {
    value.as_array()?.iter().map(Value::as_u8).collect()
}
