//! Spinel protocol constants.

/// Header bit 7: set on every valid Spinel packet.
pub const HEADER_FLAG: u8 = 0x80;
/// Header bits 0-3: transaction id.
pub const HEADER_TID_MASK: u8 = 0x0F;
/// Header bits 4-5: interface id.
pub const HEADER_IID_MASK: u8 = 0x30;
pub const HEADER_IID_SHIFT: u8 = 4;
/// Header for unsolicited packets and fire-and-forget commands.
pub const HEADER_DEFAULT: u8 = HEADER_FLAG | 1;

/// Transaction id 0 marks a packet the NCP sent on its own.
pub const TID_UNSOLICITED: u8 = 0;

pub const CMD_NOOP: u32 = 0;
pub const CMD_RESET: u32 = 1;
pub const CMD_PROP_VALUE_GET: u32 = 2;
pub const CMD_PROP_VALUE_SET: u32 = 3;
pub const CMD_PROP_VALUE_INSERT: u32 = 4;
pub const CMD_PROP_VALUE_REMOVE: u32 = 5;
pub const CMD_PROP_VALUE_IS: u32 = 6;
pub const CMD_PROP_VALUE_INSERTED: u32 = 7;
pub const CMD_PROP_VALUE_REMOVED: u32 = 8;

/// `LAST_STATUS` value acknowledging a command that succeeded.
pub const STATUS_OK: u32 = 0;

/// True for commands whose packets carry a property id.
pub const fn is_property_command(command: u32) -> bool {
    command >= CMD_PROP_VALUE_GET && command <= CMD_PROP_VALUE_REMOVED
}

/// Human-readable command name for logs.
pub fn command_name(command: u32) -> &'static str {
    match command {
        CMD_NOOP => "NOOP",
        CMD_RESET => "RESET",
        CMD_PROP_VALUE_GET => "PROP_VALUE_GET",
        CMD_PROP_VALUE_SET => "PROP_VALUE_SET",
        CMD_PROP_VALUE_INSERT => "PROP_VALUE_INSERT",
        CMD_PROP_VALUE_REMOVE => "PROP_VALUE_REMOVE",
        CMD_PROP_VALUE_IS => "PROP_VALUE_IS",
        CMD_PROP_VALUE_INSERTED => "PROP_VALUE_INSERTED",
        CMD_PROP_VALUE_REMOVED => "PROP_VALUE_REMOVED",
        _ => "UNKNOWN",
    }
}

pub const PROP_LAST_STATUS: u32 = 0;
pub const PROP_PROTOCOL_VERSION: u32 = 1;
pub const PROP_NCP_VERSION: u32 = 2;
pub const PROP_INTERFACE_TYPE: u32 = 3;
pub const PROP_VENDOR_ID: u32 = 4;
pub const PROP_CAPS: u32 = 5;
pub const PROP_HWADDR: u32 = 8;
pub const PROP_MCU_POWER_STATE: u32 = 13;

pub const PROP_PHY_CHAN: u32 = 0x21;
pub const PROP_PHY_CHAN_SUPPORTED: u32 = 0x22;

pub const PROP_MAC_SCAN_STATE: u32 = 0x30;
pub const PROP_MAC_SCAN_MASK: u32 = 0x31;
pub const PROP_MAC_SCAN_PERIOD: u32 = 0x32;
pub const PROP_MAC_SCAN_BEACON: u32 = 0x33;
pub const PROP_MAC_15_4_LADDR: u32 = 0x34;
pub const PROP_MAC_15_4_PANID: u32 = 0x36;
pub const PROP_MAC_ENERGY_SCAN_RESULT: u32 = 0x39;

pub const PROP_NET_SAVED: u32 = 0x40;
pub const PROP_NET_IF_UP: u32 = 0x41;
pub const PROP_NET_STACK_UP: u32 = 0x42;
pub const PROP_NET_ROLE: u32 = 0x43;
pub const PROP_NET_NETWORK_NAME: u32 = 0x44;
pub const PROP_NET_XPANID: u32 = 0x45;
pub const PROP_NET_NETWORK_KEY: u32 = 0x46;
pub const PROP_NET_KEY_SEQUENCE_COUNTER: u32 = 0x47;
pub const PROP_NET_PARTITION_ID: u32 = 0x48;
pub const PROP_NET_REQUIRE_JOIN_EXISTING: u32 = 0x49;
pub const PROP_NET_KEY_SWITCH_GUARDTIME: u32 = 0x4A;
pub const PROP_NET_PSKC: u32 = 0x4B;

pub const PROP_THREAD_CHILD_TABLE: u32 = 0x52;

pub const PROP_IPV6_LL_ADDR: u32 = 0x60;
pub const PROP_IPV6_ML_ADDR: u32 = 0x61;
pub const PROP_IPV6_ML_PREFIX: u32 = 0x62;
pub const PROP_IPV6_ADDRESS_TABLE: u32 = 0x63;

pub const PROP_STREAM_NET: u32 = 0x72;

pub const PROP_CNTR_RESET: u32 = 1280;
pub const PROP_MSG_BUFFER_COUNTERS: u32 = 1680;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_commands() {
        assert!(!is_property_command(CMD_NOOP));
        assert!(!is_property_command(CMD_RESET));
        for command in CMD_PROP_VALUE_GET..=CMD_PROP_VALUE_REMOVED {
            assert!(is_property_command(command), "{}", command_name(command));
        }
        assert!(!is_property_command(9));
    }
}
