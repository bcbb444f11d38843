use std::collections::HashMap;

use crate::descriptor::{is_well_formed, Descriptor};
use crate::error::Result;
use crate::protocol::*;

/// Static description of one property: id, name and value descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub id: u32,
    pub name: &'static str,
    pub descriptor: &'static str,
}

impl PropertyInfo {
    /// Declare a property. Panics during const evaluation if the descriptor
    /// is malformed, so a bad table entry fails the build.
    pub const fn new(id: u32, name: &'static str, descriptor: &'static str) -> Self {
        assert!(is_well_formed(descriptor), "malformed property descriptor");
        Self {
            id,
            name,
            descriptor,
        }
    }
}

/// Every property this driver knows how to encode and decode.
pub const PROPERTIES: &[PropertyInfo] = &[
    PropertyInfo::new(PROP_LAST_STATUS, "LAST_STATUS", "i"),
    PropertyInfo::new(PROP_PROTOCOL_VERSION, "PROTOCOL_VERSION", "ii"),
    PropertyInfo::new(PROP_NCP_VERSION, "NCP_VERSION", "U"),
    PropertyInfo::new(PROP_INTERFACE_TYPE, "INTERFACE_TYPE", "i"),
    PropertyInfo::new(PROP_VENDOR_ID, "VENDOR_ID", "i"),
    PropertyInfo::new(PROP_CAPS, "CAPS", "A(i)"),
    PropertyInfo::new(PROP_HWADDR, "HWADDR", "E"),
    PropertyInfo::new(PROP_MCU_POWER_STATE, "MCU_POWER_STATE", "C"),
    PropertyInfo::new(PROP_PHY_CHAN, "PHY_CHAN", "C"),
    PropertyInfo::new(PROP_PHY_CHAN_SUPPORTED, "PHY_CHAN_SUPPORTED", "A(C)"),
    PropertyInfo::new(PROP_MAC_SCAN_STATE, "MAC_SCAN_STATE", "C"),
    PropertyInfo::new(PROP_MAC_SCAN_MASK, "MAC_SCAN_MASK", "A(C)"),
    PropertyInfo::new(PROP_MAC_SCAN_PERIOD, "MAC_SCAN_PERIOD", "S"),
    PropertyInfo::new(PROP_MAC_SCAN_BEACON, "MAC_SCAN_BEACON", "Cct(ESSC)t(iCUdd)"),
    PropertyInfo::new(PROP_MAC_15_4_LADDR, "MAC_15_4_LADDR", "E"),
    PropertyInfo::new(PROP_MAC_15_4_PANID, "MAC_15_4_PANID", "S"),
    PropertyInfo::new(PROP_MAC_ENERGY_SCAN_RESULT, "MAC_ENERGY_SCAN_RESULT", "Cc"),
    PropertyInfo::new(PROP_NET_SAVED, "NET_SAVED", "b"),
    PropertyInfo::new(PROP_NET_IF_UP, "NET_IF_UP", "b"),
    PropertyInfo::new(PROP_NET_STACK_UP, "NET_STACK_UP", "b"),
    PropertyInfo::new(PROP_NET_ROLE, "NET_ROLE", "C"),
    PropertyInfo::new(PROP_NET_NETWORK_NAME, "NET_NETWORK_NAME", "U"),
    PropertyInfo::new(PROP_NET_XPANID, "NET_XPANID", "D"),
    PropertyInfo::new(PROP_NET_NETWORK_KEY, "NET_NETWORK_KEY", "D"),
    PropertyInfo::new(PROP_NET_KEY_SEQUENCE_COUNTER, "NET_KEY_SEQUENCE_COUNTER", "L"),
    PropertyInfo::new(PROP_NET_PARTITION_ID, "NET_PARTITION_ID", "L"),
    PropertyInfo::new(PROP_NET_REQUIRE_JOIN_EXISTING, "NET_REQUIRE_JOIN_EXISTING", "b"),
    PropertyInfo::new(PROP_NET_KEY_SWITCH_GUARDTIME, "NET_KEY_SWITCH_GUARDTIME", "L"),
    PropertyInfo::new(PROP_NET_PSKC, "NET_PSKC", "D"),
    PropertyInfo::new(PROP_THREAD_CHILD_TABLE, "THREAD_CHILD_TABLE", "A(t(ESLLCCcCc))"),
    PropertyInfo::new(PROP_IPV6_LL_ADDR, "IPV6_LL_ADDR", "6"),
    PropertyInfo::new(PROP_IPV6_ML_ADDR, "IPV6_ML_ADDR", "6"),
    PropertyInfo::new(PROP_IPV6_ML_PREFIX, "IPV6_ML_PREFIX", "6C"),
    PropertyInfo::new(PROP_IPV6_ADDRESS_TABLE, "IPV6_ADDRESS_TABLE", "A(t(6CLL))"),
    PropertyInfo::new(PROP_STREAM_NET, "STREAM_NET", "dD"),
    PropertyInfo::new(PROP_CNTR_RESET, "CNTR_RESET", "C"),
    PropertyInfo::new(PROP_MSG_BUFFER_COUNTERS, "MSG_BUFFER_COUNTERS", "SSSSSSSSSSSSSSSS"),
];

/// A property with its parsed descriptor.
#[derive(Debug, Clone)]
pub struct PropertyEntry {
    pub info: PropertyInfo,
    pub descriptor: Descriptor,
}

/// Property id to descriptor lookup.
///
/// Built once per connection from [`PROPERTIES`]; descriptors are parsed up
/// front so the receive path never re-parses descriptor strings.
#[derive(Debug, Clone)]
pub struct PropertyTable {
    entries: HashMap<u32, PropertyEntry>,
}

impl PropertyTable {
    /// Table of all built-in properties.
    pub fn new() -> Self {
        let mut table = Self::empty();
        for info in PROPERTIES {
            // Checked by `PropertyInfo::new` at compile time.
            if let Err(err) = table.register(*info) {
                tracing::error!(property = info.name, %err, "built-in descriptor rejected");
            }
        }
        table
    }

    /// Table with no properties.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace a property, e.g. a vendor extension.
    pub fn register(&mut self, info: PropertyInfo) -> Result<()> {
        let descriptor = Descriptor::parse(info.descriptor)?;
        self.entries.insert(info.id, PropertyEntry { info, descriptor });
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&PropertyEntry> {
        self.entries.get(&id)
    }

    /// Parsed descriptor for a property id.
    pub fn descriptor(&self, id: u32) -> Option<&Descriptor> {
        self.entries.get(&id).map(|entry| &entry.descriptor)
    }

    /// Look a property up by name, case-insensitively. A `PROP_` prefix is
    /// accepted and ignored.
    pub fn find_by_name(&self, name: &str) -> Option<&PropertyEntry> {
        let name = name.trim();
        let name = name
            .strip_prefix("PROP_")
            .or_else(|| name.strip_prefix("prop_"))
            .unwrap_or(name);
        self.entries
            .values()
            .find(|entry| entry.info.name.eq_ignore_ascii_case(name))
    }

    pub fn has_property(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Known property ids, sorted.
    pub fn properties(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PropertyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let table = PropertyTable::new();
        assert_eq!(table.len(), PROPERTIES.len());
        for info in PROPERTIES {
            assert!(table.has_property(info.id), "{}", info.name);
        }
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<u32> = PROPERTIES.iter().map(|info| info.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PROPERTIES.len());
    }

    #[test]
    fn lookup_by_id_and_name() {
        let table = PropertyTable::new();
        assert_eq!(
            table.descriptor(PROP_NET_NETWORK_NAME),
            Some(&Descriptor::Utf8)
        );
        assert_eq!(
            table.find_by_name("net_network_name").map(|entry| entry.info.id),
            Some(PROP_NET_NETWORK_NAME)
        );
        assert_eq!(
            table.find_by_name("PROP_PHY_CHAN").map(|entry| entry.info.id),
            Some(PROP_PHY_CHAN)
        );
        assert!(table.find_by_name("NOT_A_PROPERTY").is_none());
    }

    #[test]
    fn properties_sorted() {
        let ids = PropertyTable::new().properties();
        assert_eq!(ids.first(), Some(&PROP_LAST_STATUS));
        assert_eq!(ids.last(), Some(&PROP_MSG_BUFFER_COUNTERS));
    }

    #[test]
    fn register_vendor_property() {
        let mut table = PropertyTable::empty();
        assert!(table.is_empty());
        table
            .register(PropertyInfo {
                id: 0x3C00,
                name: "VENDOR_TEMP",
                descriptor: "s",
            })
            .unwrap();
        assert_eq!(table.descriptor(0x3C00), Some(&Descriptor::I16));

        let err = table.register(PropertyInfo {
            id: 0x3C01,
            name: "VENDOR_BAD",
            descriptor: "t(",
        });
        assert!(err.is_err());
    }
}
