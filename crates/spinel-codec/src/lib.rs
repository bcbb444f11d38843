//! Spinel value codec and packet model.
//!
//! Values are encoded and decoded against compact format descriptors
//! (`"ii"`, `"A(t(6CLL))"`, ...). Everything here is pure: no transport,
//! no transaction state.
//!
//! ```
//! use spinel_codec::{decode_str, encode_str, Value};
//!
//! let encoded = encode_str(&Value::from("OpenThread"), "U").unwrap();
//! let (value, consumed) = decode_str(&encoded, "U").unwrap();
//! assert_eq!(value.as_str().unwrap(), "OpenThread");
//! assert_eq!(consumed, encoded.len());
//! ```

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod packet;
pub mod protocol;
pub mod registry;
pub mod value;

pub use codec::{decode, decode_str, encode, encode_into, encode_str, get_packed, put_packed};
pub use descriptor::{is_well_formed, Descriptor};
pub use error::{CodecError, Result};
pub use packet::{build_packet, build_property_packet, parse_packet, Packet, Uid};
pub use registry::{PropertyEntry, PropertyInfo, PropertyTable, PROPERTIES};
pub use value::Value;
