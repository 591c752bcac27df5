//! Key cells and the packed four-character identifiers that name them

use crate::error::{Result, SmcError};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum payload size of a single key value, in bytes.
///
/// Matches the fixed 32-byte data buffer of the SMC wire record.
pub const MAX_VALUE_SIZE: usize = 32;

/// Placeholder data type assigned when a key is created without one.
///
/// `ch8*` is the SMC type tag for raw byte strings.
pub const DEFAULT_TYPE: FourCc = FourCc(*b"ch8*");

/// A four-character ASCII identifier, used for both key names and type tags.
///
/// On the wire a `FourCc` travels as a big-endian `u32` with character 0 in
/// the most significant byte, so `"TG0P"` packs to `0x5447_3050`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Build from a literal known to be printable ASCII.
    pub(crate) const fn from_ascii(bytes: [u8; 4]) -> Self {
        FourCc(bytes)
    }

    /// Build from raw bytes, requiring 4 printable ASCII characters.
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        if bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
            Ok(FourCc(bytes))
        } else {
            Err(SmcError::InvalidName(format!("{:02x?}", bytes)))
        }
    }

    /// Pack into the wire representation (big-endian `u32`).
    pub fn pack(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Unpack from the wire representation.
    pub fn unpack(packed: u32) -> Result<Self> {
        Self::from_bytes(packed.to_be_bytes())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction guarantees printable ASCII.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// The raw 4 bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FourCc {
    type Err = SmcError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| SmcError::InvalidName(s.to_string()))?;
        Self::from_bytes(bytes)
    }
}

impl Serialize for FourCc {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FourCc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FourCcVisitor;

        impl Visitor<'_> for FourCcVisitor {
            type Value = FourCc;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 4-character printable ASCII string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<FourCc, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FourCcVisitor)
    }
}

/// One named, typed, fixed-size value cell in the store.
///
/// The name is immutable after creation and the value buffer length is
/// fixed at the declared size.
#[derive(Debug, Clone, Serialize)]
pub struct Key {
    name: FourCc,
    data_type: FourCc,
    value: Vec<u8>,
}

impl Key {
    /// Create a key with a declared size and an initial payload.
    ///
    /// An initial payload shorter than `size` fills the leading bytes; the
    /// remainder is zeroed. A payload longer than `size` (or a size beyond
    /// [`MAX_VALUE_SIZE`]) is rejected.
    pub fn new(name: FourCc, data_type: FourCc, size: usize, initial: &[u8]) -> Result<Self> {
        if size == 0 || size > MAX_VALUE_SIZE {
            return Err(SmcError::BadArgument(format!(
                "key size {} out of range 1..={}",
                size, MAX_VALUE_SIZE
            )));
        }
        let mut key = Key {
            name,
            data_type,
            value: vec![0; size],
        };
        key.set_value(initial)?;
        Ok(key)
    }

    /// Key name.
    pub fn name(&self) -> FourCc {
        self.name
    }

    /// Type tag.
    pub fn data_type(&self) -> FourCc {
        self.data_type
    }

    /// Declared payload size in bytes.
    pub fn size(&self) -> usize {
        self.value.len()
    }

    /// Read-only view of the value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Overwrite the leading `bytes.len()` bytes of the value.
    ///
    /// The declared size never changes. Supplying more bytes than the cell
    /// holds is an explicit [`SmcError::PayloadTooLarge`] and leaves the
    /// value untouched, rather than a silent truncation.
    pub fn set_value(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.value.len() {
            return Err(SmcError::PayloadTooLarge {
                supplied: bytes.len(),
                declared: self.value.len(),
            });
        }
        self.value[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_pack_roundtrip() {
        let name: FourCc = "TG0P".parse().unwrap();
        assert_eq!(name.pack(), 0x5447_3050);
        assert_eq!(FourCc::unpack(name.pack()).unwrap(), name);
        assert_eq!(name.to_string(), "TG0P");
    }

    #[test]
    fn test_fourcc_is_big_endian() {
        // Character 0 lands in the most significant byte.
        let name: FourCc = "#KEY".parse().unwrap();
        assert_eq!(name.pack() >> 24, u32::from(b'#'));
    }

    #[test]
    fn test_fourcc_rejects_bad_input() {
        assert!("TG0".parse::<FourCc>().is_err());
        assert!("TG0PX".parse::<FourCc>().is_err());
        assert!(FourCc::from_bytes([b'T', b'G', 0x01, b'P']).is_err());
        assert!(FourCc::unpack(0x0000_0000).is_err());
    }

    #[test]
    fn test_key_value_zero_padded() {
        let key = Key::new(
            "TG0D".parse().unwrap(),
            "sp78".parse().unwrap(),
            4,
            &[0xAA, 0xBB],
        )
        .unwrap();
        assert_eq!(key.value(), &[0xAA, 0xBB, 0, 0]);
        assert_eq!(key.size(), 4);
    }

    #[test]
    fn test_set_value_rejects_oversize() {
        let mut key = Key::new(
            "TG0D".parse().unwrap(),
            "sp78".parse().unwrap(),
            2,
            &[1, 2],
        )
        .unwrap();
        let err = key.set_value(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            SmcError::PayloadTooLarge {
                supplied: 3,
                declared: 2
            }
        ));
        // Failed write leaves the prior value intact.
        assert_eq!(key.value(), &[1, 2]);
    }

    #[test]
    fn test_key_size_bounds() {
        let name: FourCc = "TG0D".parse().unwrap();
        let ty: FourCc = "sp78".parse().unwrap();
        assert!(Key::new(name, ty, 0, &[]).is_err());
        assert!(Key::new(name, ty, MAX_VALUE_SIZE + 1, &[]).is_err());
        assert!(Key::new(name, ty, MAX_VALUE_SIZE, &[]).is_ok());
    }
}
