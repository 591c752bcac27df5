//! SMC wire protocol: the fixed binary record and command decoding
//!
//! The record layout mirrors `SMCKeyData_t` used by existing user-space SMC
//! clients, serialized field by field with no padding. Multi-byte integer
//! fields travel in the host's little-endian order (the only order the
//! protocol ever shipped on); packed names and type tags are themselves
//! big-endian `u32` encodings of their 4 characters, exactly as the callers
//! produce them.

use crate::error::{Result, SmcError};
use crate::key::{FourCc, MAX_VALUE_SIZE};
use serde::{Deserialize, Serialize};

/// Outer selector of the SMC command group.
pub const KERNEL_INDEX_SMC: u32 = 2;

/// Inner command: read a key's value bytes.
pub const SMC_CMD_READ_BYTES: u8 = 5;
/// Inner command: write (or create) a key's value bytes.
pub const SMC_CMD_WRITE_BYTES: u8 = 6;
/// Inner command: resolve a positional index to a key name.
pub const SMC_CMD_READ_INDEX: u8 = 8;
/// Inner command: read a key's declared size and type tag.
pub const SMC_CMD_READ_KEYINFO: u8 = 9;

/// Serialized size of [`SmcKeyData`] in bytes.
pub const WIRE_SIZE: usize = 74;

/// Firmware version stamp carried in the record (unused by this command
/// subset, preserved for layout fidelity).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmcVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub reserved: u8,
    pub release: u16,
}

/// Power-limit block carried in the record (unused by this command subset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmcPLimitData {
    pub version: u16,
    pub length: u16,
    pub cpu_plimit: u32,
    pub gpu_plimit: u32,
    pub mem_plimit: u32,
}

/// Key metadata: declared size and packed type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmcKeyInfo {
    pub data_size: u32,
    pub data_type: u32,
    pub data_attributes: u8,
}

/// The fixed request/response record exchanged with user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmcKeyData {
    /// Packed 4-character key name (command-dependent meaning).
    pub key: u32,
    pub vers: SmcVersion,
    pub p_limit_data: SmcPLimitData,
    pub key_info: SmcKeyInfo,
    pub result: u8,
    pub status: u8,
    /// Inner command byte.
    pub data8: u8,
    /// Auxiliary 32-bit argument (positional index for ReadIndex).
    pub data32: u32,
    /// Value payload buffer.
    pub bytes: [u8; 32],
}

impl Default for SmcKeyData {
    fn default() -> Self {
        SmcKeyData {
            key: 0,
            vers: SmcVersion::default(),
            p_limit_data: SmcPLimitData::default(),
            key_info: SmcKeyInfo::default(),
            result: 0,
            status: 0,
            data8: 0,
            data32: 0,
            bytes: [0; 32],
        }
    }
}

impl SmcKeyData {
    /// Serialize to the fixed wire layout.
    pub fn encode(&self) -> [u8; WIRE_SIZE] {
        let mut out = [0u8; WIRE_SIZE];
        out[0..4].copy_from_slice(&self.key.to_le_bytes());
        out[4] = self.vers.major;
        out[5] = self.vers.minor;
        out[6] = self.vers.build;
        out[7] = self.vers.reserved;
        out[8..10].copy_from_slice(&self.vers.release.to_le_bytes());
        out[10..12].copy_from_slice(&self.p_limit_data.version.to_le_bytes());
        out[12..14].copy_from_slice(&self.p_limit_data.length.to_le_bytes());
        out[14..18].copy_from_slice(&self.p_limit_data.cpu_plimit.to_le_bytes());
        out[18..22].copy_from_slice(&self.p_limit_data.gpu_plimit.to_le_bytes());
        out[22..26].copy_from_slice(&self.p_limit_data.mem_plimit.to_le_bytes());
        out[26..30].copy_from_slice(&self.key_info.data_size.to_le_bytes());
        out[30..34].copy_from_slice(&self.key_info.data_type.to_le_bytes());
        out[34] = self.key_info.data_attributes;
        out[35] = self.result;
        out[36] = self.status;
        out[37] = self.data8;
        out[38..42].copy_from_slice(&self.data32.to_le_bytes());
        out[42..74].copy_from_slice(&self.bytes);
        out
    }

    /// Deserialize from the fixed wire layout.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != WIRE_SIZE {
            return Err(SmcError::BadArgument(format!(
                "record length {} != {}",
                buf.len(),
                WIRE_SIZE
            )));
        }
        let u16le = |r: std::ops::Range<usize>| u16::from_le_bytes([buf[r.start], buf[r.start + 1]]);
        let u32le = |s: usize| u32::from_le_bytes([buf[s], buf[s + 1], buf[s + 2], buf[s + 3]]);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&buf[42..74]);
        Ok(SmcKeyData {
            key: u32le(0),
            vers: SmcVersion {
                major: buf[4],
                minor: buf[5],
                build: buf[6],
                reserved: buf[7],
                release: u16le(8..10),
            },
            p_limit_data: SmcPLimitData {
                version: u16le(10..12),
                length: u16le(12..14),
                cpu_plimit: u32le(14),
                gpu_plimit: u32le(18),
                mem_plimit: u32le(22),
            },
            key_info: SmcKeyInfo {
                data_size: u32le(26),
                data_type: u32le(30),
                data_attributes: buf[34],
            },
            result: buf[35],
            status: buf[36],
            data8: buf[37],
            data32: u32le(38),
            bytes,
        })
    }
}

/// One decoded SMC request.
///
/// Decoding happens once at the protocol boundary; every later stage
/// matches exhaustively on this type instead of re-inspecting raw command
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Resolve a zero-based creation-order index to a key name.
    ReadIndex(u32),
    /// Report a key's declared size and type tag.
    ReadKeyInfo(FourCc),
    /// Copy out a key's value bytes.
    ReadBytes(FourCc),
    /// Overwrite an existing key's value, or create the key.
    WriteBytes {
        key: FourCc,
        data_type: Option<FourCc>,
        size: usize,
        bytes: [u8; 32],
    },
}

impl Request {
    /// Decode the inner command of a request record.
    pub fn decode(input: &SmcKeyData) -> Result<Request> {
        match input.data8 {
            SMC_CMD_READ_INDEX => Ok(Request::ReadIndex(input.data32)),
            SMC_CMD_READ_KEYINFO => Ok(Request::ReadKeyInfo(lookup_name(input.key)?)),
            SMC_CMD_READ_BYTES => Ok(Request::ReadBytes(lookup_name(input.key)?)),
            SMC_CMD_WRITE_BYTES => {
                let size = input.key_info.data_size as usize;
                if size > MAX_VALUE_SIZE {
                    return Err(SmcError::PayloadTooLarge {
                        supplied: size,
                        declared: MAX_VALUE_SIZE,
                    });
                }
                let data_type = if input.key_info.data_type != 0 {
                    Some(FourCc::unpack(input.key_info.data_type)?)
                } else {
                    None
                };
                Ok(Request::WriteBytes {
                    key: FourCc::unpack(input.key)?,
                    data_type,
                    size,
                    bytes: input.bytes,
                })
            }
            other => Err(SmcError::BadArgument(format!("SMC command {:#04x}", other))),
        }
    }
}

/// A malformed packed name in a lookup can never match a stored key, so it
/// reports as not-found rather than as a protocol error.
fn lookup_name(packed: u32) -> Result<FourCc> {
    FourCc::unpack(packed).map_err(|_| SmcError::NotFound(format!("{:#010x}", packed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout_offsets() {
        let mut record = SmcKeyData {
            key: 0x5447_3050, // "TG0P"
            data8: SMC_CMD_READ_BYTES,
            data32: 0xDEAD_BEEF,
            ..Default::default()
        };
        record.key_info.data_size = 2;
        record.bytes[0] = 0xAB;

        let wire = record.encode();
        assert_eq!(wire.len(), WIRE_SIZE);
        // Packed name occupies the first 4 bytes, LSB first on the wire.
        assert_eq!(&wire[0..4], &[0x50, 0x30, 0x47, 0x54]);
        assert_eq!(&wire[26..30], &[2, 0, 0, 0]); // keyInfo.dataSize
        assert_eq!(wire[37], SMC_CMD_READ_BYTES); // data8
        assert_eq!(&wire[38..42], &[0xEF, 0xBE, 0xAD, 0xDE]); // data32
        assert_eq!(wire[42], 0xAB); // payload start

        assert_eq!(SmcKeyData::decode(&wire).unwrap(), record);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(SmcKeyData::decode(&[0u8; WIRE_SIZE - 1]).is_err());
        assert!(SmcKeyData::decode(&[0u8; WIRE_SIZE + 1]).is_err());
    }

    #[test]
    fn test_decode_read_commands() {
        let name: FourCc = "TC0D".parse().unwrap();

        let mut input = SmcKeyData::default();
        input.data8 = SMC_CMD_READ_KEYINFO;
        input.key = name.pack();
        assert_eq!(Request::decode(&input).unwrap(), Request::ReadKeyInfo(name));

        input.data8 = SMC_CMD_READ_BYTES;
        assert_eq!(Request::decode(&input).unwrap(), Request::ReadBytes(name));

        input.data8 = SMC_CMD_READ_INDEX;
        input.data32 = 7;
        assert_eq!(Request::decode(&input).unwrap(), Request::ReadIndex(7));
    }

    #[test]
    fn test_decode_write_with_and_without_type() {
        let mut input = SmcKeyData::default();
        input.data8 = SMC_CMD_WRITE_BYTES;
        input.key = "TG0P".parse::<FourCc>().unwrap().pack();
        input.key_info.data_size = 2;
        input.bytes[..2].copy_from_slice(&[0x41, 0x00]);

        match Request::decode(&input).unwrap() {
            Request::WriteBytes {
                data_type, size, ..
            } => {
                assert_eq!(data_type, None);
                assert_eq!(size, 2);
            }
            other => panic!("unexpected request {:?}", other),
        }

        input.key_info.data_type = "sp78".parse::<FourCc>().unwrap().pack();
        match Request::decode(&input).unwrap() {
            Request::WriteBytes { data_type, .. } => {
                assert_eq!(data_type, Some("sp78".parse().unwrap()));
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_command() {
        let mut input = SmcKeyData::default();
        input.data8 = 0x0B; // READ_PLIMIT, outside the supported subset
        assert!(matches!(
            Request::decode(&input).unwrap_err(),
            SmcError::BadArgument(_)
        ));
    }

    #[test]
    fn test_decode_write_oversized_payload() {
        let mut input = SmcKeyData::default();
        input.data8 = SMC_CMD_WRITE_BYTES;
        input.key = "TG0P".parse::<FourCc>().unwrap().pack();
        input.key_info.data_size = 40;
        assert!(matches!(
            Request::decode(&input).unwrap_err(),
            SmcError::PayloadTooLarge { .. }
        ));
    }

    #[test]
    fn test_garbled_lookup_name_reports_not_found() {
        let mut input = SmcKeyData::default();
        input.data8 = SMC_CMD_READ_BYTES;
        input.key = 0x0000_0001;
        assert!(matches!(
            Request::decode(&input).unwrap_err(),
            SmcError::NotFound(_)
        ));
    }
}
