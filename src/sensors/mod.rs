//! GPU sensor back-ends feeding the key store
//!
//! Back-ends decode temperature telemetry from device registers and publish
//! it through the same store interface the protocol handler uses: keys are
//! registered once at initialization and refreshed in place afterwards.
//! Both calls run inside the store's lock.

pub mod mmio;
pub mod nouveau;
pub mod radeon;

pub use mmio::{MockRegisters, Registers};
pub use nouveau::NouveauSensors;
pub use radeon::{RadeonFamily, RadeonSensors};

use crate::error::Result;
use crate::key::FourCc;
use crate::store::KeyStore;

/// SMC type tag: signed 7.8 fixed-point, the temperature encoding.
pub const TYPE_SP78: FourCc = FourCc::from_ascii(*b"sp78");
/// SMC type tag: unsigned 14.2 fixed-point, the fan-speed encoding.
pub const TYPE_FPE2: FourCc = FourCc::from_ascii(*b"fpe2");
/// SMC type tag: unsigned 8-bit integer.
pub const TYPE_UI8: FourCc = FourCc::from_ascii(*b"ui8 ");
/// SMC type tag: unsigned 16-bit integer.
pub const TYPE_UI16: FourCc = FourCc::from_ascii(*b"ui16");
/// SMC type tag: unsigned 32-bit integer.
pub const TYPE_UI32: FourCc = FourCc::from_ascii(*b"ui32");

/// One sensor back-end attached to a device.
pub trait SensorSource {
    /// Human-readable back-end name for logs.
    fn name(&self) -> &str;

    /// Register this back-end's keys with the store. Called once.
    fn register(&mut self, store: &KeyStore) -> Result<()>;

    /// Read the hardware and push fresh values into the registered keys.
    fn update(&mut self, store: &KeyStore) -> Result<()>;
}

/// GPU diode temperature key for a card index (`TG0D`, `TG1D`, ...).
pub fn gpu_diode_key(card_index: u8) -> FourCc {
    indexed_key(b'D', card_index)
}

/// GPU proximity temperature key for a card index (`TG0P`, `TG1P`, ...).
pub fn gpu_proximity_key(card_index: u8) -> FourCc {
    indexed_key(b'P', card_index)
}

fn indexed_key(suffix: u8, card_index: u8) -> FourCc {
    // Hex digit, matching how multi-card SMC keys are numbered.
    let digit = match card_index & 0x0f {
        d @ 0..=9 => b'0' + d,
        d => b'A' + (d - 10),
    };
    FourCc::from_ascii([b'T', b'G', digit, suffix])
}

/// Encode a Celsius reading as SMC `sp78` (signed 7.8 fixed-point,
/// big-endian).
pub fn encode_sp78(celsius: f32) -> [u8; 2] {
    let fixed = (celsius * 256.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    fixed.to_be_bytes()
}

/// Decode an SMC `sp78` value back to Celsius.
pub fn decode_sp78(bytes: [u8; 2]) -> f32 {
    f32::from(i16::from_be_bytes(bytes)) / 256.0
}

/// Encode an RPM reading as SMC `fpe2` (unsigned 14.2 fixed-point,
/// big-endian). Readings beyond the 14-bit integer range saturate.
pub fn encode_fpe2(rpm: u16) -> [u8; 2] {
    (rpm.min(0x3fff) << 2).to_be_bytes()
}

/// Decode an SMC `fpe2` value back to RPM.
pub fn decode_fpe2(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes) >> 2
}
