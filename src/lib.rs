//! # Virtual SMC (vsmc)
//!
//! A software-emulated Apple System Management Controller: a synchronized,
//! typed key-value registry addressed by four-character names, exposed
//! through the SMC binary command protocol, and fed by GPU register-level
//! sensor back-ends (nouveau-derived and Radeon r600-derived).
//!
//! ## Features
//!
//! - **Key store**: insertion-ordered, append-only registry of typed,
//!   fixed-size value cells; one mutex per store, one critical section per
//!   transaction
//! - **Wire-compatible protocol**: the `SMCKeyData` record and the
//!   ReadIndex / ReadKeyInfo / ReadBytes / WriteBytes command subset, with
//!   IOKit-style numeric status codes
//! - **Privilege gating**: per-session privilege captured at open time;
//!   only administrators may write or create keys
//! - **Sensor back-ends**: temperature decoding straight from device
//!   registers, published through the same store interface
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vsmc::{KeyStore, Privilege, UserClient};
//! use vsmc::protocol::{SmcKeyData, KERNEL_INDEX_SMC, SMC_CMD_READ_BYTES};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(KeyStore::new());
//! store.register_key("TG0D".parse()?, "sp78".parse()?, 2, &[0x41, 0x00])?;
//!
//! let client = UserClient::open(store, Privilege::Standard);
//! let mut input = SmcKeyData::default();
//! input.data8 = SMC_CMD_READ_BYTES;
//! input.key = "TG0D".parse::<vsmc::FourCc>()?.pack();
//! let mut output = SmcKeyData::default();
//! assert_eq!(client.external_method(KERNEL_INDEX_SMC, &input, &mut output), 0);
//! assert_eq!(&output.bytes[..2], &[0x41, 0x00]);
//! # Ok(())
//! # }
//! ```

pub mod client; // User-client sessions and transaction dispatch
pub mod config; // Configuration management with TOML persistence
pub mod error;
pub mod key; // Key cells and packed four-character identifiers
pub mod protocol; // SMC wire record and command decoding
pub mod sensors; // GPU register-level sensor back-ends
pub mod store; // Synchronized key registry

pub use client::{Privilege, UserClient};
pub use config::Config;
pub use error::{IoReturn, Result, SmcError};
pub use key::{FourCc, Key, DEFAULT_TYPE, MAX_VALUE_SIZE};
pub use protocol::{Request, SmcKeyData};
pub use sensors::{NouveauSensors, RadeonFamily, RadeonSensors, SensorSource};
pub use store::{KeyStore, KeyTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
