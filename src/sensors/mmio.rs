//! Register-block access for GPU sensor back-ends
//!
//! Sensor code reads telemetry straight out of a PCI-mapped register block.
//! Mapping the block is a platform concern handled elsewhere; back-ends in
//! this crate only see the [`Registers`] trait. Every access is
//! trace-logged.

use log::trace;
use std::collections::HashMap;

/// Byte-addressed register block of one device.
pub trait Registers {
    /// 8-bit read at a byte offset.
    fn read8(&self, addr: u32) -> u8;

    /// 16-bit read at a byte offset.
    fn read16(&self, addr: u32) -> u16;

    /// 32-bit read at a byte offset.
    fn read32(&self, addr: u32) -> u32;

    /// 8-bit write at a byte offset.
    fn write8(&mut self, addr: u32, value: u8);

    /// 16-bit write at a byte offset.
    fn write16(&mut self, addr: u32, value: u16);

    /// 32-bit write at a byte offset.
    fn write32(&mut self, addr: u32, value: u32);

    /// Read-modify-write: clears `mask`, sets `value`, returns the prior
    /// register contents.
    fn mask32(&mut self, addr: u32, mask: u32, value: u32) -> u32 {
        let prior = self.read32(addr);
        self.write32(addr, (prior & !mask) | value);
        prior
    }
}

/// In-memory register block used by tests and the demo CLI.
///
/// Address-exact: each offset holds one value, truncated to the access
/// width on narrow reads. Reads of unwritten offsets return zero, which is
/// what a quiescent sensor block reads as.
#[derive(Debug, Default, Clone)]
pub struct MockRegisters {
    words: HashMap<u32, u32>,
}

impl MockRegisters {
    /// Empty register block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load register contents.
    pub fn with_values(values: &[(u32, u32)]) -> Self {
        MockRegisters {
            words: values.iter().copied().collect(),
        }
    }
}

impl Registers for MockRegisters {
    fn read8(&self, addr: u32) -> u8 {
        self.read32(addr) as u8
    }

    fn read16(&self, addr: u32) -> u16 {
        self.read32(addr) as u16
    }

    fn read32(&self, addr: u32) -> u32 {
        let value = self.words.get(&addr).copied().unwrap_or(0);
        trace!("rd32 {:#08x} {:#010x}", addr, value);
        value
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.write32(addr, u32::from(value));
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.write32(addr, u32::from(value));
    }

    fn write32(&mut self, addr: u32, value: u32) {
        trace!("wr32 {:#08x} {:#010x}", addr, value);
        self.words.insert(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask32_returns_prior() {
        let mut regs = MockRegisters::with_values(&[(0x15b0, 0x0000_00ff)]);
        let prior = regs.mask32(0x15b0, 0x0000_00ff, 0x0000_003f);
        assert_eq!(prior, 0x0000_00ff);
        assert_eq!(regs.read32(0x15b0), 0x0000_003f);
    }

    #[test]
    fn test_unwritten_reads_zero() {
        let regs = MockRegisters::new();
        assert_eq!(regs.read32(0x20400), 0);
        assert_eq!(regs.read16(0x20400), 0);
        assert_eq!(regs.read8(0x20400), 0);
    }
}
