//! NVIDIA (nouveau-derived) temperature back-end
//!
//! Identification and readout follow the nouveau driver lineage: the boot0
//! register names the chipset, pre-G84 chips expose a raw thermal diode
//! that needs per-chipset calibration, and G84 onward report calibrated
//! Celsius directly.

use crate::error::{Result, SmcError};
use crate::sensors::{encode_sp78, gpu_diode_key, Registers, SensorSource, TYPE_SP78};
use crate::store::KeyStore;
use log::{debug, warn};
use serde::Serialize;

/// Chipset identification register.
const NV_PMC_BOOT_0: u32 = 0x000000;
/// NV40-family diode control register.
const NV40_SENSOR_CTRL: u32 = 0x0015b0;
/// NV40-family raw diode readout.
const NV40_SENSOR_DATA: u32 = 0x0015b4;
/// G84+ calibrated temperature readout (degrees Celsius).
const NV84_SENSOR_DATA: u32 = 0x020400;

/// Card generation, from the chipset number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CardType {
    Nv04,
    Nv40,
    Nv50,
    NvC0,
    NvD0,
    NvE0,
    Gm100,
    Gp100,
}

/// Thermal diode calibration for one chipset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorConstants {
    pub slope_mult: i32,
    pub slope_div: i32,
    pub offset_num: i32,
    pub offset_den: i32,
    pub offset_constant: i32,
}

impl Default for SensorConstants {
    fn default() -> Self {
        SensorConstants {
            slope_mult: 1,
            slope_div: 1,
            offset_num: 0,
            offset_den: 1,
            offset_constant: 0,
        }
    }
}

/// Diode calibration by chipset, for chips whose VBIOS carries none.
fn sensor_constants(chipset: u32) -> SensorConstants {
    let (slope_mult, slope_div, offset_num, offset_den) = match chipset {
        0x43 => (792, 1000, 32060, 1000),
        0x44 | 0x47 | 0x4a => (780, 1000, 27839, 1000),
        0x46 => (467, 10000, -24775, 100),
        0x49 => (458, 10000, -25051, 100),
        0x4b => (442, 10000, -24088, 100),
        0x50 => (431, 10000, -25734, 100),
        _ => return SensorConstants::default(),
    };
    SensorConstants {
        slope_mult,
        slope_div,
        offset_num,
        offset_den,
        offset_constant: 0,
    }
}

/// Derive the chipset number and card generation from boot0.
pub fn identify(boot0: u32) -> Result<(u32, CardType)> {
    if boot0 & 0x1ff0_0000 == 0 {
        return Err(SmcError::Sensor(format!(
            "unrecognized boot0 {:#010x}",
            boot0
        )));
    }
    let chipset = (boot0 & 0x1ff0_0000) >> 20;
    let card_type = match chipset & 0x1f0 {
        0x000..=0x030 => CardType::Nv04,
        0x040 | 0x060 => CardType::Nv40,
        0x050 | 0x080 | 0x090 | 0x0a0 => CardType::Nv50,
        0x0c0 => CardType::NvC0,
        0x0d0 => CardType::NvD0,
        0x0e0 | 0x0f0 | 0x100 => CardType::NvE0,
        0x110 | 0x120 => CardType::Gm100,
        0x130 => CardType::Gp100,
        _ => {
            return Err(SmcError::Sensor(format!(
                "unknown chipset {:#05x}",
                chipset
            )))
        }
    };
    Ok((chipset, card_type))
}

/// Temperature back-end for one NVIDIA card.
pub struct NouveauSensors<R: Registers> {
    name: String,
    regs: R,
    card_index: u8,
    chipset: u32,
    card_type: CardType,
    constants: SensorConstants,
}

impl<R: Registers> NouveauSensors<R> {
    /// Identify the chip behind a mapped register block and prepare its
    /// sensor.
    pub fn new(mut regs: R, card_index: u8) -> Result<Self> {
        let boot0 = regs.read32(NV_PMC_BOOT_0);
        let (chipset, card_type) = identify(boot0)?;
        debug!(
            "nouveau{}: boot0 {:#010x} chipset {:#04x} ({:?})",
            card_index, boot0, chipset, card_type
        );

        if (0x40..0x84).contains(&chipset) {
            // Power up the diode before the first readout.
            if chipset >= 0x46 {
                regs.write32(NV40_SENSOR_CTRL, 0x8000_3fff);
            } else {
                regs.write32(NV40_SENSOR_CTRL, 0x0000_00ff);
            }
        }

        Ok(NouveauSensors {
            name: format!("nouveau{}", card_index),
            regs,
            card_index,
            chipset,
            card_type,
            constants: sensor_constants(chipset),
        })
    }

    /// Chipset number (e.g. `0xe4`).
    pub fn chipset(&self) -> u32 {
        self.chipset
    }

    /// Card generation.
    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    /// Core temperature in degrees Celsius.
    pub fn core_temp(&self) -> Result<i32> {
        if self.chipset >= 0x84 {
            return Ok(self.regs.read32(NV84_SENSOR_DATA) as i32);
        }
        if self.chipset >= 0x40 {
            return Ok(self.diode_temp());
        }
        Err(SmcError::Sensor(format!(
            "chipset {:#04x} has no internal sensor",
            self.chipset
        )))
    }

    fn diode_temp(&self) -> i32 {
        let raw = (self.regs.read32(NV40_SENSOR_DATA) & 0x1fff) as i32;
        let c = &self.constants;
        raw * c.slope_mult / c.slope_div + c.offset_num / c.offset_den + c.offset_constant
    }
}

impl<R: Registers> SensorSource for NouveauSensors<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, store: &KeyStore) -> Result<()> {
        let temp = self.core_temp()?;
        store.register_key(
            gpu_diode_key(self.card_index),
            TYPE_SP78,
            2,
            &encode_sp78(temp as f32),
        )
    }

    fn update(&mut self, store: &KeyStore) -> Result<()> {
        match self.core_temp() {
            Ok(temp) => store.update_value(gpu_diode_key(self.card_index), &encode_sp78(temp as f32)),
            Err(err) => {
                warn!("{}: temperature read failed: {}", self.name, err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{decode_sp78, MockRegisters};

    fn boot0_for(chipset: u32) -> u32 {
        chipset << 20
    }

    #[test]
    fn test_identify_generations() {
        assert_eq!(identify(boot0_for(0x43)).unwrap(), (0x43, CardType::Nv40));
        assert_eq!(identify(boot0_for(0x84)).unwrap(), (0x84, CardType::Nv50));
        assert_eq!(identify(boot0_for(0xc1)).unwrap(), (0xc1, CardType::NvC0));
        assert_eq!(identify(boot0_for(0xe4)).unwrap(), (0xe4, CardType::NvE0));
        assert_eq!(identify(boot0_for(0x117)).unwrap(), (0x117, CardType::Gm100));
        assert_eq!(identify(boot0_for(0x134)).unwrap(), (0x134, CardType::Gp100));
        assert!(identify(0).is_err());
    }

    #[test]
    fn test_nv40_diode_calibration() {
        // NV43: slope 792/1000, offset 32060/1000.
        let regs = MockRegisters::with_values(&[
            (NV_PMC_BOOT_0, boot0_for(0x43)),
            (NV40_SENSOR_DATA, 50),
        ]);
        let gpu = NouveauSensors::new(regs, 0).unwrap();
        assert_eq!(gpu.card_type(), CardType::Nv40);
        assert_eq!(gpu.core_temp().unwrap(), 50 * 792 / 1000 + 32);
    }

    #[test]
    fn test_nv40_sensor_powerup_write() {
        let regs = MockRegisters::with_values(&[(NV_PMC_BOOT_0, boot0_for(0x46))]);
        let gpu = NouveauSensors::new(regs, 0).unwrap();
        assert_eq!(gpu.regs.read32(NV40_SENSOR_CTRL), 0x8000_3fff);
    }

    #[test]
    fn test_nv84_reads_celsius_directly() {
        let regs = MockRegisters::with_values(&[
            (NV_PMC_BOOT_0, boot0_for(0xe4)),
            (NV84_SENSOR_DATA, 65),
        ]);
        let gpu = NouveauSensors::new(regs, 0).unwrap();
        assert_eq!(gpu.core_temp().unwrap(), 65);
    }

    #[test]
    fn test_register_and_update_store_keys() {
        let regs = MockRegisters::with_values(&[
            (NV_PMC_BOOT_0, boot0_for(0xe4)),
            (NV84_SENSOR_DATA, 65),
        ]);
        let mut gpu = NouveauSensors::new(regs, 1).unwrap();
        let store = KeyStore::new();
        gpu.register(&store).unwrap();

        let value = store.read_value(gpu_diode_key(1)).unwrap();
        assert_eq!(decode_sp78([value[0], value[1]]), 65.0);

        gpu.regs.write32(NV84_SENSOR_DATA, 72);
        gpu.update(&store).unwrap();
        let value = store.read_value(gpu_diode_key(1)).unwrap();
        assert_eq!(decode_sp78([value[0], value[1]]), 72.0);
    }
}
