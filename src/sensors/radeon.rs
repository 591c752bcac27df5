//! AMD Radeon (r600-derived) temperature back-end
//!
//! Thermal status decoding for the r600 register lineage. Each family puts
//! the ASIC temperature field at its own offset, width, and sign
//! convention; which family a PCI id belongs to is decided by the device
//! tables upstream of this module.

use crate::error::Result;
use crate::sensors::{encode_sp78, gpu_proximity_key, Registers, SensorSource, TYPE_SP78};
use crate::store::KeyStore;
use log::{debug, warn};
use serde::Serialize;

/// R600/RV6xx thermal status register.
const CG_THERMAL_STATUS: u32 = 0x7f4;
/// RV770/Evergreen multi-sensor thermal status register.
const CG_MULT_THERMAL_STATUS: u32 = 0x740;
/// Southern Islands multi-sensor thermal status register.
const SI_CG_MULT_THERMAL_STATUS: u32 = 0x714;
/// Sumo/Palm (fusion APU) thermal status register.
const SUMO_CG_THERMAL_STATUS: u32 = 0x678;

/// Register family of the ASIC, per the r600 driver lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RadeonFamily {
    /// R600/RV610..RV670
    Rv6xx,
    /// RV710..RV790
    Rv770,
    /// Evergreen and Northern Islands
    Evergreen,
    /// Sumo/Palm fusion APUs
    Sumo,
    /// Southern Islands
    SouthernIslands,
}

/// Temperature back-end for one Radeon card.
pub struct RadeonSensors<R: Registers> {
    name: String,
    regs: R,
    card_index: u8,
    family: RadeonFamily,
}

impl<R: Registers> RadeonSensors<R> {
    /// Attach to a mapped register block of a known family.
    pub fn new(regs: R, card_index: u8, family: RadeonFamily) -> Self {
        debug!("radeon{}: family {:?}", card_index, family);
        RadeonSensors {
            name: format!("radeon{}", card_index),
            regs,
            card_index,
            family,
        }
    }

    /// Register family.
    pub fn family(&self) -> RadeonFamily {
        self.family
    }

    /// Core temperature in degrees Celsius.
    pub fn core_temp(&self) -> Result<i32> {
        let temp = match self.family {
            RadeonFamily::Rv6xx => self.rv6xx_temp(),
            RadeonFamily::Rv770 => self.rv770_temp(),
            RadeonFamily::Evergreen => self.evergreen_temp(),
            RadeonFamily::Sumo => self.sumo_temp(),
            RadeonFamily::SouthernIslands => self.si_temp(),
        };
        Ok(temp)
    }

    /// 9-bit two's-complement ASIC_T field in bits 8:0.
    fn rv6xx_temp(&self) -> i32 {
        let temp = self.regs.read32(CG_THERMAL_STATUS) & 0x1ff;
        let mut actual = (temp & 0xff) as i32;
        if temp & 0x100 != 0 {
            actual -= 256;
        }
        actual
    }

    /// 11-bit ASIC_T field in bits 26:16; 0x400 flags an invalid negative
    /// readout, 0x200 a saturated one. RV770 and Evergreen share the
    /// layout.
    fn rv770_temp(&self) -> i32 {
        let temp = (self.regs.read32(CG_MULT_THERMAL_STATUS) & 0x7ff_0000) >> 16;
        decode_saturating(temp)
    }

    fn evergreen_temp(&self) -> i32 {
        self.rv770_temp()
    }

    /// Raw reading offset by 49 degrees.
    fn sumo_temp(&self) -> i32 {
        let temp = self.regs.read32(SUMO_CG_THERMAL_STATUS) & 0x3ff;
        temp as i32 - 49
    }

    /// CTF_TEMP field in bits 17:9; 0x200 flags saturation.
    fn si_temp(&self) -> i32 {
        let temp = (self.regs.read32(SI_CG_MULT_THERMAL_STATUS) & 0x0003_fe00) >> 9;
        if temp & 0x200 != 0 {
            255
        } else {
            (temp & 0x1ff) as i32
        }
    }
}

fn decode_saturating(temp: u32) -> i32 {
    if temp & 0x400 != 0 {
        -256
    } else if temp & 0x200 != 0 {
        255
    } else {
        (temp & 0x1ff) as i32
    }
}

impl<R: Registers> SensorSource for RadeonSensors<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, store: &KeyStore) -> Result<()> {
        let temp = self.core_temp()?;
        store.register_key(
            gpu_proximity_key(self.card_index),
            TYPE_SP78,
            2,
            &encode_sp78(temp as f32),
        )
    }

    fn update(&mut self, store: &KeyStore) -> Result<()> {
        match self.core_temp() {
            Ok(temp) => store.update_value(
                gpu_proximity_key(self.card_index),
                &encode_sp78(temp as f32),
            ),
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

    #[test]
    fn test_rv6xx_positive_and_negative() {
        let regs = MockRegisters::with_values(&[(CG_THERMAL_STATUS, 72)]);
        let gpu = RadeonSensors::new(regs, 0, RadeonFamily::Rv6xx);
        assert_eq!(gpu.core_temp().unwrap(), 72);

        // Sign bit set: two's complement over 9 bits.
        let regs = MockRegisters::with_values(&[(CG_THERMAL_STATUS, 0x100 | 0xf6)]);
        let gpu = RadeonSensors::new(regs, 0, RadeonFamily::Rv6xx);
        assert_eq!(gpu.core_temp().unwrap(), 0xf6 - 256);
    }

    #[test]
    fn test_rv770_saturation_flags() {
        let gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(CG_MULT_THERMAL_STATUS, 68 << 16)]),
            0,
            RadeonFamily::Rv770,
        );
        assert_eq!(gpu.core_temp().unwrap(), 68);

        let gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(CG_MULT_THERMAL_STATUS, 0x400 << 16)]),
            0,
            RadeonFamily::Rv770,
        );
        assert_eq!(gpu.core_temp().unwrap(), -256);

        let gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(CG_MULT_THERMAL_STATUS, 0x200 << 16)]),
            0,
            RadeonFamily::Rv770,
        );
        assert_eq!(gpu.core_temp().unwrap(), 255);
    }

    #[test]
    fn test_evergreen_wide_field() {
        let gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(CG_MULT_THERMAL_STATUS, 0x1ff << 16)]),
            0,
            RadeonFamily::Evergreen,
        );
        assert_eq!(gpu.core_temp().unwrap(), 0x1ff);
    }

    #[test]
    fn test_sumo_offset() {
        let gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(SUMO_CG_THERMAL_STATUS, 120)]),
            0,
            RadeonFamily::Sumo,
        );
        assert_eq!(gpu.core_temp().unwrap(), 120 - 49);
    }

    #[test]
    fn test_si_field_position() {
        let gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(SI_CG_MULT_THERMAL_STATUS, 77 << 9)]),
            0,
            RadeonFamily::SouthernIslands,
        );
        assert_eq!(gpu.core_temp().unwrap(), 77);
    }

    #[test]
    fn test_register_publishes_proximity_key() {
        let mut gpu = RadeonSensors::new(
            MockRegisters::with_values(&[(CG_THERMAL_STATUS, 61)]),
            0,
            RadeonFamily::Rv6xx,
        );
        let store = KeyStore::new();
        gpu.register(&store).unwrap();
        let value = store.read_value(gpu_proximity_key(0)).unwrap();
        assert_eq!(decode_sp78([value[0], value[1]]), 61.0);
    }
}
