use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::*;

use crate::error::Error;
use crate::record;

pub const DDM_SIGNATURE: u16 = 0x4552; // 'ER'
pub const DDM_SIZE: usize = 512;
pub const DDM_MAX_DRIVERS: usize = 8;
const DDM_RESERVED_SIZE: usize = 430;

/// One slot of the driver descriptor table, as it appears on disk.
#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug, PartialEq, Eq,
)]
#[repr(C, packed)]
pub struct DriverDescriptor {
    block: U32,
    size: U16,
    kind: U16,
}

impl DriverDescriptor {
    pub fn new(block: u32, size: u16, kind: u16) -> Self {
        Self {
            block: block.into(),
            size: size.into(),
            kind: kind.into(),
        }
    }

    /// First block of the driver image.
    pub fn block(&self) -> u32 {
        self.block.into()
    }

    /// Size of the driver image, in 512-byte blocks.
    pub fn size(&self) -> u16 {
        self.size.into()
    }

    /// Operating system type of the driver.
    pub fn kind(&self) -> u16 {
        self.kind.into()
    }

    pub fn is_empty(&self) -> bool {
        self.block() == 0 && self.size() == 0 && self.kind() == 0
    }
}

// The driver descriptor map in block 0, as it appears on disk.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Debug, PartialEq, Eq)]
#[repr(C, packed)]
pub struct DriverDescriptorMap {
    signature: U16,
    block_size: U16,
    block_count: U32,
    device_type: U16,
    device_id: U16,
    driver_data: U32,
    driver_count: U16,
    drivers: [DriverDescriptor; DDM_MAX_DRIVERS],
    reserved: [u8; DDM_RESERVED_SIZE],
}

const _: () = assert!(size_of::<DriverDescriptor>() == 8);
const _: () = assert!(size_of::<DriverDescriptorMap>() == DDM_SIZE);

impl DriverDescriptorMap {
    pub fn new(block_size: u16, block_count: u32) -> Self {
        let mut ddm = Self::new_zeroed();
        ddm.signature = DDM_SIGNATURE.into();
        ddm.block_size = block_size.into();
        ddm.block_count = block_count.into();
        ddm
    }

    /// Decodes the driver descriptor map stored at `offset`.
    ///
    /// All eight driver slots are decoded whatever the declared driver count,
    /// and the reserved tail is kept so that [`Self::to_bytes`] reproduces
    /// the input exactly.
    pub fn parse(bytes: &[u8], offset: usize) -> Result<Self, Error> {
        let ddm: Self = record::read(bytes, offset)?;
        if ddm.signature != DDM_SIGNATURE {
            return Err(Error::InvalidSignature {
                structure: "driver descriptor map",
                expected: DDM_SIGNATURE,
                found: ddm.signature(),
            });
        }
        Ok(ddm)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Writes the 512-byte record into `buf` at `offset`.
    pub fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize, Error> {
        record::write(self, buf, offset)
    }

    pub fn signature(&self) -> u16 {
        self.signature.into()
    }

    pub fn block_size(&self) -> u16 {
        self.block_size.into()
    }

    pub fn set_block_size(&mut self, block_size: u16) {
        self.block_size = block_size.into();
    }

    pub fn block_count(&self) -> u32 {
        self.block_count.into()
    }

    pub fn set_block_count(&mut self, block_count: u32) {
        self.block_count = block_count.into();
    }

    pub fn device_type(&self) -> u16 {
        self.device_type.into()
    }

    pub fn set_device_type(&mut self, device_type: u16) {
        self.device_type = device_type.into();
    }

    pub fn device_id(&self) -> u16 {
        self.device_id.into()
    }

    pub fn set_device_id(&mut self, device_id: u16) {
        self.device_id = device_id.into();
    }

    pub fn driver_data(&self) -> u32 {
        self.driver_data.into()
    }

    pub fn set_driver_data(&mut self, driver_data: u32) {
        self.driver_data = driver_data.into();
    }

    /// Number of drivers the map declares. May exceed the eight slots the
    /// table has room for on malformed media.
    pub fn driver_count(&self) -> u16 {
        self.driver_count.into()
    }

    pub fn set_driver_count(&mut self, driver_count: u16) {
        self.driver_count = driver_count.into();
    }

    /// All eight driver slots, including unused ones.
    pub fn drivers(&self) -> &[DriverDescriptor; DDM_MAX_DRIVERS] {
        &self.drivers
    }

    pub fn drivers_mut(&mut self) -> &mut [DriverDescriptor; DDM_MAX_DRIVERS] {
        &mut self.drivers
    }

    /// The slots covered by the declared driver count.
    pub fn active_drivers(&self) -> &[DriverDescriptor] {
        let count = (self.driver_count() as usize).min(DDM_MAX_DRIVERS);
        &self.drivers[..count]
    }

    pub fn reserved(&self) -> &[u8; DDM_RESERVED_SIZE] {
        &self.reserved
    }

    pub fn reserved_mut(&mut self) -> &mut [u8; DDM_RESERVED_SIZE] {
        &mut self.reserved
    }
}

impl Default for DriverDescriptorMap {
    fn default() -> Self {
        Self::new(512, 0)
    }
}
