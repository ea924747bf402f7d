use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::*;

use crate::error::Error;
use crate::record;

pub const PARTITION_SIGNATURE: u16 = 0x504d; // 'PM'
pub const PARTITION_SIZE: usize = 512;
const PARTITION_TEXT_LEN: usize = 32;

/// Masks for the partition status flags.
pub mod flags {
    pub const VALID: u32 = 1 << 0;
    pub const ALLOCATED: u32 = 1 << 1;
    pub const IN_USE: u32 = 1 << 2;
    pub const BOOTABLE: u32 = 1 << 3;
    pub const READABLE: u32 = 1 << 4;
    pub const WRITABLE: u32 = 1 << 5;
    pub const OS_PIC_CODE: u32 = 1 << 6;
    pub const OS_SPECIFIC_2: u32 = 1 << 7;
    pub const OS_SPECIFIC_1: u32 = 1 << 8;
    /// Bits 9 through 31.
    pub const RESERVED: u32 = 0xffff_fe00;
}

/// Partition type strings found on Apple media. The map itself is described
/// by an `Apple_partition_map` entry; `Apple_Free` marks unallocated space.
pub mod types {
    pub const PARTITION_MAP: &str = "Apple_partition_map";
    pub const DRIVER: &str = "Apple_Driver";
    pub const DRIVER43: &str = "Apple_Driver43";
    pub const DRIVER_ATA: &str = "Apple_Driver_ATA";
    pub const DRIVER_IOKIT: &str = "Apple_Driver_IOKit";
    pub const PATCHES: &str = "Apple_Patches";
    pub const MFS: &str = "Apple_MFS";
    pub const HFS: &str = "Apple_HFS";
    pub const HFSX: &str = "Apple_HFSX";
    pub const UNIX_SVR2: &str = "Apple_UNIX_SVR2";
    pub const PRODOS: &str = "Apple_PRODOS";
    pub const BOOT: &str = "Apple_Boot";
    pub const FREE: &str = "Apple_Free";
    pub const SCRATCH: &str = "Apple_Scratch";
    pub const VOID: &str = "Apple_Void";
}

// A partition map entry, as it appears on disk.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Debug, PartialEq, Eq)]
#[repr(C, packed)]
pub struct Partition {
    signature: U16,
    reserved1: U16,
    map_entries: U32,
    first_lba: U32,
    sectors: U32,
    name: [u8; PARTITION_TEXT_LEN],
    partition_type: [u8; PARTITION_TEXT_LEN],
    logical_block_start: U32,
    logical_block_count: U32,
    flags: U32,
    boot_block: U32,
    boot_bytes: U32,
    load_address: U32,
    load_address2: U32,
    goto_address: U32,
    goto_address2: U32,
    checksum: U32,
    cpu_id: [u8; 16],
    reserved2: [u8; 128],
    reserved3: [u8; 248],
}

const _: () = assert!(size_of::<Partition>() == PARTITION_SIZE);

fn decode_text(field: &[u8; PARTITION_TEXT_LEN]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

fn encode_text(
    field: &mut [u8; PARTITION_TEXT_LEN],
    field_name: &'static str,
    text: &str,
) -> Result<(), Error> {
    let bytes = text.as_bytes();
    if bytes.len() > PARTITION_TEXT_LEN {
        return Err(Error::FieldTooLong {
            field: field_name,
            len: bytes.len(),
            max: PARTITION_TEXT_LEN,
        });
    }
    field.fill(0);
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

impl Partition {
    pub fn new() -> Self {
        let mut partition = Self::new_zeroed();
        partition.signature = PARTITION_SIGNATURE.into();
        partition
    }

    /// Decodes the partition map entry stored at `offset`.
    pub fn parse(bytes: &[u8], offset: usize) -> Result<Self, Error> {
        let partition: Self = record::read(bytes, offset)?;
        partition.check_signature()?;
        Ok(partition)
    }

    /// The 512-byte on-disk form, opaque regions included.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Writes the 512-byte record into `buf` at `offset`.
    pub fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize, Error> {
        record::write(self, buf, offset)
    }

    pub(crate) fn check_signature(&self) -> Result<(), Error> {
        if self.signature != PARTITION_SIGNATURE {
            return Err(Error::InvalidSignature {
                structure: "partition map entry",
                expected: PARTITION_SIGNATURE,
                found: self.signature(),
            });
        }
        Ok(())
    }

    pub fn signature(&self) -> u16 {
        self.signature.into()
    }

    pub fn reserved1(&self) -> u16 {
        self.reserved1.into()
    }

    /// Total number of entries in the partition map this entry belongs to.
    pub fn map_entries(&self) -> u32 {
        self.map_entries.into()
    }

    pub fn set_map_entries(&mut self, map_entries: u32) {
        self.map_entries = map_entries.into();
    }

    /// First physical block of the partition.
    pub fn first_lba(&self) -> u32 {
        self.first_lba.into()
    }

    pub fn set_first_lba(&mut self, first_lba: u32) {
        self.first_lba = first_lba.into();
    }

    /// Length of the partition, in blocks.
    pub fn sectors(&self) -> u32 {
        self.sectors.into()
    }

    pub fn set_sectors(&mut self, sectors: u32) {
        self.sectors = sectors.into();
    }

    /// One past the last block of the partition.
    pub fn last_lba(&self) -> u64 {
        self.first_lba() as u64 + self.sectors() as u64
    }

    /// Moves the end of the partition, keeping its start.
    pub fn set_last_lba(&mut self, last_lba: u64) -> Result<(), Error> {
        let sectors = last_lba
            .checked_sub(self.first_lba() as u64)
            .and_then(|sectors| u32::try_from(sectors).ok())
            .ok_or(Error::InvalidExtent {
                first_lba: self.first_lba(),
                last_lba,
            })?;
        self.set_sectors(sectors);
        Ok(())
    }

    /// Byte offset of the partition on a device with the given block size.
    pub fn offset_bytes(&self, block_size: u64) -> u64 {
        self.first_lba() as u64 * block_size
    }

    pub fn size_bytes(&self, block_size: u64) -> u64 {
        self.sectors() as u64 * block_size
    }

    /// Partition name, up to the first NUL.
    pub fn name(&self) -> String {
        decode_text(&self.name)
    }

    /// Stores `name` NUL-padded to 32 bytes. Longer names are rejected.
    pub fn set_name(&mut self, name: &str) -> Result<(), Error> {
        encode_text(&mut self.name, "name", name)
    }

    /// Partition type, e.g. [`types::HFS`].
    pub fn partition_type(&self) -> String {
        decode_text(&self.partition_type)
    }

    pub fn set_partition_type(&mut self, partition_type: &str) -> Result<(), Error> {
        encode_text(&mut self.partition_type, "type", partition_type)
    }

    pub fn logical_block_start(&self) -> u32 {
        self.logical_block_start.into()
    }

    pub fn set_logical_block_start(&mut self, block: u32) {
        self.logical_block_start = block.into();
    }

    pub fn logical_block_count(&self) -> u32 {
        self.logical_block_count.into()
    }

    pub fn set_logical_block_count(&mut self, count: u32) {
        self.logical_block_count = count.into();
    }

    pub fn flags(&self) -> u32 {
        self.flags.into()
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags.into();
    }

    pub fn has_flag(&self, mask: u32) -> bool {
        self.flags() & mask == mask
    }

    /// Sets or clears the bits in `mask`, leaving every other bit alone.
    pub fn set_flag(&mut self, mask: u32, value: bool) {
        let flags = if value {
            self.flags() | mask
        } else {
            self.flags() & !mask
        };
        self.set_flags(flags);
    }

    pub fn is_valid(&self) -> bool {
        self.has_flag(flags::VALID)
    }

    pub fn set_valid(&mut self, value: bool) {
        self.set_flag(flags::VALID, value);
    }

    pub fn is_allocated(&self) -> bool {
        self.has_flag(flags::ALLOCATED)
    }

    pub fn set_allocated(&mut self, value: bool) {
        self.set_flag(flags::ALLOCATED, value);
    }

    pub fn is_in_use(&self) -> bool {
        self.has_flag(flags::IN_USE)
    }

    pub fn set_in_use(&mut self, value: bool) {
        self.set_flag(flags::IN_USE, value);
    }

    pub fn is_bootable(&self) -> bool {
        self.has_flag(flags::BOOTABLE)
    }

    pub fn set_bootable(&mut self, value: bool) {
        self.set_flag(flags::BOOTABLE, value);
    }

    pub fn is_readable(&self) -> bool {
        self.has_flag(flags::READABLE)
    }

    pub fn set_readable(&mut self, value: bool) {
        self.set_flag(flags::READABLE, value);
    }

    pub fn is_writable(&self) -> bool {
        self.has_flag(flags::WRITABLE)
    }

    pub fn set_writable(&mut self, value: bool) {
        self.set_flag(flags::WRITABLE, value);
    }

    /// Whether the boot code is position independent.
    pub fn is_os_pic_code(&self) -> bool {
        self.has_flag(flags::OS_PIC_CODE)
    }

    pub fn set_os_pic_code(&mut self, value: bool) {
        self.set_flag(flags::OS_PIC_CODE, value);
    }

    /// First logical block of the boot code.
    pub fn boot_block(&self) -> u32 {
        self.boot_block.into()
    }

    pub fn set_boot_block(&mut self, block: u32) {
        self.boot_block = block.into();
    }

    /// Size of the boot code, in bytes.
    pub fn boot_bytes(&self) -> u32 {
        self.boot_bytes.into()
    }

    pub fn set_boot_bytes(&mut self, bytes: u32) {
        self.boot_bytes = bytes.into();
    }

    pub fn load_address(&self) -> u32 {
        self.load_address.into()
    }

    pub fn set_load_address(&mut self, address: u32) {
        self.load_address = address.into();
    }

    pub fn load_address2(&self) -> u32 {
        self.load_address2.into()
    }

    pub fn set_load_address2(&mut self, address: u32) {
        self.load_address2 = address.into();
    }

    pub fn goto_address(&self) -> u32 {
        self.goto_address.into()
    }

    pub fn set_goto_address(&mut self, address: u32) {
        self.goto_address = address.into();
    }

    pub fn goto_address2(&self) -> u32 {
        self.goto_address2.into()
    }

    pub fn set_goto_address2(&mut self, address: u32) {
        self.goto_address2 = address.into();
    }

    /// Boot code checksum, as stored. Never recomputed.
    pub fn checksum(&self) -> u32 {
        self.checksum.into()
    }

    pub fn set_checksum(&mut self, checksum: u32) {
        self.checksum = checksum.into();
    }

    /// Processor type string region, kept as raw bytes.
    pub fn cpu_id(&self) -> &[u8; 16] {
        &self.cpu_id
    }

    pub fn cpu_id_mut(&mut self) -> &mut [u8; 16] {
        &mut self.cpu_id
    }

    pub fn reserved2(&self) -> &[u8; 128] {
        &self.reserved2
    }

    pub fn reserved2_mut(&mut self) -> &mut [u8; 128] {
        &mut self.reserved2
    }

    pub fn reserved3(&self) -> &[u8; 248] {
        &self.reserved3
    }

    pub fn reserved3_mut(&mut self) -> &mut [u8; 248] {
        &mut self.reserved3
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new()
    }
}
