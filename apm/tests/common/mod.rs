#![allow(dead_code)]

use apm::{DriverDescriptor, DriverDescriptorMap, Partition, types};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct EntryLayout {
    pub name: &'static str,
    pub partition_type: &'static str,
    pub first_lba: u32,
    pub sectors: u32,
    pub flags: u32,
}

impl EntryLayout {
    fn new(
        name: &'static str,
        partition_type: &'static str,
        first_lba: u32,
        sectors: u32,
        flags: u32,
    ) -> Self {
        Self {
            name,
            partition_type,
            first_lba,
            sectors,
            flags,
        }
    }
}

fn build_entry(layout: &EntryLayout, map_entries: u32) -> Partition {
    let mut partition = Partition::new();
    partition.set_map_entries(map_entries);
    partition.set_first_lba(layout.first_lba);
    partition.set_sectors(layout.sectors);
    partition.set_name(layout.name).unwrap();
    partition.set_partition_type(layout.partition_type).unwrap();
    partition.set_logical_block_count(layout.sectors);
    partition.set_flags(layout.flags);
    partition
}

/// Lays out a driver map and entries the way they sit on disk, followed by
/// `trailing` bytes of unrelated data.
pub fn build_image(ddm: &DriverDescriptorMap, entries: &[Partition], trailing: usize) -> Vec<u8> {
    let block_size = ddm.block_size() as usize;
    let map_len = block_size * (1 + entries.len());
    let mut image = vec![0u8; map_len + trailing];
    ddm.write_to(&mut image, 0).unwrap();
    for (index, partition) in entries.iter().enumerate() {
        partition.write_to(&mut image, (index + 1) * block_size).unwrap();
    }
    for (index, byte) in image[map_len..].iter_mut().enumerate() {
        *byte = (index % 251) as u8;
    }
    image
}

/// A 512-byte-block image with six entries, laid out like a map written by
/// macOS Disk Utility.
pub fn disk_utility_image() -> Vec<u8> {
    let layouts = [
        EntryLayout::new("Apple", types::PARTITION_MAP, 1, 63, 0x03),
        EntryLayout::new("Macintosh", types::DRIVER43, 64, 56, 0x37f),
        EntryLayout::new("Macintosh", types::DRIVER43, 120, 56, 0x37f),
        EntryLayout::new("Macintosh", types::DRIVER_ATA, 176, 56, 0x37f),
        EntryLayout::new("Patch Partition", types::PATCHES, 232, 512, 0x01),
        EntryLayout::new("disk image", types::HFS, 744, 20480, 0x4000_0033),
    ];

    let mut ddm = DriverDescriptorMap::new(512, 21224);
    ddm.set_device_type(1);
    ddm.set_device_id(1);
    ddm.set_driver_count(3);
    ddm.drivers_mut()[0] = DriverDescriptor::new(64, 56, 0x0001);
    ddm.drivers_mut()[1] = DriverDescriptor::new(120, 56, 0xffff);
    ddm.drivers_mut()[2] = DriverDescriptor::new(176, 56, 0x0701);
    ddm.reserved_mut()[..4].copy_from_slice(&[0x00, 0x00, 0xf8, 0x00]);

    let count = layouts.len() as u32;
    let mut entries: Vec<Partition> = layouts
        .iter()
        .map(|layout| build_entry(layout, count))
        .collect();
    for driver in &mut entries[1..4] {
        driver.set_boot_bytes(0x5000);
        driver.set_load_address(0x0001_0000);
        driver.set_goto_address(0x0001_0000);
        driver.set_checksum(0x0000_f624);
        driver.cpu_id_mut()[..7].copy_from_slice(b"powerpc");
        driver.reserved2_mut()[0..4].copy_from_slice(b"CDis");
    }

    build_image(&ddm, &entries, 4096)
}

/// A 2048-byte-block image with four entries, laid out like Mac OS X Snow
/// Leopard install media.
pub fn snow_leopard_image() -> Vec<u8> {
    let layouts = [
        EntryLayout::new("Apple", types::PARTITION_MAP, 1, 4, 0x03),
        EntryLayout::new("Macintosh", types::DRIVER_IOKIT, 5, 2, 0x37f),
        EntryLayout::new(
            "Mac OS X Install DVD",
            types::HFS,
            7,
            3_600_000,
            0x4000_0033,
        ),
        EntryLayout::new("Extra", types::FREE, 3_600_007, 9, 0x00),
    ];

    let mut ddm = DriverDescriptorMap::new(2048, 3_600_016);
    ddm.set_driver_count(1);
    ddm.drivers_mut()[0] = DriverDescriptor::new(20, 8, 0x0701);

    let count = layouts.len() as u32;
    let entries: Vec<Partition> = layouts
        .iter()
        .map(|layout| build_entry(layout, count))
        .collect();
    build_image(&ddm, &entries, 8192)
}
