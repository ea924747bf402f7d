use zerocopy::IntoBytes;
use zerocopy::byteorder::big_endian::U16;

use crate::ddm::{DDM_SIGNATURE, DDM_SIZE, DriverDescriptorMap};
use crate::error::Error;
use crate::partition::{PARTITION_SIZE, Partition};
use crate::record;

pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// What to do with a partition map slot that lacks the 'PM' signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignaturePolicy {
    /// Fail the whole parse.
    #[default]
    Strict,
    /// Leave the slot out of the map and keep going.
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMapConfig {
    signature_policy: SignaturePolicy,
}

impl PartitionMapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signature_policy(mut self, policy: SignaturePolicy) -> Self {
        self.signature_policy = policy;
        self
    }
}

/// An Apple partition map: the optional driver descriptor map in block 0
/// followed by one entry per block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMap {
    config: PartitionMapConfig,
    driver_map: Option<DriverDescriptorMap>,
    partitions: Vec<Partition>,
}

impl PartitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PartitionMapConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Decodes the partition map at `offset` with the default (strict)
    /// configuration.
    pub fn parse(bytes: &[u8], offset: usize) -> Result<Self, Error> {
        Self::parse_with_config(bytes, offset, PartitionMapConfig::default())
    }

    pub fn parse_with_config(
        bytes: &[u8],
        offset: usize,
        config: PartitionMapConfig,
    ) -> Result<Self, Error> {
        let mut map = Self::with_config(config);
        map.parse_into(bytes, offset)?;
        Ok(map)
    }

    /// Replaces the contents of this map with the map decoded at `offset`.
    ///
    /// On error the map is left in an unspecified state.
    pub fn parse_into(&mut self, bytes: &[u8], offset: usize) -> Result<(), Error> {
        self.driver_map = None;
        self.partitions.clear();

        // Block 0 may or may not carry a driver descriptor map
        let signature: U16 = record::read(bytes, offset)?;
        if signature == DDM_SIGNATURE {
            let ddm = DriverDescriptorMap::parse(bytes, offset)?;
            self.driver_map = Some(ddm);
            self.check_block_size()?;
        }
        let block_size = self.block_size();
        log::debug!(
            "Partition map at {:#x}: block size {}, driver map {}",
            offset,
            block_size,
            if self.driver_map.is_some() { "present" } else { "absent" }
        );

        // The first entry declares how many entries the map holds
        let first = Partition::parse(bytes, slot_offset(offset, block_size, 0)?)?;
        let map_entries = first.map_entries();
        log::debug!("First partition entry declares {} entries", map_entries);
        self.partitions
            .reserve((map_entries as usize).min(bytes.len() / block_size));
        self.partitions.push(first);

        let mut skipped = 0;
        for slot in 1..map_entries as usize {
            let entry_offset = slot_offset(offset, block_size, slot)?;
            let partition: Partition = record::read(bytes, entry_offset)?;
            match (partition.check_signature(), self.config.signature_policy) {
                (Ok(()), _) => self.partitions.push(partition),
                (Err(err), SignaturePolicy::Strict) => return Err(err),
                (Err(_), SignaturePolicy::Lenient) => {
                    log::warn!(
                        "Skipping partition map slot {} at {:#x}: signature {:#06x}",
                        slot,
                        entry_offset,
                        partition.signature()
                    );
                    skipped += 1;
                }
            }
        }

        // Kept entries must agree on the count of what is actually in the map
        if skipped > 0 {
            log::debug!(
                "Skipped {} of {} slots, renumbering to {} entries",
                skipped,
                map_entries,
                self.partitions.len()
            );
            self.sync_map_entries();
        }

        Ok(())
    }

    /// Size of the serialized map, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.block_size() * (1 + self.partitions.len())
    }

    /// Serializes the map into a new buffer of [`Self::size_bytes`] bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.check_block_size()?;
        let mut bytes = vec![0u8; self.size_bytes()];
        self.write_blocks(&mut bytes);
        Ok(bytes)
    }

    /// Writes the driver descriptor block and every entry into `buf` at
    /// `offset`, returning the number of bytes written. Each record is
    /// zero-padded to the block size.
    pub fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize, Error> {
        self.check_block_size()?;
        let len = self.size_bytes();
        Error::check_output(offset, len, buf.len())?;
        self.write_blocks(&mut buf[offset..offset + len]);
        Ok(len)
    }

    // A driver map edited in place may declare a block too small for a record.
    fn check_block_size(&self) -> Result<(), Error> {
        match &self.driver_map {
            Some(ddm) if (ddm.block_size() as usize) < DEFAULT_BLOCK_SIZE => {
                Err(Error::InvalidBlockSize(ddm.block_size()))
            }
            _ => Ok(()),
        }
    }

    // `out` must be exactly `size_bytes()` long.
    fn write_blocks(&self, out: &mut [u8]) {
        let block_size = self.block_size();
        out.fill(0);
        let blocks = out.chunks_exact_mut(block_size);
        for (index, block) in blocks.enumerate() {
            match index {
                0 => {
                    if let Some(ddm) = &self.driver_map {
                        block[..DDM_SIZE].copy_from_slice(ddm.as_bytes());
                    }
                }
                _ => {
                    let partition = &self.partitions[index - 1];
                    block[..PARTITION_SIZE].copy_from_slice(partition.as_bytes());
                }
            }
        }
    }

    pub fn config(&self) -> &PartitionMapConfig {
        &self.config
    }

    /// Block size of the device: the driver map's if there is one, else 512.
    pub fn block_size(&self) -> usize {
        match &self.driver_map {
            Some(ddm) => ddm.block_size() as usize,
            None => DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn driver_map(&self) -> Option<&DriverDescriptorMap> {
        self.driver_map.as_ref()
    }

    pub fn driver_map_mut(&mut self) -> Option<&mut DriverDescriptorMap> {
        self.driver_map.as_mut()
    }

    pub fn set_driver_map(&mut self, driver_map: Option<DriverDescriptorMap>) {
        self.driver_map = driver_map;
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Mutable access to the entries. Changing their number is only possible
    /// through [`Self::push`] and [`Self::remove`], which keep every entry's
    /// declared count in sync.
    pub fn partitions_mut(&mut self) -> &mut [Partition] {
        &mut self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Partition> {
        self.partitions.iter()
    }

    /// Appends an entry and updates the declared entry count of all entries.
    pub fn push(&mut self, partition: Partition) {
        self.partitions.push(partition);
        self.sync_map_entries();
    }

    /// Removes and returns the entry at `index`, updating the declared count
    /// of the remaining entries. The returned entry declares a count of 1.
    pub fn remove(&mut self, index: usize) -> Option<Partition> {
        if index >= self.partitions.len() {
            return None;
        }
        let mut partition = self.partitions.remove(index);
        partition.set_map_entries(1);
        self.sync_map_entries();
        Some(partition)
    }

    /// First entry of the given type, e.g. [`crate::types::HFS`].
    pub fn find_by_type(&self, partition_type: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|&partition| partition.partition_type() == partition_type)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|&partition| partition.name() == name)
    }

    fn sync_map_entries(&mut self) {
        let count = self.partitions.len() as u32;
        for partition in &mut self.partitions {
            partition.set_map_entries(count);
        }
    }
}

impl<'a> IntoIterator for &'a PartitionMap {
    type Item = &'a Partition;
    type IntoIter = std::slice::Iter<'a, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.partitions.iter()
    }
}

fn slot_offset(offset: usize, block_size: usize, slot: usize) -> Result<usize, Error> {
    (slot + 1)
        .checked_mul(block_size)
        .and_then(|relative| relative.checked_add(offset))
        .ok_or(Error::Truncated {
            offset,
            needed: PARTITION_SIZE,
            available: 0,
        })
}
