pub mod ddm;
pub mod error;
pub mod map;
pub mod partition;
mod record;

pub use ddm::{DriverDescriptor, DriverDescriptorMap};
pub use error::Error;
pub use map::{PartitionMap, PartitionMapConfig, SignaturePolicy};
pub use partition::{Partition, flags, types};
