pub mod local_disk;
pub mod memory;

pub use local_disk::LocalDriver;
pub use memory::MemoryDriver;
