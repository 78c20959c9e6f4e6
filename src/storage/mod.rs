//! Storage port abstraction

mod file;
mod memory;
mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{StoragePort, StorageError, StorageScope};
