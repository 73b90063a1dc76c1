pub mod storage;

pub use storage::{BoxReader, ContentHash, PhysicalStore, StagedBlob, StorageError};
