pub mod storage;

pub use storage::{LocalDiskStore, MediaStore};
