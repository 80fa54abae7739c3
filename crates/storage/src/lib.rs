pub mod memory_store;
pub mod s3_store;
pub mod store;
mod uploader;

pub use memory_store::MemoryStore;
pub use s3_store::{S3Config, S3Store};
pub use store::ArtifactStore;
pub use uploader::{UploadOutcome, Uploader};
