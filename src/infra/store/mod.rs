//! [`FileStore`](crate::services::file_store::FileStore) implementations.

mod local;
mod memory;
mod s3;
mod webhdfs;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::S3Store;
pub use webhdfs::WebHdfsStore;
