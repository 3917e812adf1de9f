pub mod resolver;
pub mod service;
pub mod storage;

pub use bucketfs_core as core;
pub use bucketfs_error as error;
pub use bucketfs_server as server;
