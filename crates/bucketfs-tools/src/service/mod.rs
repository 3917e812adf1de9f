mod filesystem;
mod params;

pub use filesystem::{FileSummary, FileSystemService, new_file_id};
pub use params::{FileIdParams, WriteBase64Params, WriteContentParams, WritePathParams};
