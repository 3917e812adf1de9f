pub mod byte;
pub mod traits;

pub use byte::{ByteTransport, StdioTransport};
pub use traits::ServerTransport;
