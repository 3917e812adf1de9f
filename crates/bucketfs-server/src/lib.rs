pub mod router;
pub mod server;
pub mod transport;

pub use bucketfs_core as core;
pub use bucketfs_error as error;
pub use router::{RouterService, capabilities::CapabilitiesBuilder, traits::Router};
pub use server::Server;
