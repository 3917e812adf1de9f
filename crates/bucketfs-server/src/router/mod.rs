pub mod capabilities;
pub mod ext;
pub mod service;
pub mod traits;

pub use service::RouterService;
