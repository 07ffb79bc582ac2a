pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod key;
pub mod progress;
pub mod resolver;
pub mod storage;
pub mod transform;

pub use error::ResolveError;
pub use resolver::ResourceResolver;
