pub mod pool;
pub mod query;
pub mod server;

pub use pool::UpstreamPool;
pub use server::{ServerStatus, UpstreamServer};
