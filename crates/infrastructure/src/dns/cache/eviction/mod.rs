pub mod active;
pub mod lfu;
pub mod lfuk;
pub mod lru;
pub mod policy;
pub mod strategy;
pub mod window;

pub use active::ActiveEvictionPolicy;
pub use lfu::LfuPolicy;
pub use lfuk::LfukPolicy;
pub use lru::LruPolicy;
pub use policy::EvictionPolicy;
pub use strategy::EvictionStrategy;
pub use window::AccessWindow;
