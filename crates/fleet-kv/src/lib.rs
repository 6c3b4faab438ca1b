//! Durable TTL cache for pending confirmations

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod nats;

pub use cache::{get_json, set_json, DurableCache, NatsKvCache};
pub use config::KvConfig;
pub use error::{Error, Result};
pub use memory::MemoryCache;
pub use nats::{connect, open_bucket};
