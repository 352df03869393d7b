//! Cache module for the Redis session store

pub mod redis_store;

#[cfg(test)]
mod tests;

pub use redis_store::RedisSessionStore;

// Re-export commonly used types
pub use sg_shared::config::cache::CacheConfig;
