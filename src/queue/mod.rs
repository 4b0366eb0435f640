//! Delivery queue for accepted send requests.
//!
//! The send service pushes one `EmailJob` per accepted request; the delivery
//! worker pops jobs, calls the email provider and re-enqueues failed attempts
//! after an exponential backoff delay.
//!
//! Two backends are available:
//! - `memory`: an in-process channel, lost on restart
//! - `redis`: a Redis list (`RPUSH` / `BLPOP`), shared across instances

mod backend;
mod backoff;
mod factory;
mod memory_backend;
mod redis_backend;

pub use backend::{DeliveryQueue, EmailJob, QueueError};
pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use factory::create_delivery_queue;
pub use memory_backend::MemoryDeliveryQueue;
pub use redis_backend::RedisDeliveryQueue;
