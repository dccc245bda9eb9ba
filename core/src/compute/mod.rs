//! Concurrency primitives used by the resource loader.
//!
//! - [`CancellationToken`]: Shared flag that stops in-flight decode work
//!   for a destroyed asset
//! - [`ThreadPool`]: Scoped pool for CPU-bound decoding; results come back
//!   on the calling thread so uploads stay serialized

mod cancellation;
mod thread_pool;

pub use cancellation::{CancellationToken, Cancelled};
pub use thread_pool::{Scope, ThreadPool};
