//! Off-heap memory segments, buffer pools, and the single-writer/
//! single-reader buffer builder used by the shuffle data plane.
//!
//! # Key Features
//!
//! - Three segment storage kinds (heap, off-heap shareable, off-heap
//! caller-managed), each with bounds-checked bulk and typed accessors
//! - A [`pool::BufferPool`] that leases segments under a `required <=
//! requested <= max` quota, with blocking, non-blocking, and async
//! lease paths plus a listener subscription mechanism
//! - A [`builder::BufferBuilder`]/[`builder::BufferConsumer`] pair
//! publishing a committed write position through a single atomic store
//! per commit, with no per-append synchronization
//!
//! # Example
//!
//! ```
//! use shuffle_memory::{BufferPool, DataType, PoolConfig};
//!
//! let pool = BufferPool::new(PoolConfig::new(4096, 2, 8));
//! let segment = pool.try_lease().expect("pool pre-allocates `required` segments");
//! let buffer = pool.wrap_buffer(segment, DataType::Data);
//! assert_eq!(buffer.readable_bytes(), buffer.segment().capacity());
//! ```

mod backoff;
mod builder;
mod buffer;
mod config;
mod error;
mod invariants;
mod metrics;
mod pool;
mod segment;

pub use backoff::Backoff;
pub use builder::{BufferBuilder, BufferConsumer};
pub use buffer::{Buffer, DataType, RecycleFn};
pub use config::{PoolConfig, BOUNDED_BLOCKING, UNBOUNDED_NETWORK};
pub use error::SegmentError;
pub use metrics::{PoolMetrics, PoolMetricsSnapshot};
pub use pool::{BufferListener, BufferPool};
pub use segment::{MemorySegment, Owner, ReleaseFn, SegmentWriter};
