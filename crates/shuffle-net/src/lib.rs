//! Wire protocol, Partition Request Queue multiplexer, and network
//! Sequence-View Reader for the shuffle data plane.
//!
//! # Key Features
//!
//! - [`message`]/[`codec`]: the length-prefixed envelope and message
//! set crossing a shuffle connection
//! - [`queue::PartitionRequestQueue`]: server-side scheduler deciding
//! which registered reader's next buffer to send
//! - [`connection::run_connection`]: the async loop driving a queue
//! against a real transport
//! - [`collaborators`]: injected `BufferCompressor` seam, in place of a
//! hard-wired codec

mod codec;
mod collaborators;
mod connection;
mod error;
mod invariants;
mod listener;
mod message;
mod queue;
mod reader;

pub use codec::{MessageCodec, MAX_FRAME_LEN};
pub use collaborators::{BufferCompressor, NoopCompressor};
pub use connection::{run_connection, PartitionRequestHandler};
pub use error::NetError;
pub use listener::QueueAvailabilityListener;
pub use message::{
    AddCredit, BufferResponse, CancelRequest, CloseRequest, ErrorResponse, Message,
    PartitionRequest, ResumeConsumption,
};
pub use queue::{DrainStep, PartitionRequestQueue};
pub use reader::NetworkReader;
