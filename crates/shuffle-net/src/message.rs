//! Wire message types exchanged between a network Sequence-View Reader
//! (consumer side) and a Partition Request Queue (producer side).
//!
//! Field order is the contract: each payload is `bincode`-encoded in
//! declaration order, and the outer envelope (`[length: u32][kind: u8]`)
//! is hand-written in `codec.rs` rather than derived, since the
//! discriminator byte has to be known before the payload type can even
//! be chosen for decoding.

use serde::{Deserialize, Serialize};
use shuffle_partition::{PartitionId, ReceiverId};

/// One buffer (or event) and its delivery metadata, flowing producer to
/// consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferResponse {
    pub receiver_id: ReceiverId,
    pub sequence_number: u32,
    pub backlog: i32,
    pub data_type: u8,
    pub is_compressed: bool,
    pub payload: Vec<u8>,
}

/// Carries a failure cause to a reader whose sub-partition was released
/// with an error, or a connection-wide fatal error when `receiver_id` is
/// `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub receiver_id: Option<ReceiverId>,
    pub cause: String,
}

/// Opens a remote reader against one sub-partition, consumer to producer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PartitionRequest {
    pub partition_id: PartitionId,
    pub subpartition_index: u32,
    pub initial_credit: i32,
    pub receiver_id: ReceiverId,
}

/// Grants additional credit to a previously opened reader.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddCredit {
    pub receiver_id: ReceiverId,
    pub credit: i32,
}

/// Lifts a reader out of the "paused, waiting on a downstream signal"
/// state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResumeConsumption {
    pub receiver_id: ReceiverId,
}

/// Cancels one reader mid-flight; its sub-partition view is released
/// with `ReleaseCause::ConsumerCancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CancelRequest {
    pub receiver_id: ReceiverId,
}

/// Closes the whole connection; every reader registered on it is
/// cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CloseRequest;

/// The union of every message that can cross the wire in either
/// direction. `codec.rs` maps each variant to a one-byte discriminator.
#[derive(Debug, Clone)]
pub enum Message {
    Buffer(BufferResponse),
    Error(ErrorResponse),
    PartitionRequest(PartitionRequest),
    AddCredit(AddCredit),
    ResumeConsumption(ResumeConsumption),
    CancelRequest(CancelRequest),
    CloseRequest(CloseRequest),
}

impl Message {
    pub(crate) fn kind(&self) -> MessageKind {
        match self {
            Self::Buffer(_) => MessageKind::Buffer,
            Self::Error(_) => MessageKind::Error,
            Self::PartitionRequest(_) => MessageKind::PartitionRequest,
            Self::AddCredit(_) => MessageKind::AddCredit,
            Self::ResumeConsumption(_) => MessageKind::ResumeConsumption,
            Self::CancelRequest(_) => MessageKind::CancelRequest,
            Self::CloseRequest(_) => MessageKind::CloseRequest,
        }
    }
}

/// The one-byte envelope discriminator. Explicit values so the wire
/// format is stable even if variants are reordered in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    Buffer = 0,
    Error = 1,
    PartitionRequest = 2,
    AddCredit = 3,
    ResumeConsumption = 4,
    CancelRequest = 5,
    CloseRequest = 6,
}

impl MessageKind {
    pub(crate) fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Buffer),
            1 => Some(Self::Error),
            2 => Some(Self::PartitionRequest),
            3 => Some(Self::AddCredit),
            4 => Some(Self::ResumeConsumption),
            5 => Some(Self::CancelRequest),
            6 => Some(Self::CloseRequest),
            _ => None,
        }
    }
}
