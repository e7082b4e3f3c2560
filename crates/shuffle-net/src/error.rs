use shuffle_partition::ReceiverId;
use thiserror::Error;

/// Error taxonomy for the wire codec and the Partition Request Queue
/// : a malformed frame or an unknown reader is recoverable at
/// the single-message granularity, a transport I/O failure is not and
/// escalates to the connection-wide `fatalError` latch.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("frame exceeded the maximum accepted length ({0} bytes)")]
    FrameTooLarge(usize),

    #[error("unknown message discriminator byte {0}")]
    UnknownMessageKind(u8),

    #[error("malformed message body: {0}")]
    Malformed(String),

    #[error("reader {0} is not registered on this connection")]
    ReaderNotRegistered(ReceiverId),

    #[error("reader {0} is already registered on this connection")]
    ReaderAlreadyRegistered(ReceiverId),

    #[error("connection transport failed fatally: {0}")]
    FatalTransport(String),

    #[error(transparent)]
    Partition(#[from] shuffle_partition::PartitionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
