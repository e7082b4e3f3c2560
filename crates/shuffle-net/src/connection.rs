//! Thin async wrapper driving a [`PartitionRequestQueue`] over a real
//! transport. One task owns the socket and alternates between decoding
//! inbound control messages and draining whatever the queue has ready
//! to send, waking on the queue's `Notify` rather than busy-polling.

use crate::codec::MessageCodec;
use crate::error::NetError;
use crate::listener::QueueAvailabilityListener;
use crate::message::{ErrorResponse, Message, PartitionRequest};
use crate::queue::PartitionRequestQueue;
use futures_util::{SinkExt, StreamExt};
use shuffle_partition::{AvailabilityListener, ReceiverId, ResultSubpartitionView};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

/// Resolves an inbound `PartitionRequest` into a live view, and handles
/// cancellation. Injected rather than hard-wired to a single registry,
/// so a connection can be driven against a fake registry in tests.
pub trait PartitionRequestHandler: Send + Sync {
    fn open_view(
        &self,
        request: &PartitionRequest,
        listener: Arc<dyn AvailabilityListener>,
) -> Result<ResultSubpartitionView, NetError>;

    fn cancel(&self, receiver_id: ReceiverId);
}

/// Drives one connection until the peer closes it, the transport fails
/// fatally, or a `CloseRequest` is received. Every reader opened on this
/// connection is cancelled on exit.
pub async fn run_connection<T>(
    transport: T,
    queue: Arc<PartitionRequestQueue>,
    handler: Arc<dyn PartitionRequestHandler>,
) -> Result<(), NetError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(transport, MessageCodec);

    loop {
        let mut outbound = Vec::new();
        queue.drain(|| true, |msg| outbound.push(msg));
        for message in outbound {
            if let Err(e) = framed.send(message).await {
                queue.mark_fatal();
                return Err(NetError::FatalTransport(e.to_string()));
            }
        }

        tokio::select! {
            biased;
            incoming = framed.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        if !handle_inbound(&queue, &handler, &mut framed, message).await? {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        queue.mark_fatal();
                        return Err(NetError::FatalTransport(e.to_string()));
                    }
                    None => break,
                }
            }
            () = queue.notified() => {}
        }
    }

    Ok(())
}

/// Handles one decoded inbound message. Returns `Ok(false)` when the
/// connection should close.
async fn handle_inbound<T>(
    queue: &Arc<PartitionRequestQueue>,
    handler: &Arc<dyn PartitionRequestHandler>,
    framed: &mut Framed<T, MessageCodec>,
    message: Message,
) -> Result<bool, NetError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match message {
        Message::PartitionRequest(request) => {
            let listener = QueueAvailabilityListener::new(Arc::clone(queue), request.receiver_id);
            match handler.open_view(&request, listener) {
                Ok(view) => {
                    if let Err(e) =
                        queue.register_reader(request.receiver_id, view, request.initial_credit)
                    {
                        framed
.send(Message::Error(ErrorResponse {
                                receiver_id: Some(request.receiver_id),
                                cause: e.to_string(),
                            }))
.await?;
                    }
                }
                Err(e) => {
                    framed
.send(Message::Error(ErrorResponse {
                            receiver_id: Some(request.receiver_id),
                            cause: e.to_string(),
                        }))
.await?;
                }
            }
        }
        Message::AddCredit(m) => {
            let _ = queue.add_credit(m.receiver_id, m.credit);
        }
        Message::ResumeConsumption(m) => {
            let _ = queue.resume_consumption(m.receiver_id);
        }
        Message::CancelRequest(m) => {
            if queue.cancel_reader(m.receiver_id).is_ok() {
                handler.cancel(m.receiver_id);
            }
        }
        Message::CloseRequest(_) => return Ok(false),
        // Buffer/Error flow producer-to-consumer only; a well-behaved
        // peer never sends one inbound on this connection.
        Message::Buffer(_) | Message::Error(_) => {}
    }
    Ok(true)
}
