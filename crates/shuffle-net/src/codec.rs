//! Length-prefixed framing over [`Message`]: `[length: u32 BE][kind: u8]
//! [bincode body]`. `length` covers the kind byte plus the body.
//!
//! The envelope is hand-written rather than derived because the kind
//! byte has to be read and matched on *before* the decoder knows which
//! body type to deserialize into — there is no single type `bincode`
//! could derive an `Encoder`/`Decoder` impl over.

use crate::error::NetError;
use crate::message::{
    AddCredit, BufferResponse, CancelRequest, CloseRequest, ErrorResponse, Message, MessageKind,
    PartitionRequest, ResumeConsumption,
};
use bincode::Options;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Frames larger than this are refused outright rather than risking an
/// unbounded allocation from a corrupt or hostile length prefix.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const LENGTH_FIELD_LEN: usize = 4;
const KIND_FIELD_LEN: usize = 1;

fn bincode_options() -> impl bincode::Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

#[derive(Debug, Default)]
pub struct MessageCodec;

impl Encoder<Message> for MessageCodec {
    type Error = NetError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), NetError> {
        let kind = message.kind();
        let body = encode_body(&message)?;
        let frame_len = KIND_FIELD_LEN + body.len();
        if frame_len > MAX_FRAME_LEN {
            return Err(NetError::FrameTooLarge(frame_len));
        }

        dst.reserve(LENGTH_FIELD_LEN + frame_len);
        dst.put_u32(frame_len as u32);
        dst.put_u8(kind as u8);
        dst.put_slice(&body);
        Ok(())
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = NetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, NetError> {
        if src.len() < LENGTH_FIELD_LEN {
            return Ok(None);
        }
        let frame_len = u32::from_be_bytes(src[..LENGTH_FIELD_LEN].try_into().unwrap()) as usize;
        if frame_len > MAX_FRAME_LEN {
            return Err(NetError::FrameTooLarge(frame_len));
        }
        if src.len() < LENGTH_FIELD_LEN + frame_len {
            src.reserve(LENGTH_FIELD_LEN + frame_len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_LEN);
        let kind_byte = src.get_u8();
        let kind = MessageKind::from_u8(kind_byte)
.ok_or(NetError::UnknownMessageKind(kind_byte))?;
        let body = src.split_to(frame_len - KIND_FIELD_LEN);
        decode_body(kind, &body).map(Some)
    }
}

fn encode_body(message: &Message) -> Result<Vec<u8>, NetError> {
    let opts = bincode_options();
    let encoded = match message {
        Message::Buffer(m) => opts.serialize(m),
        Message::Error(m) => opts.serialize(m),
        Message::PartitionRequest(m) => opts.serialize(m),
        Message::AddCredit(m) => opts.serialize(m),
        Message::ResumeConsumption(m) => opts.serialize(m),
        Message::CancelRequest(m) => opts.serialize(m),
        Message::CloseRequest(m) => opts.serialize(m),
    };
    encoded.map_err(|e| NetError::Malformed(e.to_string()))
}

fn decode_body(kind: MessageKind, body: &[u8]) -> Result<Message, NetError> {
    let opts = bincode_options();
    let malformed = |e: bincode::Error| NetError::Malformed(e.to_string());
    match kind {
        MessageKind::Buffer => opts
.deserialize::<BufferResponse>(body)
.map(Message::Buffer)
.map_err(malformed),
        MessageKind::Error => opts
.deserialize::<ErrorResponse>(body)
.map(Message::Error)
.map_err(malformed),
        MessageKind::PartitionRequest => opts
.deserialize::<PartitionRequest>(body)
.map(Message::PartitionRequest)
.map_err(malformed),
        MessageKind::AddCredit => opts
.deserialize::<AddCredit>(body)
.map(Message::AddCredit)
.map_err(malformed),
        MessageKind::ResumeConsumption => opts
.deserialize::<ResumeConsumption>(body)
.map(Message::ResumeConsumption)
.map_err(malformed),
        MessageKind::CancelRequest => opts
.deserialize::<CancelRequest>(body)
.map(Message::CancelRequest)
.map_err(malformed),
        MessageKind::CloseRequest => opts
.deserialize::<CloseRequest>(body)
.map(Message::CloseRequest)
.map_err(malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuffle_partition::ReceiverId;

    #[test]
    fn round_trips_a_buffer_response() {
        let mut codec = MessageCodec;
        let mut buf = BytesMut::new();
        let original = BufferResponse {
            receiver_id: ReceiverId::new(),
            sequence_number: 7,
            backlog: 3,
            data_type: 0,
            is_compressed: false,
            payload: b"hello".to_vec(),
        };
        codec
.encode(Message::Buffer(original.clone()), &mut buf)
.unwrap();

        let decoded = codec.decode(&mut buf).unwrap().expect("one frame");
        match decoded {
            Message::Buffer(m) => {
                assert_eq!(m.receiver_id, original.receiver_id);
                assert_eq!(m.sequence_number, 7);
                assert_eq!(m.payload, b"hello");
            }
            _ => panic!("expected a buffer response"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_yields_none_until_complete() {
        let mut codec = MessageCodec;
        let mut buf = BytesMut::new();
        codec
.encode(
                Message::CancelRequest(CancelRequest {
                    receiver_id: ReceiverId::new(),
                }),
                &mut buf,
)
.unwrap();

        let mut partial = buf.split_to(buf.len() - 1);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn unknown_discriminator_is_an_error() {
        let mut codec = MessageCodec;
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u8(0xEE);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(NetError::UnknownMessageKind(0xEE))
));
    }

    #[test]
    fn oversized_frame_is_refused() {
        let mut codec = MessageCodec;
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_LEN + 1) as u32);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(NetError::FrameTooLarge(_))
));
    }
}
